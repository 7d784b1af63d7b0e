//! Compose protocol-model elements back into source text.
//!
//! The inverse pipeline: elements are grouped by their owning section (a
//! pluggable per-kind mapping), each group is rendered with the renderer
//! registered for its section, and rendered sections are reassembled under
//! `###Name` markers. Joiner strings are fixed constants so output is
//! byte-deterministic and round-trip tests can compare composed text directly.

use crate::ast::{EmbeddedData, PackageableElement, ProtocolModel, Stereotype, TaggedValue, ValueExpression};
use crate::error::{ComposerError, RegistryError};
use std::collections::HashMap;
use std::fmt::Write;

/// Maps an element to its owning section name, if this mapping knows the kind.
pub type SectionOfFn = fn(&PackageableElement) -> Option<&'static str>;
/// Renders one element for its section.
pub type ElementRendererFn =
    fn(&PackageableElement, &ComposerRegistry) -> Result<String, ComposerError>;
/// Renders one embedded-data payload block. None when the payload is not the
/// variant this renderer handles; the dispatch turns that into an error.
pub type EmbeddedRendererFn = fn(&EmbeddedData) -> Option<String>;

/// One blank line between elements of a section.
const ELEMENT_JOINER: &str = "\n\n";
/// Two blank lines between sections.
const SECTION_JOINER: &str = "\n\n\n";

/// Composer-side dispatch tables: element → section mapping, per-section
/// element renderers, per-kind embedded-data renderers.
#[derive(Debug, Default)]
pub struct ComposerRegistry {
    section_of: Vec<SectionOfFn>,
    renderers: HashMap<String, ElementRendererFn>,
    embedded: HashMap<String, EmbeddedRendererFn>,
}

impl ComposerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mapping from element kinds to section names; mappings are
    /// consulted in registration order.
    pub fn register_section_of(&mut self, f: SectionOfFn) {
        self.section_of.push(f);
    }

    pub fn register_section_renderer(
        &mut self,
        section: &str,
        renderer: ElementRendererFn,
    ) -> Result<(), RegistryError> {
        if self.renderers.insert(section.to_string(), renderer).is_some() {
            return Err(RegistryError::new("section composer", section));
        }
        Ok(())
    }

    pub fn register_embedded_renderer(
        &mut self,
        kind: &str,
        renderer: EmbeddedRendererFn,
    ) -> Result<(), RegistryError> {
        if self.embedded.insert(kind.to_string(), renderer).is_some() {
            return Err(RegistryError::new("embedded data composer", kind));
        }
        Ok(())
    }

    pub(crate) fn register_builtins(&mut self) {
        self.register_section_of(builtin_section_of);
        self.register_section_renderer("Pure", render_pure_element)
            .expect("builtin composer registration");
        self.register_section_renderer("Data", render_data_element)
            .expect("builtin composer registration");
        self.register_embedded_renderer("Text", render_text_data)
            .expect("builtin composer registration");
        self.register_embedded_renderer("Binary", render_binary_data)
            .expect("builtin composer registration");
        self.register_embedded_renderer("PureCollection", render_collection_data)
            .expect("builtin composer registration");
        self.register_embedded_renderer("Reference", render_reference_data)
            .expect("builtin composer registration");
    }

    /// Owning section for an element, if any mapping claims it.
    pub fn section_of(&self, element: &PackageableElement) -> Option<&'static str> {
        self.section_of.iter().find_map(|f| f(element))
    }

    /// Render one element through its section renderer.
    pub fn render_element(&self, element: &PackageableElement) -> Result<String, ComposerError> {
        let section = self
            .section_of(element)
            .ok_or_else(|| ComposerError::new(element.path().to_string()))?;
        let renderer = self
            .renderers
            .get(section)
            .ok_or_else(|| ComposerError::new(element.path().to_string()))?;
        renderer(element, self)
    }

    /// Render an embedded-data block through its kind renderer. `path` is the
    /// enclosing element's path, used for the error when no renderer exists.
    pub fn render_embedded(&self, path: &str, data: &EmbeddedData) -> Result<String, ComposerError> {
        self.embedded
            .get(data.kind())
            .and_then(|renderer| renderer(data))
            .ok_or_else(|| ComposerError::new(path))
    }
}

/// Compose a whole model into source text. Elements are grouped by owning
/// section (sections appear in first-use order, elements keep model order) and
/// the result is deterministic for a given model.
pub fn compose(model: &ProtocolModel, registry: &ComposerRegistry) -> Result<String, ComposerError> {
    let mut groups: Vec<(&'static str, Vec<&PackageableElement>)> = Vec::new();
    for element in model.iter() {
        let section = registry
            .section_of(element)
            .ok_or_else(|| ComposerError::new(element.path().to_string()))?;
        match groups.iter_mut().find(|(name, _)| *name == section) {
            Some((_, members)) => members.push(element),
            None => groups.push((section, vec![element])),
        }
    }

    let mut sections = Vec::with_capacity(groups.len());
    for (name, members) in groups {
        let mut rendered = Vec::with_capacity(members.len());
        for element in members {
            rendered.push(registry.render_element(element)?);
        }
        sections.push(format!("###{}\n{}", name, rendered.join(ELEMENT_JOINER)));
    }
    let mut out = sections.join(SECTION_JOINER);
    if !out.is_empty() {
        out.push('\n');
    }
    Ok(out)
}

/// Render each element independently. One element without a renderer does not
/// affect the others; callers get one result per element, in model order.
pub fn compose_elements(
    model: &ProtocolModel,
    registry: &ComposerRegistry,
) -> Vec<Result<String, ComposerError>> {
    model.iter().map(|e| registry.render_element(e)).collect()
}

// ==================== Built-in renderers ====================

/// Built-in element → section mapping (`Pure` for Class/Enum, `Data` for Data).
pub fn builtin_section_of(element: &PackageableElement) -> Option<&'static str> {
    match element {
        PackageableElement::Class(_) | PackageableElement::Enumeration(_) => Some("Pure"),
        PackageableElement::Data(_) => Some("Data"),
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn render_annotations(stereotypes: &[Stereotype], tagged_values: &[TaggedValue]) -> String {
    let mut out = String::new();
    if !stereotypes.is_empty() {
        let inner: Vec<String> = stereotypes
            .iter()
            .map(|s| format!("{}.{}", s.profile, s.value))
            .collect();
        let _ = write!(out, "<<{}>> ", inner.join(", "));
    }
    if !tagged_values.is_empty() {
        let inner: Vec<String> = tagged_values
            .iter()
            .map(|t| format!("{}.{} = '{}'", t.profile, t.tag, escape(&t.value)))
            .collect();
        let _ = write!(out, "{{{}}} ", inner.join(", "));
    }
    out
}

/// Built-in renderer for `Pure` section elements.
pub fn render_pure_element(
    element: &PackageableElement,
    _registry: &ComposerRegistry,
) -> Result<String, ComposerError> {
    match element {
        PackageableElement::Class(c) => {
            let mut out = format!(
                "Class {}{}\n{{\n",
                render_annotations(&c.stereotypes, &c.tagged_values),
                c.path
            );
            for p in &c.properties {
                let _ = writeln!(out, "  {}: {}{};", p.name, p.type_path, p.multiplicity);
            }
            out.push('}');
            Ok(out)
        }
        PackageableElement::Enumeration(e) => {
            let mut out = format!(
                "Enum {}{}\n{{\n",
                render_annotations(&e.stereotypes, &e.tagged_values),
                e.path
            );
            if !e.values.is_empty() {
                let _ = writeln!(out, "  {}", e.values.join(", "));
            }
            out.push('}');
            Ok(out)
        }
        other => Err(ComposerError::new(other.path().to_string())),
    }
}

/// Built-in renderer for `Data` section elements.
pub fn render_data_element(
    element: &PackageableElement,
    registry: &ComposerRegistry,
) -> Result<String, ComposerError> {
    match element {
        PackageableElement::Data(d) => Ok(format!(
            "Data {}{}\n{}",
            render_annotations(&d.stereotypes, &d.tagged_values),
            d.path,
            registry.render_embedded(&d.path.to_string(), &d.data)?
        )),
        other => Err(ComposerError::new(other.path().to_string())),
    }
}

pub fn render_text_data(data: &EmbeddedData) -> Option<String> {
    match data {
        EmbeddedData::Text { content_type, text } => Some(format!(
            "Text #{{\n  contentType: '{}';\n  data: '{}';\n}}#",
            escape(content_type),
            escape(text)
        )),
        _ => None,
    }
}

/// Uppercase hex grouped in 4-character chunks separated by single spaces;
/// input spacing and case are not preserved.
pub(crate) fn grouped_hex(hex: &str) -> String {
    let digits: String = hex
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    digits
        .as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_binary_data(data: &EmbeddedData) -> Option<String> {
    match data {
        EmbeddedData::Binary { content_type, hex } => Some(format!(
            "Binary #{{\n  contentType: '{}';\n  data: '{}';\n}}#",
            escape(content_type),
            grouped_hex(hex)
        )),
        _ => None,
    }
}

pub fn render_collection_data(data: &EmbeddedData) -> Option<String> {
    match data {
        EmbeddedData::Collection { items } => {
            if items.is_empty() {
                return Some("PureCollection #{\n  data: [];\n}#".to_string());
            }
            let rendered: Vec<String> = items.iter().map(render_value).collect();
            Some(format!(
                "PureCollection #{{\n  data: [\n    {}\n  ];\n}}#",
                rendered.join(",\n    ")
            ))
        }
        _ => None,
    }
}

pub fn render_reference_data(data: &EmbeddedData) -> Option<String> {
    match data {
        EmbeddedData::Reference { path } => Some(format!("Reference #{{ {} }}#", path)),
        _ => None,
    }
}

fn render_value(v: &ValueExpression) -> String {
    match v {
        ValueExpression::String(s) => format!("'{}'", escape(s)),
        ValueExpression::Integer(i) => i.to_string(),
        ValueExpression::Float(f) => {
            let s = f.to_string();
            // Keep a dot so the literal re-parses as a float, not an integer.
            if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
                s
            } else {
                format!("{}.0", s)
            }
        }
        ValueExpression::Decimal(d) => format!("{}D", d),
        ValueExpression::Boolean(b) => b.to_string(),
        ValueExpression::StrictDate(d) => format!("%{}", d),
        ValueExpression::StrictTime(t) => format!("%{}", t),
        ValueExpression::DateTime(dt) => format!("%{}", dt),
        ValueExpression::EnumValue { enumeration, value, .. } => {
            format!("{}.{}", enumeration, value)
        }
        ValueExpression::Collection(items) => {
            let rendered: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        ValueExpression::New { class, assignments, .. } => {
            let rendered: Vec<String> = assignments
                .iter()
                .map(|(name, value)| format!("{} = {}", name, render_value(value)))
                .collect();
            format!("^{}({})", class, rendered.join(", "))
        }
        ValueExpression::ElementRef { path, .. } => path.to_string(),
    }
}
