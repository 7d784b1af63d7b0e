//! Compile a protocol model into a semantic graph.
//!
//! Three strictly ordered phases per compilation unit:
//!
//! 1. **Namespace registration** — every element path is inserted into the
//!    namespace table; a collision fails the whole unit with the second
//!    occurrence's position (the first occurrence is canonical).
//! 2. **Structural validation** — payload shapes that are never legal are
//!    rejected before any node is built (a Data element must not reference
//!    another Data element).
//! 3. **Resolution and node construction** — paths become node ids, embedded
//!    payloads are compiled through the embedded-data compiler registry.
//!
//! Compilation is all-or-nothing: the first error aborts the unit and no
//! partial graph is published.

use crate::ast::*;
use crate::error::CompileError;
use crate::graph::*;
use crate::registry::GrammarRegistries;
use crate::span::SourceRange;
use std::collections::HashMap;

/// Read-only view over the namespace for payload compilers: path resolution
/// and structural-type lookup.
pub struct CompileContext<'a> {
    model: &'a ProtocolModel,
    index: &'a HashMap<PackageablePath, NodeId>,
}

impl<'a> CompileContext<'a> {
    pub fn resolve(&self, path: &PackageablePath) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    /// Protocol-level element for a node id. Ids are assigned in model order,
    /// so this is valid for forward references during node construction.
    pub fn element(&self, id: NodeId) -> &'a PackageableElement {
        &self.model.elements[id.0]
    }

    /// Structural-type lookup: class declaration by path.
    pub fn class(&self, path: &PackageablePath) -> Option<(NodeId, &'a ClassDecl)> {
        let id = self.resolve(path)?;
        match self.element(id) {
            PackageableElement::Class(c) => Some((id, c)),
            _ => None,
        }
    }

    /// Structural-type lookup: enumeration declaration by path.
    pub fn enumeration(&self, path: &PackageablePath) -> Option<(NodeId, &'a EnumDecl)> {
        let id = self.resolve(path)?;
        match self.element(id) {
            PackageableElement::Enumeration(e) => Some((id, e)),
            _ => None,
        }
    }

    fn is_data_element(&self, path: &PackageablePath) -> bool {
        matches!(
            self.resolve(path).map(|id| self.element(id)),
            Some(PackageableElement::Data(_))
        )
    }
}

/// Compile a protocol model into a fully resolved semantic graph, or fail with
/// the first error encountered.
pub fn compile(
    model: &ProtocolModel,
    registries: &GrammarRegistries,
) -> Result<SemanticGraph, CompileError> {
    // Phase 1: namespace registration, in element order.
    let mut index: HashMap<PackageablePath, NodeId> = HashMap::with_capacity(model.len());
    for (i, element) in model.iter().enumerate() {
        if index.contains_key(element.path()) {
            return Err(CompileError::duplicated_element(element.path(), element.range()));
        }
        index.insert(element.path().clone(), NodeId(i));
    }
    let ctx = CompileContext { model, index: &index };

    // Phase 2: structural validation.
    for element in model.iter() {
        if let PackageableElement::Data(d) = element {
            validate_data_payload(d, &ctx)?;
        }
    }

    // Phase 3: resolution and node construction.
    let mut nodes = Vec::with_capacity(model.len());
    for element in model.iter() {
        let kind = match element {
            PackageableElement::Class(c) => GraphNodeKind::Class {
                properties: c
                    .properties
                    .iter()
                    .map(|p| compile_property(p, &ctx))
                    .collect::<Result<_, _>>()?,
            },
            PackageableElement::Enumeration(e) => {
                GraphNodeKind::Enumeration { values: e.values.clone() }
            }
            PackageableElement::Data(d) => GraphNodeKind::Data {
                data: registries.data_compilers.compile(&d.data, d.data_range, &ctx)?,
            },
        };
        nodes.push(GraphNode {
            path: element.path().clone(),
            kind,
            range: element.range(),
        });
    }
    Ok(SemanticGraph::from_parts(nodes, index))
}

fn compile_property(
    p: &PropertyDecl,
    ctx: &CompileContext,
) -> Result<CompiledProperty, CompileError> {
    let primitive = match p.type_path.parts() {
        [single] => PrimitiveType::from_name(single),
        _ => None,
    };
    let ty = match primitive {
        Some(prim) => PropertyType::Primitive(prim),
        None => match ctx.resolve(&p.type_path) {
            Some(id) => PropertyType::Reference(id),
            None => {
                return Err(CompileError::new(
                    format!("Can't find type '{}'", p.type_path),
                    p.range,
                ))
            }
        },
    };
    Ok(CompiledProperty { name: p.name.clone(), ty, multiplicity: p.multiplicity })
}

const DATA_REFERENCE_IN_DATA: &str = "Cannot use Data element reference in a Data element";

fn validate_data_payload(d: &DataElement, ctx: &CompileContext) -> Result<(), CompileError> {
    match &d.data {
        EmbeddedData::Reference { .. } => {
            Err(CompileError::new(DATA_REFERENCE_IN_DATA, d.data_range))
        }
        EmbeddedData::Collection { items } => {
            for item in items {
                reject_data_references(item, ctx)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn reject_data_references(v: &ValueExpression, ctx: &CompileContext) -> Result<(), CompileError> {
    match v {
        ValueExpression::ElementRef { path, range } if ctx.is_data_element(path) => {
            Err(CompileError::new(DATA_REFERENCE_IN_DATA, *range))
        }
        ValueExpression::Collection(items) => {
            items.iter().try_for_each(|item| reject_data_references(item, ctx))
        }
        ValueExpression::New { assignments, .. } => assignments
            .iter()
            .try_for_each(|(_, value)| reject_data_references(value, ctx)),
        _ => Ok(()),
    }
}

// ==================== Built-in embedded-data compilers ====================

/// Text payloads compile verbatim: contentType and data survive exactly.
pub fn compile_text_data(
    data: &EmbeddedData,
    data_range: SourceRange,
    _ctx: &CompileContext,
) -> Result<CompiledData, CompileError> {
    match data {
        EmbeddedData::Text { content_type, text } => Ok(CompiledData::Text {
            content_type: content_type.clone(),
            text: text.clone(),
        }),
        other => Err(wrong_payload("Text", other, data_range)),
    }
}

/// Binary payloads: whitespace is stripped and digits uppercased; a non-hex
/// character or an odd digit count fails the compile.
pub fn compile_binary_data(
    data: &EmbeddedData,
    data_range: SourceRange,
    _ctx: &CompileContext,
) -> Result<CompiledData, CompileError> {
    match data {
        EmbeddedData::Binary { content_type, hex } => {
            let mut normalized = String::with_capacity(hex.len());
            for c in hex.chars() {
                if c.is_ascii_whitespace() {
                    continue;
                }
                if !c.is_ascii_hexdigit() {
                    return Err(CompileError::new(
                        format!("Invalid hex data: unexpected character '{}'", c),
                        data_range,
                    ));
                }
                normalized.push(c.to_ascii_uppercase());
            }
            if normalized.len() % 2 != 0 {
                return Err(CompileError::new(
                    "Invalid hex data: odd number of digits",
                    data_range,
                ));
            }
            Ok(CompiledData::Binary {
                content_type: content_type.clone(),
                hex: normalized,
            })
        }
        other => Err(wrong_payload("Binary", other, data_range)),
    }
}

/// Collection payloads: every item is compiled in order; constructor
/// invocations are checked against the namespace (class, properties, enum
/// values). Item count and order are preserved.
pub fn compile_collection_data(
    data: &EmbeddedData,
    data_range: SourceRange,
    ctx: &CompileContext,
) -> Result<CompiledData, CompileError> {
    match data {
        EmbeddedData::Collection { items } => Ok(CompiledData::Collection {
            items: items
                .iter()
                .map(|item| compile_value(item, ctx))
                .collect::<Result<_, _>>()?,
        }),
        other => Err(wrong_payload("PureCollection", other, data_range)),
    }
}

fn wrong_payload(expected: &str, got: &EmbeddedData, range: SourceRange) -> CompileError {
    CompileError::new(
        format!("{} compiler received a '{}' payload", expected, got.kind()),
        range,
    )
}

fn compile_value(v: &ValueExpression, ctx: &CompileContext) -> Result<CompiledValue, CompileError> {
    match v {
        ValueExpression::String(s) => Ok(CompiledValue::String(s.clone())),
        ValueExpression::Integer(i) => Ok(CompiledValue::Integer(*i)),
        ValueExpression::Float(f) => Ok(CompiledValue::Float(*f)),
        ValueExpression::Decimal(d) => Ok(CompiledValue::Decimal(d.clone())),
        ValueExpression::Boolean(b) => Ok(CompiledValue::Boolean(*b)),
        ValueExpression::StrictDate(d) => Ok(CompiledValue::StrictDate(d.clone())),
        ValueExpression::StrictTime(t) => Ok(CompiledValue::StrictTime(t.clone())),
        ValueExpression::DateTime(dt) => Ok(CompiledValue::DateTime(dt.clone())),
        ValueExpression::Collection(items) => Ok(CompiledValue::Collection(
            items
                .iter()
                .map(|item| compile_value(item, ctx))
                .collect::<Result<_, _>>()?,
        )),
        ValueExpression::EnumValue { enumeration, value, range } => {
            let (id, decl) = ctx.enumeration(enumeration).ok_or_else(|| {
                CompileError::new(format!("Can't find enumeration '{}'", enumeration), *range)
            })?;
            if !decl.values.iter().any(|v| v == value) {
                return Err(CompileError::new(
                    format!("Can't find enum value '{}' in enum '{}'", value, enumeration),
                    *range,
                ));
            }
            Ok(CompiledValue::EnumValue { enumeration: id, value: value.clone() })
        }
        ValueExpression::New { class, assignments, range } => {
            let (id, decl) = ctx.class(class).ok_or_else(|| {
                CompileError::new(format!("Can't find type '{}'", class), *range)
            })?;
            let mut compiled = Vec::with_capacity(assignments.len());
            for (name, value) in assignments {
                if !decl.properties.iter().any(|p| &p.name == name) {
                    return Err(CompileError::new(
                        format!("Can't find property '{}' on type '{}'", name, class),
                        *range,
                    ));
                }
                compiled.push((name.clone(), compile_value(value, ctx)?));
            }
            Ok(CompiledValue::Instance { class: id, assignments: compiled })
        }
        ValueExpression::ElementRef { path, range } => match ctx.resolve(path) {
            None => Err(CompileError::new(
                format!("Can't find element '{}'", path),
                *range,
            )),
            Some(id) => match ctx.element(id) {
                PackageableElement::Data(_) => {
                    Err(CompileError::new(DATA_REFERENCE_IN_DATA, *range))
                }
                _ => Err(CompileError::new(
                    format!("Cannot use reference to element '{}' in embedded data", path),
                    *range,
                )),
            },
        },
    }
}
