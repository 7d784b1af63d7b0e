//! Protocol model: the parsed, pre-resolution representation of source text.
//!
//! Elements are created once per parse and never mutated in place; the
//! composer reads them and produces new text.

use crate::span::SourceRange;
use std::fmt;

/// `::`-separated element path. Non-empty; equality is equality of the
/// identifier sequence. The unique key for namespace resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageablePath(Vec<String>);

impl PackageablePath {
    /// Build from identifier parts. Returns None for an empty sequence.
    pub fn new(parts: Vec<String>) -> Option<Self> {
        if parts.is_empty() {
            None
        } else {
            Some(PackageablePath(parts))
        }
    }

    /// Parse `a::b::c`. Empty identifiers (`a::::b`) are rejected.
    pub fn parse(text: &str) -> Option<Self> {
        let parts: Vec<String> = text.split("::").map(str::to_string).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return None;
        }
        PackageablePath::new(parts)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Last identifier of the path.
    pub fn name(&self) -> &str {
        self.0.last().expect("path is non-empty")
    }
}

impl fmt::Display for PackageablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("::"))
    }
}

/// `<<profile.value>>` stereotype application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stereotype {
    pub profile: PackageablePath,
    pub value: String,
}

/// `{profile.tag = 'text'}` tagged annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedValue {
    pub profile: PackageablePath,
    pub tag: String,
    pub value: String,
}

/// A top-level named declaration addressable by a namespaced path.
#[derive(Debug, Clone, PartialEq)]
pub enum PackageableElement {
    Class(ClassDecl),
    Enumeration(EnumDecl),
    Data(DataElement),
}

impl PackageableElement {
    pub fn path(&self) -> &PackageablePath {
        match self {
            PackageableElement::Class(c) => &c.path,
            PackageableElement::Enumeration(e) => &e.path,
            PackageableElement::Data(d) => &d.path,
        }
    }

    pub fn range(&self) -> SourceRange {
        match self {
            PackageableElement::Class(c) => c.range,
            PackageableElement::Enumeration(e) => e.range,
            PackageableElement::Data(d) => d.range,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub path: PackageablePath,
    pub stereotypes: Vec<Stereotype>,
    pub tagged_values: Vec<TaggedValue>,
    pub properties: Vec<PropertyDecl>,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub name: String,
    /// Primitive name or a path to a Class/Enum; resolved at compile time.
    pub type_path: PackageablePath,
    pub multiplicity: Multiplicity,
    pub range: SourceRange,
}

/// `[1]`, `[*]`, `[0..1]`, `[m..n]`, `[m..*]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Multiplicity {
    pub lower: u64,
    /// None means unbounded (`*`).
    pub upper: Option<u64>,
}

impl Multiplicity {
    pub const ONE: Multiplicity = Multiplicity { lower: 1, upper: Some(1) };
    pub const MANY: Multiplicity = Multiplicity { lower: 0, upper: None };
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.lower, self.upper) {
            (0, None) => write!(f, "[*]"),
            (lo, Some(hi)) if lo == hi => write!(f, "[{}]", lo),
            (lo, None) => write!(f, "[{}..*]", lo),
            (lo, Some(hi)) => write!(f, "[{}..{}]", lo, hi),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub path: PackageablePath,
    pub stereotypes: Vec<Stereotype>,
    pub tagged_values: Vec<TaggedValue>,
    pub values: Vec<String>,
    pub range: SourceRange,
}

/// A declaration wrapping one embedded-data payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DataElement {
    pub path: PackageablePath,
    pub stereotypes: Vec<Stereotype>,
    pub tagged_values: Vec<TaggedValue>,
    pub data: EmbeddedData,
    /// Range of the `<Kind> #{ ... }#` block only.
    pub data_range: SourceRange,
    pub range: SourceRange,
}

/// An inline literal payload attached to a declaration. Immutable once parsed.
/// Externally registered kinds parse into one of these shapes through the
/// embedded-data parser registry.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddedData {
    Text {
        content_type: String,
        text: String,
    },
    /// Hex digits as written (whitespace and case preserved until compile).
    Binary {
        content_type: String,
        hex: String,
    },
    Collection {
        items: Vec<ValueExpression>,
    },
    /// Bare reference to another element by path. Parseable, but rejected by
    /// the compiler inside a Data element.
    Reference {
        path: PackageablePath,
    },
}

impl EmbeddedData {
    /// Kind tag used for registry dispatch in both directions.
    pub fn kind(&self) -> &'static str {
        match self {
            EmbeddedData::Text { .. } => "Text",
            EmbeddedData::Binary { .. } => "Binary",
            EmbeddedData::Collection { .. } => "PureCollection",
            EmbeddedData::Reference { .. } => "Reference",
        }
    }
}

/// A typed literal or constructor invocation inside a collection payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpression {
    String(String),
    Integer(i64),
    Float(f64),
    /// `D`-suffixed decimal, kept lexically without the suffix (`0.98`).
    Decimal(String),
    Boolean(bool),
    /// `%2001-03-12`, kept lexically without the `%`.
    StrictDate(String),
    /// `%12:23:45.100`, kept lexically without the `%`.
    StrictTime(String),
    /// `%2020-09-11T12:56:24.487`, kept lexically without the `%`.
    DateTime(String),
    EnumValue {
        enumeration: PackageablePath,
        value: String,
        range: SourceRange,
    },
    Collection(Vec<ValueExpression>),
    /// `^pkg::Type(field = value, ...)` constructor invocation.
    New {
        class: PackageablePath,
        assignments: Vec<(String, ValueExpression)>,
        range: SourceRange,
    },
    /// Bare element path used as a value.
    ElementRef {
        path: PackageablePath,
        range: SourceRange,
    },
}

/// Ordered sequence of parsed elements. Order is significant for composition
/// determinism; for compilation it only decides which occurrence of a
/// duplicated path is reported as canonical (the first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolModel {
    pub elements: Vec<PackageableElement>,
}

impl ProtocolModel {
    pub fn new(elements: Vec<PackageableElement>) -> Self {
        ProtocolModel { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageableElement> {
        self.elements.iter()
    }
}
