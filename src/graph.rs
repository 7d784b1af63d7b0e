//! Semantic graph: the resolved, cross-referenced counterpart of the protocol
//! model.
//!
//! All nodes live in one owning arena indexed by path; relations between nodes
//! are `NodeId`s into that arena, never aliased references. Reference cycles
//! between classes are fine; the arena owns everything for the lifetime of one
//! compiled model and nodes are immutable once the compile returns.

use crate::ast::{Multiplicity, PackageablePath};
use crate::span::SourceRange;
use std::collections::HashMap;

/// Index of a node in its owning [`SemanticGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub path: PackageablePath,
    pub kind: GraphNodeKind,
    pub range: SourceRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphNodeKind {
    Class { properties: Vec<CompiledProperty> },
    Enumeration { values: Vec<String> },
    Data { data: CompiledData },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProperty {
    pub name: String,
    pub ty: PropertyType,
    pub multiplicity: Multiplicity,
}

/// A property's resolved type: a built-in primitive or another graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Primitive(PrimitiveType),
    Reference(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    String,
    Integer,
    Float,
    Decimal,
    Boolean,
    StrictDate,
    StrictTime,
    DateTime,
}

impl PrimitiveType {
    /// Maps a single-identifier type name to a primitive, if it is one.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "String" => PrimitiveType::String,
            "Integer" => PrimitiveType::Integer,
            "Float" => PrimitiveType::Float,
            "Decimal" => PrimitiveType::Decimal,
            "Boolean" => PrimitiveType::Boolean,
            "StrictDate" => PrimitiveType::StrictDate,
            "StrictTime" => PrimitiveType::StrictTime,
            "DateTime" => PrimitiveType::DateTime,
            _ => return None,
        })
    }
}

/// Compiled embedded-data payload, produced by the embedded-data compiler
/// registry. Externally registered kinds compile into one of these shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledData {
    Text {
        content_type: String,
        text: String,
    },
    /// Whitespace stripped, digits uppercased.
    Binary {
        content_type: String,
        hex: String,
    },
    Collection {
        items: Vec<CompiledValue>,
    },
}

impl CompiledData {
    /// Decoded bytes of a binary payload. Only valid on `Binary`; the hex is
    /// already normalized and even-length.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        match self {
            CompiledData::Binary { hex, .. } => hex
                .as_bytes()
                .chunks(2)
                .map(|pair| {
                    std::str::from_utf8(pair)
                        .ok()
                        .and_then(|s| u8::from_str_radix(s, 16).ok())
                })
                .collect(),
            _ => None,
        }
    }
}

/// Compiled collection item: literals carried over, references resolved to
/// node ids.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledValue {
    String(String),
    Integer(i64),
    Float(f64),
    Decimal(String),
    Boolean(bool),
    StrictDate(String),
    StrictTime(String),
    DateTime(String),
    EnumValue {
        enumeration: NodeId,
        value: String,
    },
    Collection(Vec<CompiledValue>),
    Instance {
        class: NodeId,
        assignments: Vec<(String, CompiledValue)>,
    },
}

/// The compiled model: arena of nodes plus path index. Either fully resolved
/// or never published (the compiler returns an error instead).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<PackageablePath, NodeId>,
}

impl SemanticGraph {
    pub(crate) fn from_parts(
        nodes: Vec<GraphNode>,
        index: HashMap<PackageablePath, NodeId>,
    ) -> Self {
        SemanticGraph { nodes, index }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn resolve(&self, path: &PackageablePath) -> Option<NodeId> {
        self.index.get(path).copied()
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    /// Look a node up by path.
    pub fn get(&self, path: &PackageablePath) -> Option<&GraphNode> {
        self.resolve(path).map(|id| self.node(id))
    }

    /// Convenience lookup from path text (`a::b::c`).
    pub fn get_by_str(&self, path: &str) -> Option<&GraphNode> {
        PackageablePath::parse(path).and_then(|p| self.get(&p))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }
}
