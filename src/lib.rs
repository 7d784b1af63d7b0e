//! # modellang — Sectioned Modeling DSL Compiler
//!
//! A two-directional compiler for a modeling DSL whose source is organized
//! into typed sections: parsing produces a flat protocol model, compilation
//! resolves it into a semantic graph, and composition renders a protocol model
//! back into source text. Section kinds and embedded-data kinds are pluggable
//! through registries, so new vocabulary needs no changes to the core
//! dispatch.
//!
//! ## DSL structure
//!
//! - **Sections**: `###Name` marker lines split the source; text before the
//!   first marker belongs to the implicit `Pure` section.
//! - **Pure section**: `Class` and `Enum` declarations with properties,
//!   multiplicities, stereotypes and tagged values.
//! - **Data section**: `Data` declarations wrapping one embedded-data payload
//!   (`Text`, `Binary`, `PureCollection`, `Reference`).
//!
//! ## Example DSL
//!
//! ```text
//! ###Pure
//! Class my::Person
//! {
//!   lastName: String[1];
//! }
//!
//! ###Data
//! Data meta::data::MyData
//! Text #{
//!   contentType: 'application/json';
//!   data: '{"some":"data"}';
//! }#
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use modellang::{compile, compose, parse, GrammarRegistries};
//!
//! let registries = GrammarRegistries::with_builtins();
//! let source = "###Data\nData a::D\nText #{\n  contentType: 't';\n  data: 'd';\n}#\n";
//! let model = parse(source, &registries).unwrap();
//! let graph = compile(&model, &registries).unwrap();
//! assert!(graph.get_by_str("a::D").is_some());
//! let text = compose(&model, &registries.composer).unwrap();
//! # let _ = text;
//! ```

pub mod ast;
pub mod compiler;
pub mod composer;
pub mod error;
pub mod graph;
pub mod parser;
pub mod registry;
pub mod section;
pub mod span;

pub use ast::{
    DataElement, EmbeddedData, PackageableElement, PackageablePath, ProtocolModel, ValueExpression,
};
pub use compiler::{compile, CompileContext};
pub use composer::{compose, compose_elements, ComposerRegistry};
pub use error::{CompileError, ComposerError, ParseError, PipelineError, RegistryError};
pub use graph::{CompiledData, CompiledValue, GraphNode, GraphNodeKind, NodeId, SemanticGraph};
pub use parser::parse;
pub use registry::{
    EmbeddedDataCompilerRegistry, EmbeddedDataParserRegistry, GrammarRegistries,
    SectionParserRegistry,
};
pub use section::{split, SectionBlock, DEFAULT_SECTION};
pub use span::{Offset, SourceRange};
