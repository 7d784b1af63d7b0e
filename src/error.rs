//! Error types for the parse, compile and compose pipelines.
//!
//! Every parse/compile error carries the source range of the offending
//! construct; composer errors operate on already-parsed structures and carry
//! only the element path. Errors abort the whole unit (no partial results).

use crate::span::SourceRange;

/// Malformed syntax: unknown section or data kind, missing required field,
/// bad literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("PARSER error at {range}: {message}")]
pub struct ParseError {
    pub message: String,
    pub range: SourceRange,
}

impl ParseError {
    pub fn new(message: impl Into<String>, range: SourceRange) -> Self {
        ParseError { message: message.into(), range }
    }
}

/// Semantically invalid but syntactically well-formed input: duplicate path,
/// unresolved reference, disallowed payload shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("COMPILATION error at {range}: {message}")]
pub struct CompileError {
    pub message: String,
    pub range: SourceRange,
}

impl CompileError {
    pub fn new(message: impl Into<String>, range: SourceRange) -> Self {
        CompileError { message: message.into(), range }
    }

    pub fn duplicated_element(path: &crate::ast::PackageablePath, range: SourceRange) -> Self {
        CompileError::new(format!("Duplicated element '{}'", path), range)
    }
}

/// No renderer registered for an element or payload kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Can't transform element '{path}' in this section")]
pub struct ComposerError {
    pub path: String,
}

impl ComposerError {
    pub fn new(path: impl Into<String>) -> Self {
        ComposerError { path: path.into() }
    }
}

/// Configuration conflict surfaced at registry construction (duplicate kind
/// registration), never deferred to first use.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate registration for {what} '{name}'")]
pub struct RegistryError {
    pub what: &'static str,
    pub name: String,
}

impl RegistryError {
    pub fn new(what: &'static str, name: impl Into<String>) -> Self {
        RegistryError { what, name: name.into() }
    }
}

/// Parse or compile failure for the full `parse` + `compile` pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}
