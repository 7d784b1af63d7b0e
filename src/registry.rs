//! Pluggable dispatch tables for section kinds and embedded-data kinds.
//!
//! The registries are the only process-wide shared state in the pipeline:
//! populate them once at startup (duplicate registration fails fast with a
//! [`RegistryError`]), then share them read-only across any number of
//! concurrent compilation units. All handlers are plain `fn` pointers, so a
//! populated registry is `Send + Sync`.

use crate::ast::{EmbeddedData, PackageableElement};
use crate::compiler::CompileContext;
use crate::composer::ComposerRegistry;
use crate::error::{CompileError, ParseError, RegistryError};
use crate::graph::CompiledData;
use crate::section::SectionBlock;
use crate::span::{Offset, SourceRange};
use std::collections::HashMap;

/// Turns one section block into protocol-model elements. Parsers are pure
/// functions of their input; the only state they may consult is the
/// embedded-data parser registry handed to them.
pub type SectionParserFn =
    fn(&SectionBlock, &EmbeddedDataParserRegistry) -> Result<Vec<PackageableElement>, ParseError>;

/// Turns a raw embedded-data body into a typed payload. `offset` places the
/// body in whole-file coordinates; `block_range` is the full `Kind #{ .. }#`
/// block, used for errors that have no finer position.
pub type EmbeddedDataParserFn =
    fn(body: &str, offset: Offset, block_range: SourceRange) -> Result<EmbeddedData, ParseError>;

/// Compiles a parsed payload into its graph form. `data_range` is the payload
/// block's range in the source.
pub type EmbeddedDataCompilerFn =
    fn(&EmbeddedData, SourceRange, &CompileContext) -> Result<CompiledData, CompileError>;

/// Section-name → parser map.
#[derive(Debug, Default)]
pub struct SectionParserRegistry {
    parsers: HashMap<String, SectionParserFn>,
}

impl SectionParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, parser: SectionParserFn) -> Result<(), RegistryError> {
        if self.parsers.insert(name.to_string(), parser).is_some() {
            return Err(RegistryError::new("section", name));
        }
        Ok(())
    }

    /// Parse one block with the parser registered for its name. A lookup miss
    /// is a ParseError, never a silent no-op.
    pub fn parse(
        &self,
        block: &SectionBlock,
        data_parsers: &EmbeddedDataParserRegistry,
    ) -> Result<Vec<PackageableElement>, ParseError> {
        match self.parsers.get(&block.name) {
            Some(parser) => parser(block, data_parsers),
            None => Err(ParseError::new(
                format!("Unknown section '{}'", block.name),
                block.range,
            )),
        }
    }
}

/// Data-kind tag → payload parser map.
#[derive(Debug, Default)]
pub struct EmbeddedDataParserRegistry {
    parsers: HashMap<String, EmbeddedDataParserFn>,
}

impl EmbeddedDataParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: &str, parser: EmbeddedDataParserFn) -> Result<(), RegistryError> {
        if self.parsers.insert(kind.to_string(), parser).is_some() {
            return Err(RegistryError::new("embedded data parser", kind));
        }
        Ok(())
    }

    pub fn parse(
        &self,
        kind: &str,
        body: &str,
        offset: Offset,
        block_range: SourceRange,
    ) -> Result<EmbeddedData, ParseError> {
        match self.parsers.get(kind) {
            Some(parser) => parser(body, offset, block_range),
            None => Err(ParseError::new(
                format!("Unknown embedded data type '{}'", kind),
                block_range,
            )),
        }
    }
}

/// Data-kind tag → payload compiler map; mirrors the parser registry at the
/// graph level.
#[derive(Debug, Default)]
pub struct EmbeddedDataCompilerRegistry {
    compilers: HashMap<String, EmbeddedDataCompilerFn>,
}

impl EmbeddedDataCompilerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        kind: &str,
        compiler: EmbeddedDataCompilerFn,
    ) -> Result<(), RegistryError> {
        if self.compilers.insert(kind.to_string(), compiler).is_some() {
            return Err(RegistryError::new("embedded data compiler", kind));
        }
        Ok(())
    }

    pub fn compile(
        &self,
        data: &EmbeddedData,
        data_range: SourceRange,
        ctx: &CompileContext,
    ) -> Result<CompiledData, CompileError> {
        match self.compilers.get(data.kind()) {
            Some(compiler) => compiler(data, data_range, ctx),
            None => Err(CompileError::new(
                format!("No compiler for embedded data type '{}'", data.kind()),
                data_range,
            )),
        }
    }
}

/// The full set of dispatch tables for one process: section parsers,
/// embedded-data parsers/compilers and the composer maps.
#[derive(Debug, Default)]
pub struct GrammarRegistries {
    pub sections: SectionParserRegistry,
    pub data_parsers: EmbeddedDataParserRegistry,
    pub data_compilers: EmbeddedDataCompilerRegistry,
    pub composer: ComposerRegistry,
}

impl GrammarRegistries {
    /// Empty registries, for fully custom vocabularies.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registries wired with the built-in vocabulary: `Pure` and `Data`
    /// sections, and the `Text`, `Binary`, `PureCollection` and `Reference`
    /// embedded-data kinds.
    pub fn with_builtins() -> Self {
        let mut r = Self::empty();
        r.sections
            .register("Pure", crate::parser::parse_pure_section)
            .expect("builtin section registration");
        r.sections
            .register("Data", crate::parser::parse_data_section)
            .expect("builtin section registration");

        r.data_parsers
            .register("Text", crate::parser::parse_text_payload)
            .expect("builtin data parser registration");
        r.data_parsers
            .register("Binary", crate::parser::parse_binary_payload)
            .expect("builtin data parser registration");
        r.data_parsers
            .register("PureCollection", crate::parser::parse_collection_payload)
            .expect("builtin data parser registration");
        r.data_parsers
            .register("Reference", crate::parser::parse_reference_payload)
            .expect("builtin data parser registration");

        r.data_compilers
            .register("Text", crate::compiler::compile_text_data)
            .expect("builtin data compiler registration");
        r.data_compilers
            .register("Binary", crate::compiler::compile_binary_data)
            .expect("builtin data compiler registration");
        r.data_compilers
            .register("PureCollection", crate::compiler::compile_collection_data)
            .expect("builtin data compiler registration");

        r.composer.register_builtins();
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_section(
        _: &SectionBlock,
        _: &EmbeddedDataParserRegistry,
    ) -> Result<Vec<PackageableElement>, ParseError> {
        Ok(vec![])
    }

    #[test]
    fn duplicate_section_registration_fails_fast() {
        let mut reg = SectionParserRegistry::new();
        reg.register("Mapping", dummy_section).expect("first registration");
        let err = reg.register("Mapping", dummy_section).expect_err("duplicate");
        assert_eq!(err.name, "Mapping");
        assert_eq!(err.what, "section");
    }

    #[test]
    fn unknown_section_is_parse_error() {
        let reg = SectionParserRegistry::new();
        let block = SectionBlock {
            name: "Mystery".to_string(),
            body: String::new(),
            body_start_line: 2,
            range: SourceRange::new(1, 1, 1, 10),
        };
        let err = reg
            .parse(&block, &EmbeddedDataParserRegistry::new())
            .expect_err("must fail");
        assert!(err.message.contains("Unknown section 'Mystery'"));
    }

    #[test]
    fn builtins_cover_both_directions() {
        let r = GrammarRegistries::with_builtins();
        assert!(r.sections.parsers.contains_key("Pure"));
        assert!(r.sections.parsers.contains_key("Data"));
        for kind in ["Text", "Binary", "PureCollection", "Reference"] {
            assert!(r.data_parsers.parsers.contains_key(kind), "parser for {kind}");
        }
        for kind in ["Text", "Binary", "PureCollection"] {
            assert!(r.data_compilers.compilers.contains_key(kind), "compiler for {kind}");
        }
    }

    #[test]
    fn registries_are_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<GrammarRegistries>();
    }
}
