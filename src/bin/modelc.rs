//! Compile (and optionally recompose) modeling DSL source files.
//!
//! Usage:
//!   modelc [OPTIONS] [FILE ...]
//!   modelc < file.pure
//!
//! Without options, parses and compiles each input and prints a one-line
//! summary per compiled element. Errors are printed with their source range
//! and the process exits non-zero.
//!
//! Options:
//!   --compose, -c  Print the composed (normalized) source instead of the
//!                  compile summary.

use modellang::{compile, compose, parse, CompiledData, GrammarRegistries, GraphNodeKind};
use std::io::{self, Read};

fn run(name: &str, source: &str, registries: &GrammarRegistries, do_compose: bool) -> bool {
    let model = match parse(source, registries) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}: {}", name, e);
            return false;
        }
    };
    if do_compose {
        match compose(&model, &registries.composer) {
            Ok(text) => {
                print!("{}", text);
                return true;
            }
            Err(e) => {
                eprintln!("{}: {}", name, e);
                return false;
            }
        }
    }
    match compile(&model, registries) {
        Ok(graph) => {
            println!("{}: ok, {} elements", name, graph.len());
            for node in graph.iter() {
                let kind = match &node.kind {
                    GraphNodeKind::Class { properties } => {
                        format!("Class ({} properties)", properties.len())
                    }
                    GraphNodeKind::Enumeration { values } => {
                        format!("Enum ({} values)", values.len())
                    }
                    GraphNodeKind::Data { data } => match data {
                        CompiledData::Text { content_type, .. } => {
                            format!("Data (Text, {})", content_type)
                        }
                        CompiledData::Binary { content_type, hex } => {
                            format!("Data (Binary, {}, {} bytes)", content_type, hex.len() / 2)
                        }
                        CompiledData::Collection { items } => {
                            format!("Data (PureCollection, {} items)", items.len())
                        }
                    },
                };
                println!("  {} {}", node.path, kind);
            }
            true
        }
        Err(e) => {
            eprintln!("{}: {}", name, e);
            false
        }
    }
}

fn main() -> anyhow::Result<()> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let do_compose = if let Some(pos) = args.iter().position(|a| a == "--compose" || a == "-c") {
        args.remove(pos);
        true
    } else {
        false
    };

    let registries = GrammarRegistries::with_builtins();
    let mut ok = true;

    if args.is_empty() {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        ok &= run("<stdin>", &src, &registries, do_compose);
    } else {
        for path in &args {
            let src = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("{}: {}", path, e))?;
            ok &= run(path, &src, &registries, do_compose);
        }
    }

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
