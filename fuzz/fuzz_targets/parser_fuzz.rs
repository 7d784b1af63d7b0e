//! Parser fuzz target: feed arbitrary bytes through the full pipeline.
//! Neither parse nor compile may panic; both return structured errors.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let registries = modellang::GrammarRegistries::with_builtins();
    if let Ok(model) = modellang::parse(s, &registries) {
        let _ = modellang::compile(&model, &registries);
        let _ = modellang::compose(&model, &registries.composer);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
