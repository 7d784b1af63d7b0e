//! Composition tests: rendering, grouping, determinism and round-trips.

use modellang::composer::{
    builtin_section_of, render_data_element, render_pure_element, render_text_data,
};
use modellang::{compose, compose_elements, parse, ComposerRegistry, GrammarRegistries};

fn registries() -> GrammarRegistries {
    GrammarRegistries::with_builtins()
}

fn recompose(src: &str) -> String {
    let regs = registries();
    let model = parse(src, &regs).expect("parse");
    compose(&model, &regs.composer).expect("compose")
}

#[test]
fn compose_empty_model() {
    let regs = registries();
    let model = parse("", &regs).expect("parse");
    assert_eq!(compose(&model, &regs.composer).expect("compose"), "");
}

#[test]
fn compose_groups_elements_by_section() {
    // Interleaved sections in the input collapse into one group per section,
    // in first-use order, with elements keeping model order.
    let src = "###Pure\n\
               Class a::A\n\
               {\n\
               \x20 name: String[1];\n\
               }\n\
               \n\
               ###Data\n\
               Data a::D\n\
               Text #{\n\
               \x20 contentType: 't/p';\n\
               \x20 data: 'x';\n\
               }#\n\
               \n\
               ###Pure\n\
               Class a::B\n\
               {\n\
               }\n";
    let expected = "###Pure\n\
                    Class a::A\n\
                    {\n\
                    \x20 name: String[1];\n\
                    }\n\
                    \n\
                    Class a::B\n\
                    {\n\
                    }\n\
                    \n\
                    \n\
                    ###Data\n\
                    Data a::D\n\
                    Text #{\n\
                    \x20 contentType: 't/p';\n\
                    \x20 data: 'x';\n\
                    }#\n";
    assert_eq!(recompose(src), expected);
}

#[test]
fn compose_always_emits_explicit_marker() {
    // Input relying on the implicit Pure preamble comes back with a marker.
    let out = recompose("Class model::element {}");
    assert_eq!(out, "###Pure\nClass model::element\n{\n}\n");
}

#[test]
fn compose_renders_enum_on_one_line() {
    let out = recompose("Enum enums::Gender\n{\n  MALE,\n  FEMALE,\n  OTHER\n}\n");
    assert_eq!(out, "###Pure\nEnum enums::Gender\n{\n  MALE, FEMALE, OTHER\n}\n");
}

#[test]
fn compose_preserves_annotations() {
    let src = "###Data\n\
               Data <<meta::pure::profiles::typemodifiers.abstract>> {doc.doc = 'something'} meta::data::MyData\n\
               Text #{\n\
               \x20 contentType: 'application/json';\n\
               \x20 data: '{\"some\":\"data\"}';\n\
               }#\n";
    let out = recompose(src);
    assert!(
        out.contains(
            "Data <<meta::pure::profiles::typemodifiers.abstract>> {doc.doc = 'something'} meta::data::MyData"
        ),
        "{}",
        out
    );
}

#[test]
fn compose_groups_hex_in_four_digit_chunks() {
    let src = "###Data\nData a::D\nBinary #{\n  contentType: 'x';\n  data: '1b4a9dea230fff20';\n}#\n";
    let out = recompose(src);
    assert!(out.contains("data: '1B4A 9DEA 230F FF20';"), "{}", out);
}

#[test]
fn compose_renders_reference_payload() {
    let src = "###Data\nData a::D\nReference #{ meta::data::Other }#\n";
    let out = recompose(src);
    assert!(out.contains("Reference #{ meta::data::Other }#"), "{}", out);
}

#[test]
fn compose_escapes_quotes_and_round_trips_them() {
    let src = "###Data\nData a::D\nText #{\n  contentType: 'text/plain';\n  data: 'it\\'s';\n}#\n";
    let out = recompose(src);
    assert!(out.contains("data: 'it\\'s';"), "{}", out);
    // Re-parsing the composed text yields the same unescaped payload.
    let regs = registries();
    let model = parse(&out, &regs).expect("reparse");
    match &model.elements[0] {
        modellang::PackageableElement::Data(d) => match &d.data {
            modellang::EmbeddedData::Text { text, .. } => assert_eq!(text, "it's"),
            other => panic!("expected text data, got {:?}", other),
        },
        other => panic!("expected a data element, got {:?}", other),
    }
}

#[test]
fn compose_renders_collection_values() {
    let src = "###Pure\n\
               Enum enums::Gender\n\
               {\n\
               \x20 MALE\n\
               }\n\
               \n\
               Class my::Person\n\
               {\n\
               \x20 lastName: String[1];\n\
               }\n\
               \n\
               ###Data\n\
               Data a::D\n\
               PureCollection #{\n\
               \x20 data: [\n\
               \x20   ^my::Person(lastName = 'Bloggs', height = 1.0, born = %2001-03-12, gender = enums::Gender.MALE),\n\
               \x20   ^my::Person(lastName = 'Doe')\n\
               \x20 ];\n\
               }#\n";
    let out = recompose(src);
    assert!(
        out.contains(
            "PureCollection #{\n  data: [\n    ^my::Person(lastName = 'Bloggs', height = 1.0, born = %2001-03-12, gender = enums::Gender.MALE),\n    ^my::Person(lastName = 'Doe')\n  ];\n}#"
        ),
        "{}",
        out
    );
}

// ==================== Round-trip stability ====================

#[test]
fn compose_is_idempotent_after_one_pass() {
    let src = "Class my::Person\n\
               {\n\
               \x20   givenNames :String[*];\n\
               \x20 lastName: String[1];\n\
               }\n\
               ###Data\n\
               Data a::D\n\
               Binary #{\n\
               \x20 contentType: 'x';\n\
               \x20 data: 'deadBEEF';\n\
               }#\n";
    let first = recompose(src);
    let second = recompose(&first);
    assert_eq!(first, second);
}

#[test]
fn compose_is_deterministic() {
    let src = "Class a::A\n{\n  x: Integer[1];\n}\n";
    assert_eq!(recompose(src), recompose(src));
}

// ==================== Partial composition ====================

#[test]
fn element_without_renderer_fails_alone() {
    // A registry that only knows Text payloads: the Binary element fails,
    // the Text element still renders.
    let mut composer = ComposerRegistry::new();
    composer.register_section_of(builtin_section_of);
    composer
        .register_section_renderer("Pure", render_pure_element)
        .expect("register");
    composer
        .register_section_renderer("Data", render_data_element)
        .expect("register");
    composer
        .register_embedded_renderer("Text", render_text_data)
        .expect("register");

    let regs = registries();
    let src = "###Data\n\
               Data a::Txt\n\
               Text #{\n\
               \x20 contentType: 'x';\n\
               \x20 data: 'y';\n\
               }#\n\
               \n\
               Data a::Bin\n\
               Binary #{\n\
               \x20 contentType: 'x';\n\
               \x20 data: 'FF';\n\
               }#\n";
    let model = parse(src, &regs).expect("parse");

    let results = compose_elements(&model, &composer);
    assert_eq!(results.len(), 2);
    assert!(results[0].as_ref().is_ok_and(|s| s.starts_with("Data a::Txt\nText #{")));
    let err = results[1].as_ref().expect_err("no Binary renderer");
    assert_eq!(err.to_string(), "Can't transform element 'a::Bin' in this section");

    // Whole-model composition fails on the same element.
    let err = compose(&model, &composer).expect_err("must fail");
    assert_eq!(err.path, "a::Bin");
}

#[test]
fn element_without_section_mapping_fails() {
    let composer = ComposerRegistry::new();
    let regs = registries();
    let model = parse("Class a::A {}", &regs).expect("parse");
    let err = compose(&model, &composer).expect_err("must fail");
    assert_eq!(err.to_string(), "Can't transform element 'a::A' in this section");
}
