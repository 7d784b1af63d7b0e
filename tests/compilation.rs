//! Compilation tests: namespace registration, structural validation and
//! payload resolution.

use modellang::graph::{PrimitiveType, PropertyType};
use modellang::{compile, parse, CompiledData, CompiledValue, GrammarRegistries, GraphNodeKind};

fn registries() -> GrammarRegistries {
    GrammarRegistries::with_builtins()
}

fn compile_source(src: &str) -> Result<modellang::SemanticGraph, modellang::CompileError> {
    let regs = registries();
    let model = parse(src, &regs).expect("parse");
    compile(&model, &regs)
}

// ==================== Payload compilation ====================

#[test]
fn text_data_survives_verbatim() {
    let graph = compile_source(
        "###Data\n\
         Data meta::data::MyData\n\
         Text #{\n\
         \x20 contentType: 'application/json';\n\
         \x20 data: '{\"some\":\"data\"}';\n\
         }#\n",
    )
    .expect("compile");
    let node = graph.get_by_str("meta::data::MyData").expect("node");
    match &node.kind {
        GraphNodeKind::Data { data: CompiledData::Text { content_type, text } } => {
            assert_eq!(content_type, "application/json");
            assert_eq!(text, "{\"some\":\"data\"}");
        }
        other => panic!("expected text data, got {:?}", other),
    }
}

#[test]
fn binary_data_is_normalized() {
    let graph = compile_source(
        "###Data\n\
         Data meta::data::MyData\n\
         Binary #{\n\
         \x20 contentType: 'application/x-protobuf';\n\
         \x20 data: '1b4a 9dea 230f ff20';\n\
         }#\n",
    )
    .expect("compile");
    let node = graph.get_by_str("meta::data::MyData").expect("node");
    match &node.kind {
        GraphNodeKind::Data { data } => {
            match data {
                CompiledData::Binary { content_type, hex } => {
                    assert_eq!(content_type, "application/x-protobuf");
                    assert_eq!(hex, "1B4A9DEA230FFF20");
                }
                other => panic!("expected binary data, got {:?}", other),
            }
            assert_eq!(
                data.bytes(),
                Some(vec![0x1B, 0x4A, 0x9D, 0xEA, 0x23, 0x0F, 0xFF, 0x20])
            );
        }
        other => panic!("expected data node, got {:?}", other),
    }
}

#[test]
fn binary_data_rejects_non_hex() {
    let err = compile_source(
        "###Data\nData a::D\nBinary #{\n  contentType: 'x';\n  data: '1B4G';\n}#\n",
    )
    .expect_err("must fail");
    assert!(
        err.message.contains("Invalid hex data: unexpected character 'G'"),
        "{}",
        err
    );
}

#[test]
fn binary_data_rejects_odd_digit_count() {
    let err = compile_source(
        "###Data\nData a::D\nBinary #{\n  contentType: 'x';\n  data: '1B4';\n}#\n",
    )
    .expect_err("must fail");
    assert!(err.message.contains("Invalid hex data: odd number of digits"), "{}", err);
}

const COLLECTION_MODEL: &str = "###Pure\n\
    Enum enums::Gender\n\
    {\n\
    \x20 MALE, FEMALE, OTHER\n\
    }\n\
    \n\
    Class my::Address\n\
    {\n\
    \x20 street: String[1];\n\
    }\n\
    \n\
    Class my::Person\n\
    {\n\
    \x20 lastName: String[1];\n\
    \x20 gender: enums::Gender[1];\n\
    \x20 address: my::Address[0..1];\n\
    }\n\
    \n\
    ###Data\n\
    Data my::PersonData\n\
    PureCollection #{\n\
    \x20 data: [\n\
    \x20   ^my::Person(lastName = 'Bloggs', gender = enums::Gender.MALE, address = ^my::Address(street = 'A Road')),\n\
    \x20   ^my::Person(lastName = 'Doe', gender = enums::Gender.FEMALE)\n\
    \x20 ];\n\
    }#\n";

#[test]
fn collection_data_resolves_constructors() {
    let graph = compile_source(COLLECTION_MODEL).expect("compile");
    assert_eq!(graph.len(), 4);
    let person_id = graph
        .resolve(&modellang::PackageablePath::parse("my::Person").expect("path"))
        .expect("person id");
    let gender_id = graph
        .resolve(&modellang::PackageablePath::parse("enums::Gender").expect("path"))
        .expect("gender id");

    let node = graph.get_by_str("my::PersonData").expect("node");
    let items = match &node.kind {
        GraphNodeKind::Data { data: CompiledData::Collection { items } } => items,
        other => panic!("expected collection data, got {:?}", other),
    };
    assert_eq!(items.len(), 2);

    let (class, assignments) = match &items[0] {
        CompiledValue::Instance { class, assignments } => (class, assignments),
        other => panic!("expected instance, got {:?}", other),
    };
    assert_eq!(*class, person_id);
    assert_eq!(assignments[0], ("lastName".to_string(), CompiledValue::String("Bloggs".to_string())));
    assert_eq!(
        assignments[1],
        (
            "gender".to_string(),
            CompiledValue::EnumValue { enumeration: gender_id, value: "MALE".to_string() }
        )
    );
    match &assignments[2].1 {
        CompiledValue::Instance { class, assignments } => {
            assert_eq!(graph.node(*class).path.to_string(), "my::Address");
            assert_eq!(assignments.len(), 1);
        }
        other => panic!("expected nested instance, got {:?}", other),
    }

    match &items[1] {
        CompiledValue::Instance { class, assignments } => {
            assert_eq!(*class, person_id);
            assert_eq!(assignments.len(), 2);
        }
        other => panic!("expected instance, got {:?}", other),
    }
}

// ==================== Namespace ====================

#[test]
fn duplicated_element_reports_second_occurrence() {
    let src = "Class model::element {}\n\
               \n\
               ###Data\n\
               Data model::element\n\
               Text #{\n\
               \x20 contentType: 'application/x.flatdata';\n\
               \x20 data: 'sample data';\n\
               }#\n";
    let err = compile_source(src).expect_err("must fail");
    assert!(err.message.contains("Duplicated element 'model::element'"), "{}", err);
    assert_eq!(err.range.start_line, 4);
    assert_eq!(err.range.end_line, 8);
}

#[test]
fn identical_redeclaration_is_still_rejected() {
    let src = "###Data\n\
               Data a::D\n\
               Text #{\n\
               \x20 contentType: 'x';\n\
               \x20 data: 'y';\n\
               }#\n\
               \n\
               Data a::D\n\
               Text #{\n\
               \x20 contentType: 'x';\n\
               \x20 data: 'y';\n\
               }#\n";
    let err = compile_source(src).expect_err("must fail");
    assert!(err.message.contains("Duplicated element 'a::D'"), "{}", err);
}

#[test]
fn forward_and_mutual_references_resolve() {
    let src = "###Pure\n\
               Class pkg::A\n\
               {\n\
               \x20 b: pkg::B[1];\n\
               }\n\
               \n\
               Class pkg::B\n\
               {\n\
               \x20 a: pkg::A[1];\n\
               }\n";
    let graph = compile_source(src).expect("compile");
    let a_id = graph
        .resolve(&modellang::PackageablePath::parse("pkg::A").expect("path"))
        .expect("id");
    let b_id = graph
        .resolve(&modellang::PackageablePath::parse("pkg::B").expect("path"))
        .expect("id");
    match &graph.node(a_id).kind {
        GraphNodeKind::Class { properties } => {
            assert_eq!(properties[0].ty, PropertyType::Reference(b_id));
        }
        other => panic!("expected class, got {:?}", other),
    }
    match &graph.node(b_id).kind {
        GraphNodeKind::Class { properties } => {
            assert_eq!(properties[0].ty, PropertyType::Reference(a_id));
        }
        other => panic!("expected class, got {:?}", other),
    }
}

#[test]
fn primitive_property_types_do_not_resolve_through_namespace() {
    let graph = compile_source("Class a::C\n{\n  name: String[1];\n  age: Integer[0..1];\n}\n")
        .expect("compile");
    let node = graph.get_by_str("a::C").expect("node");
    match &node.kind {
        GraphNodeKind::Class { properties } => {
            assert_eq!(properties[0].ty, PropertyType::Primitive(PrimitiveType::String));
            assert_eq!(properties[1].ty, PropertyType::Primitive(PrimitiveType::Integer));
        }
        other => panic!("expected class, got {:?}", other),
    }
}

// ==================== Structural validation ====================

#[test]
fn reference_payload_is_rejected_in_data_element() {
    let src = "###Data\nData a::D\nReference #{ meta::data::Other }#\n";
    let err = compile_source(src).expect_err("must fail");
    assert!(
        err.message.contains("Cannot use Data element reference in a Data element"),
        "{}",
        err
    );
}

#[test]
fn collection_item_referencing_data_element_is_rejected() {
    let src = "###Data\n\
               Data a::First\n\
               Text #{\n\
               \x20 contentType: 'x';\n\
               \x20 data: 'y';\n\
               }#\n\
               \n\
               Data a::Second\n\
               PureCollection #{\n\
               \x20 data: [a::First];\n\
               }#\n";
    let err = compile_source(src).expect_err("must fail");
    assert!(
        err.message.contains("Cannot use Data element reference in a Data element"),
        "{}",
        err
    );
}

// ==================== Unresolved references ====================

#[test]
fn unresolved_property_type_fails() {
    let err = compile_source("Class a::C\n{\n  x: my::Missing[1];\n}\n").expect_err("must fail");
    assert!(err.message.contains("Can't find type 'my::Missing'"), "{}", err);
    assert_eq!(err.range.start_line, 3);
}

#[test]
fn unknown_constructor_class_fails() {
    let src = "###Data\nData a::D\nPureCollection #{\n  data: [^my::Person(lastName = 'x')];\n}#\n";
    let err = compile_source(src).expect_err("must fail");
    assert!(err.message.contains("Can't find type 'my::Person'"), "{}", err);
}

#[test]
fn unknown_constructor_property_fails() {
    let src = "Class my::Person\n{\n  lastName: String[1];\n}\n\
               ###Data\n\
               Data a::D\n\
               PureCollection #{\n\
               \x20 data: [^my::Person(nope = 'x')];\n\
               }#\n";
    let err = compile_source(src).expect_err("must fail");
    assert!(
        err.message.contains("Can't find property 'nope' on type 'my::Person'"),
        "{}",
        err
    );
}

#[test]
fn unknown_enumeration_fails() {
    let src = "###Data\nData a::D\nPureCollection #{\n  data: [enums::Gender.MALE];\n}#\n";
    let err = compile_source(src).expect_err("must fail");
    assert!(err.message.contains("Can't find enumeration 'enums::Gender'"), "{}", err);
}

#[test]
fn unknown_enum_value_fails() {
    let src = "Enum enums::Gender\n{\n  MALE, FEMALE\n}\n\
               ###Data\n\
               Data a::D\n\
               PureCollection #{\n\
               \x20 data: [enums::Gender.NONE];\n\
               }#\n";
    let err = compile_source(src).expect_err("must fail");
    assert!(
        err.message.contains("Can't find enum value 'NONE' in enum 'enums::Gender'"),
        "{}",
        err
    );
}

#[test]
fn unresolved_bare_reference_fails() {
    let src = "###Data\nData a::D\nPureCollection #{\n  data: [some::Missing];\n}#\n";
    let err = compile_source(src).expect_err("must fail");
    assert!(err.message.contains("Can't find element 'some::Missing'"), "{}", err);
}

#[test]
fn bare_reference_to_class_is_rejected_in_embedded_data() {
    let src = "Class my::Person {}\n\
               ###Data\n\
               Data a::D\n\
               PureCollection #{\n\
               \x20 data: [my::Person];\n\
               }#\n";
    let err = compile_source(src).expect_err("must fail");
    assert!(
        err.message.contains("Cannot use reference to element 'my::Person' in embedded data"),
        "{}",
        err
    );
}

// ==================== All-or-nothing ====================

#[test]
fn one_bad_element_fails_the_whole_unit() {
    let src = "Class a::Good\n{\n  name: String[1];\n}\n\
               \n\
               Class a::Bad\n\
               {\n\
               \x20 x: my::Missing[1];\n\
               }\n";
    assert!(compile_source(src).is_err());
}

#[test]
fn error_display_carries_range() {
    let err = compile_source("Class a::C\n{\n  x: my::Missing[1];\n}\n").expect_err("must fail");
    let text = err.to_string();
    assert!(text.starts_with("COMPILATION error at [3:"), "{}", text);
    assert!(text.contains("Can't find type 'my::Missing'"), "{}", text);
}
