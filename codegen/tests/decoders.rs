//! Generated decoders, run through the reference runtime.

#![allow(clippy::unwrap_used, clippy::panic)]

use serde_json::json;
use typegen_check::processors::coding;
use typegen_check::{compile, Processor};
use typegen_codegen::runtime::{DecodeError, Decoded, Runtime};
use typegen_codegen::{generate, DecoderOptions, GenerationReport};
use typegen_ir::model::{
    Basic, Constructor, Declarable, Declaration, Field, IntRestriction, Restriction,
    StringRestriction, Type, UncheckedModel, Unresolved,
};
use typegen_ir::property::{Properties, Property};

fn decoded() -> Properties {
    [(
        coding::KIND,
        Property::some(Property::enumeration(coding::KINDS, "decoder")),
    )]
    .into_iter()
    .collect()
}

fn alias(name: &str, ty: Type<Unresolved>) -> Declaration<Unresolved> {
    Declaration::new(
        name,
        Declarable::Alias {
            ty,
            properties: decoded(),
        },
    )
}

fn enumeration(name: &str, labels: &[&str]) -> Declaration<Unresolved> {
    Declaration::new(
        name,
        Declarable::Enum {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties: decoded(),
        },
    )
}

fn build(decls: Vec<Declaration<Unresolved>>) -> GenerationReport {
    let model = UncheckedModel::new(decls).unwrap();
    let compiled = compile(&model, &Processor::ALL).unwrap();
    let options = DecoderOptions::from_api(&compiled.api()).unwrap();
    let report = generate(&compiled, &options);
    assert!(report.is_complete(), "generation failed: {:?}", report.errors);
    report
}

#[test]
fn record_with_optional_field() {
    let report = build(vec![alias(
        "User",
        Type::product(vec![
            Field::new("id", Type::basic(Basic::Int)),
            Field::new("tag", Type::optional(Type::basic(Basic::String))),
        ]),
    )]);
    let runtime = Runtime::new(&report.fragments);

    let minimal = runtime.decode("User", &json!({"id": 1})).unwrap();
    let Decoded::Record(fields) = minimal else {
        panic!("expected a record");
    };
    assert_eq!(fields["id"], Decoded::Int(1));
    assert_eq!(fields["tag"], Decoded::Optional(None));

    let full = runtime
        .decode("User", &json!({"id": 1, "tag": "x", "extra": true}))
        .unwrap();
    let Decoded::Record(fields) = full else {
        panic!("expected a record");
    };
    assert_eq!(
        fields["tag"],
        Decoded::Optional(Some(Box::new(Decoded::String("x".into()))))
    );
    assert!(!fields.contains_key("extra"), "unknown keys are ignored");

    assert!(matches!(
        runtime.decode("User", &json!({"tag": "x"})),
        Err(DecodeError::MissingField { key, .. }) if key == "id"
    ));
}

#[test]
fn enum_keyed_map_rejects_unknown_labels() {
    let report = build(vec![
        enumeration("Color", &["red", "green"]),
        alias(
            "Palette",
            Type::dict(Type::named("Color"), Type::basic(Basic::Int)),
        ),
    ]);
    let runtime = Runtime::new(&report.fragments);

    let ok = runtime.decode("Palette", &json!({"red": 1, "green": 2})).unwrap();
    assert!(matches!(ok, Decoded::Dict(entries) if entries.len() == 2));

    assert!(matches!(
        runtime.decode("Palette", &json!({"red": 1, "blue": 3})),
        Err(DecodeError::InvalidKey { key, .. }) if key == "blue"
    ));
}

#[test]
fn sums_dispatch_on_the_configured_tag() {
    let model = UncheckedModel::new(vec![Declaration::new(
        "Shape",
        Declarable::Sum {
            constructors: vec![
                Constructor::new("Point", vec![]),
                Constructor::new(
                    "Circle",
                    vec![Field::new("radius", Type::basic(Basic::Real))],
                ),
            ],
            properties: decoded(),
        },
    )])
    .unwrap();
    let seed = [(coding::TAG_FIELD, Property::String("type".into()))]
        .into_iter()
        .collect();
    let compiled = typegen_check::compile_with(&model, seed, &Processor::ALL).unwrap();
    let options = DecoderOptions::from_api(&compiled.api()).unwrap();
    let report = generate(&compiled, &options);
    let runtime = Runtime::new(&report.fragments);

    match runtime
        .decode("Shape", &json!({"type": "Circle", "radius": 2.5}))
        .unwrap()
    {
        Decoded::Constructor { name, fields } => {
            assert_eq!(name, "Circle");
            assert_eq!(fields["radius"], Decoded::Real(2.5));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        runtime.decode("Shape", &json!({"type": "Square"})),
        Err(DecodeError::UnknownTag { tag, .. }) if tag == "Square"
    ));
    assert!(matches!(
        runtime.decode("Shape", &json!({"tag": "Point"})),
        Err(DecodeError::MissingField { key, .. }) if key == "type"
    ));
}

#[test]
fn refinements_reject_values_outside_their_predicate() {
    let report = build(vec![Declaration::new(
        "Percent",
        Declarable::Restricted {
            restriction: Restriction::Int(IntRestriction {
                min: Some(0),
                max: Some(100),
                width: None,
            }),
            properties: decoded(),
        },
    )]);
    let runtime = Runtime::new(&report.fragments);
    assert_eq!(runtime.decode("Percent", &json!(42)).unwrap(), Decoded::Int(42));
    assert!(matches!(
        runtime.decode("Percent", &json!(101)),
        Err(DecodeError::Refinement { .. })
    ));
}

#[test]
fn recursive_declarations_decode_finite_input() {
    let report = build(vec![alias(
        "Tree",
        Type::product(vec![
            Field::new("label", Type::basic(Basic::String)),
            Field::new("children", Type::list(Type::named("Tree"))),
        ]),
    )]);
    let runtime = Runtime::new(&report.fragments);
    let tree = json!({
        "label": "root",
        "children": [{"label": "leaf", "children": []}]
    });
    let Decoded::Record(fields) = runtime.decode("Tree", &tree).unwrap() else {
        panic!("expected a record");
    };
    assert!(matches!(&fields["children"], Decoded::List(items) if items.len() == 1));
}

#[test]
fn string_refined_keys_and_scalar_sentinels() {
    let report = build(vec![
        Declaration::new(
            "Code",
            Declarable::Restricted {
                restriction: Restriction::String(StringRestriction {
                    min_length: None,
                    max_length: Some(3),
                    regex: Some("[A-Z]+".into()),
                }),
                properties: decoded(),
            },
        ),
        alias(
            "Flags",
            Type::product(vec![
                Field::new("byCode", Type::dict(Type::named("Code"), Type::basic(Basic::Bool))),
                Field::new("marker", Type::unit()),
            ]),
        ),
    ]);
    let runtime = Runtime::new(&report.fragments);

    let Decoded::Record(fields) = runtime
        .decode("Flags", &json!({"byCode": {"USD": true}, "marker": [1, 2]}))
        .unwrap()
    else {
        panic!("expected a record");
    };
    assert_eq!(
        fields["byCode"],
        Decoded::Dict(vec![(Decoded::String("USD".into()), Decoded::Bool(true))])
    );
    assert_eq!(fields["marker"], Decoded::Unit, "unit accepts any input");

    assert!(matches!(
        runtime.decode("Flags", &json!({"byCode": {"usd": true}, "marker": null})),
        Err(DecodeError::InvalidKey { key, .. }) if key == "usd"
    ));
    assert!(matches!(
        runtime.decode("Flags", &json!({"byCode": {"EUR": "yes"}, "marker": null})),
        Err(DecodeError::Expected { expected: "a bool", .. })
    ));
}

#[test]
fn optional_self_alias_fails_instead_of_looping() {
    let report = build(vec![alias("Loop", Type::optional(Type::named("Loop")))]);
    let runtime = Runtime::new(&report.fragments);
    assert_eq!(
        runtime.decode("Loop", &json!(null)).unwrap(),
        Decoded::Optional(None)
    );
    assert!(matches!(
        runtime.decode("Loop", &json!(1)),
        Err(DecodeError::NonProductiveCycle { name, .. }) if name == "Loop"
    ));
}
