//! The decoder backend.
//!
//! Walks one checked declaration and builds the [`Decoder`] tree that reads
//! values of its type from JSON, recording every support module the tree
//! needs on the way.

use std::collections::BTreeSet;

use typegen_check::processors::coding;
use typegen_check::processors::docs;
use typegen_check::PropertiesApi;
use typegen_ir::model::{
    Classification, Constructor, Container, Declarable, Declaration, Field, Type, TypeKind,
};
use typegen_ir::property::{PropertyError, PropertyView};

use crate::emit::{
    codec_name, decoder_name, Case, Decoder, FieldDecoder, Fragment, FunctionDecl, KeyDecoder,
    Linkage, Presence, ReferenceStyle, Support,
};
use crate::{DecoderOptions, GenerateError};

/// Generates the decoder fragment of `declaration`.
///
/// # Errors
///
/// [`GenerateError::Undecodable`] when the declaration contains a function
/// type, [`GenerateError::Property`] when a checked slot cannot be read.
pub fn generate_decoder<'m>(
    declaration: &'m Declaration<Classification>,
    api: &PropertiesApi<'m>,
    options: &DecoderOptions,
) -> Result<Fragment, GenerateError> {
    let mut builder = DecoderBuilder {
        api,
        options,
        declaration: &declaration.name,
        // Every signature names `Decoder`.
        support: BTreeSet::from([Support::Decode]),
    };
    let body = builder.declarable(&declaration.body)?;
    let doc = read_doc(api.declaration(&declaration.body))?;
    let name = decoder_name(&declaration.name);

    Ok(Fragment {
        declaration: declaration.name.clone(),
        function: FunctionDecl {
            name: name.clone(),
            doc,
            signature: Some(format!("Decoder {}", declaration.name)),
            params: Vec::new(),
            body,
        },
        linkage: Linkage {
            module: options.module.clone(),
            imports: builder.support,
            exposes: vec![name],
        },
    })
}

/// Docs are read only when some processor declared the slot.
fn read_doc(view: PropertyView<'_>) -> Result<Option<String>, PropertyError> {
    match view.optional_string(docs::DOC) {
        Ok(doc) => Ok(doc.map(str::to_string)),
        Err(PropertyError::Missing { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

struct DecoderBuilder<'a, 'm> {
    api: &'a PropertiesApi<'m>,
    options: &'a DecoderOptions,
    declaration: &'a str,
    support: BTreeSet<Support>,
}

impl<'a, 'm> DecoderBuilder<'a, 'm> {
    fn declarable(&mut self, body: &'m Declarable<Classification>) -> Result<Decoder, GenerateError> {
        match body {
            Declarable::Alias { ty, .. } => self.type_decoder(ty, self.declaration),
            Declarable::Sum { constructors, .. } => self.tagged(constructors),
            Declarable::Enum { labels, .. } => {
                self.support.insert(Support::Enumeration);
                Ok(Decoder::Enumeration {
                    name: self.declaration.to_string(),
                    labels: labels.clone(),
                })
            }
            Declarable::Restricted { restriction, .. } => {
                self.support.insert(Support::Refinement);
                Ok(Decoder::Refined {
                    name: self.declaration.to_string(),
                    restriction: restriction.clone(),
                })
            }
        }
    }

    fn tagged(&mut self, constructors: &'m [Constructor<Classification>]) -> Result<Decoder, GenerateError> {
        self.support.insert(Support::Tagged);
        let cases = constructors
            .iter()
            .map(|ctor| {
                let scope = format!("{}.{}", self.declaration, ctor.name);
                let fields = ctor
                    .fields
                    .iter()
                    .map(|field| self.field(field, &scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Case {
                    tag: ctor.name.clone(),
                    constructor: ctor.name.clone(),
                    fields,
                })
            })
            .collect::<Result<Vec<_>, GenerateError>>()?;
        Ok(Decoder::Tagged {
            discriminant: self.options.tag_field.clone(),
            cases,
        })
    }

    fn field(&mut self, field: &'m Field<Classification>, scope: &str) -> Result<FieldDecoder, GenerateError> {
        let path = format!("{scope}.{}", field.name);
        let key = self
            .api
            .field(field)
            .optional_string(coding::FIELD_NAME)?
            .unwrap_or(field.name.as_str())
            .to_string();
        let (presence, decoder) = match &field.ty.kind {
            TypeKind::Container(Container::Optional(inner)) => {
                self.support.insert(Support::OptionalField);
                (Presence::Optional, self.type_decoder(inner, &path)?)
            }
            _ => (Presence::Required, self.type_decoder(&field.ty, &path)?),
        };
        Ok(FieldDecoder {
            name: field.name.clone(),
            key,
            presence,
            decoder,
        })
    }

    fn type_decoder(&mut self, ty: &'m Type<Classification>, path: &str) -> Result<Decoder, GenerateError> {
        self.support.insert(Support::Decode);
        match &ty.kind {
            TypeKind::Unit => Ok(Decoder::Unit),
            TypeKind::Basic(basic) => Ok(Decoder::primitive(*basic)),
            TypeKind::Named { name, .. } => Ok(self.call(name)),
            TypeKind::Product(fields) => {
                let fields = fields
                    .iter()
                    .map(|field| self.field(field, path))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Decoder::Object { fields })
            }
            TypeKind::EmptyProduct => Ok(Decoder::Object { fields: Vec::new() }),
            TypeKind::Container(Container::List(element)) => Ok(Decoder::List {
                element: Box::new(self.type_decoder(element, &format!("{path}<element>"))?),
            }),
            TypeKind::Container(Container::Set(element)) => {
                self.support.insert(Support::Set);
                Ok(Decoder::Set {
                    element: Box::new(self.type_decoder(element, &format!("{path}<element>"))?),
                })
            }
            TypeKind::Container(Container::Optional(element)) => Ok(Decoder::Nullable {
                element: Box::new(self.type_decoder(element, &format!("{path}<element>"))?),
            }),
            TypeKind::Container(Container::Dict(key, value)) => {
                let key = self.key_decoder(key);
                self.support.insert(match key {
                    KeyDecoder::Text => Support::Dict,
                    KeyDecoder::Enumeration { .. } | KeyDecoder::Refined { .. } => Support::KeyedDict,
                });
                Ok(Decoder::Dict {
                    key,
                    value: Box::new(self.type_decoder(value, &format!("{path}<value>"))?),
                })
            }
            TypeKind::Function { .. } => Err(GenerateError::Undecodable {
                declaration: self.declaration.to_string(),
                path: path.to_string(),
                position: ty.position.clone(),
            }),
        }
    }

    /// Only enumeration and refinement keys get a key-aware decoder; every
    /// other key type reads as a plain string.
    fn key_decoder(&mut self, key: &Type<Classification>) -> KeyDecoder {
        match &key.kind {
            TypeKind::Named {
                name,
                reference: Classification::Enum,
            } => {
                self.note_reference();
                KeyDecoder::Enumeration {
                    target: name.clone(),
                }
            }
            TypeKind::Named {
                name,
                reference: Classification::Restricted(basic),
            } => {
                self.note_reference();
                KeyDecoder::Refined {
                    target: name.clone(),
                    basic: *basic,
                }
            }
            _ => KeyDecoder::Text,
        }
    }

    fn call(&mut self, target: &str) -> Decoder {
        Decoder::Call {
            target: target.to_string(),
            style: self.note_reference(),
        }
    }

    fn note_reference(&mut self) -> ReferenceStyle {
        if self.options.references == ReferenceStyle::CodecAccessor {
            self.support.insert(Support::Codec);
        }
        self.options.references
    }
}

/// Expression a reference to `target` compiles to under `style`.
#[must_use]
pub fn reference_expression(target: &str, style: ReferenceStyle) -> String {
    match style {
        ReferenceStyle::Standalone => decoder_name(target),
        ReferenceStyle::CodecAccessor => format!("Codec.decoder {}", codec_name(target)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use typegen_check::{compile, Processor};
    use typegen_ir::model::{Basic, Declaration, IntRestriction, Restriction, UncheckedModel, Unresolved};
    use typegen_ir::property::{Properties, Property};

    fn options(references: ReferenceStyle) -> DecoderOptions {
        DecoderOptions {
            references,
            tag_field: "tag".into(),
            module: vec!["Generated".into()],
        }
    }

    fn fragment(decls: Vec<Declaration<Unresolved>>, name: &str, references: ReferenceStyle) -> Result<Fragment, GenerateError> {
        let model = UncheckedModel::new(decls).unwrap();
        let compiled = compile(&model, &Processor::ALL).unwrap();
        let decl = compiled.model.declarations.get(name).unwrap();
        generate_decoder(decl, &compiled.api(), &options(references))
    }

    fn alias(name: &str, ty: Type<Unresolved>) -> Declaration<Unresolved> {
        Declaration::new(
            name,
            Declarable::Alias {
                ty,
                properties: Properties::new(),
            },
        )
    }

    #[test]
    fn optional_field_uses_absent_field_combinator() {
        let user = alias(
            "User",
            Type::product(vec![
                Field::new("id", Type::basic(Basic::Int)),
                Field::new("tag", Type::optional(Type::basic(Basic::String))),
            ]),
        );
        let fragment = fragment(vec![user], "User", ReferenceStyle::Standalone).unwrap();
        let Decoder::Object { fields } = &fragment.function.body else {
            panic!("expected an object decoder");
        };
        assert_eq!(fields[0].presence, Presence::Required);
        assert_eq!(fields[1].presence, Presence::Optional);
        assert_eq!(fields[1].decoder, Decoder::primitive(Basic::String));
        assert!(fragment.linkage.imports.contains(&Support::OptionalField));
        assert_eq!(fragment.linkage.exposes, ["userDecoder"]);
    }

    #[test]
    fn renamed_field_reads_its_wire_key() {
        let field = Field::new("userId", Type::basic(Basic::Int)).with_properties(
            [(coding::FIELD_NAME, Property::some(Property::String("user_id".into())))]
                .into_iter()
                .collect(),
        );
        let fragment = fragment(vec![alias("User", Type::product(vec![field]))], "User", ReferenceStyle::Standalone).unwrap();
        let Decoder::Object { fields } = &fragment.function.body else {
            panic!("expected an object decoder");
        };
        assert_eq!(fields[0].name, "userId");
        assert_eq!(fields[0].key, "user_id");
    }

    #[test]
    fn dict_keys_follow_classification() {
        let decls = vec![
            Declaration::new(
                "Color",
                Declarable::Enum {
                    labels: vec!["red".into(), "green".into()],
                    properties: Properties::new(),
                },
            ),
            Declaration::new(
                "Port",
                Declarable::Restricted {
                    restriction: Restriction::Int(IntRestriction::default()),
                    properties: Properties::new(),
                },
            ),
            alias(
                "Tables",
                Type::product(vec![
                    Field::new("byColor", Type::dict(Type::named("Color"), Type::basic(Basic::Int))),
                    Field::new("byPort", Type::dict(Type::named("Port"), Type::basic(Basic::Int))),
                    Field::new("byName", Type::dict(Type::basic(Basic::String), Type::basic(Basic::Int))),
                ]),
            ),
        ];
        let fragment = fragment(decls, "Tables", ReferenceStyle::Standalone).unwrap();
        let Decoder::Object { fields } = &fragment.function.body else {
            panic!("expected an object decoder");
        };
        let keys: Vec<&KeyDecoder> = fields
            .iter()
            .map(|f| match &f.decoder {
                Decoder::Dict { key, .. } => key,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(keys[0], &KeyDecoder::Enumeration { target: "Color".into() });
        assert_eq!(keys[1], &KeyDecoder::Refined { target: "Port".into(), basic: Basic::Int });
        assert_eq!(keys[2], &KeyDecoder::Text);
        assert!(fragment.linkage.imports.contains(&Support::KeyedDict));
        assert!(fragment.linkage.imports.contains(&Support::Dict));
    }

    #[test]
    fn codec_style_references_go_through_accessors() {
        let decls = vec![
            alias("Name", Type::basic(Basic::String)),
            alias("Names", Type::list(Type::named("Name"))),
        ];
        let fragment = fragment(decls, "Names", ReferenceStyle::CodecAccessor).unwrap();
        assert_eq!(
            fragment.function.body,
            Decoder::List {
                element: Box::new(Decoder::Call {
                    target: "Name".into(),
                    style: ReferenceStyle::CodecAccessor,
                }),
            }
        );
        assert!(fragment.linkage.imports.contains(&Support::Codec));
        assert_eq!(reference_expression("Name", ReferenceStyle::CodecAccessor), "Codec.decoder nameCodec");
    }

    #[test]
    fn function_types_are_undecodable() {
        let decls = vec![alias(
            "Handler",
            Type::product(vec![Field::new(
                "run",
                Type::function(Type::basic(Basic::Int), Type::unit()),
            )]),
        )];
        match fragment(decls, "Handler", ReferenceStyle::Standalone).unwrap_err() {
            GenerateError::Undecodable { path, .. } => assert_eq!(path, "Handler.run"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sum_dispatches_on_the_tag_field() {
        let decls = vec![Declaration::new(
            "Shape",
            Declarable::Sum {
                constructors: vec![
                    Constructor::new("Empty", vec![]),
                    Constructor::new(
                        "Circle",
                        vec![Field::new("radius", Type::basic(Basic::Real))],
                    ),
                ],
                properties: Properties::new(),
            },
        )];
        let fragment = fragment(decls, "Shape", ReferenceStyle::Standalone).unwrap();
        let Decoder::Tagged { discriminant, cases } = &fragment.function.body else {
            panic!("expected a tagged decoder");
        };
        assert_eq!(discriminant, "tag");
        assert_eq!(cases[0].combinator(), "succeed");
        assert_eq!(cases[1].combinator(), "map");
    }

    #[test]
    fn every_fragment_imports_the_decode_module() {
        let decls = vec![
            Declaration::new(
                "Color",
                Declarable::Enum {
                    labels: vec!["red".into()],
                    properties: Properties::new(),
                },
            ),
            Declaration::new(
                "Signal",
                Declarable::Sum {
                    constructors: vec![Constructor::new("On", vec![]), Constructor::new("Off", vec![])],
                    properties: Properties::new(),
                },
            ),
            Declaration::new(
                "Port",
                Declarable::Restricted {
                    restriction: Restriction::Int(IntRestriction::default()),
                    properties: Properties::new(),
                },
            ),
        ];
        for (name, extra) in [
            ("Color", Support::Enumeration),
            ("Signal", Support::Tagged),
            ("Port", Support::Refinement),
        ] {
            let fragment = fragment(decls.clone(), name, ReferenceStyle::Standalone).unwrap();
            assert_eq!(
                fragment.linkage.imports,
                BTreeSet::from([Support::Decode, extra]),
                "imports of {name}"
            );
        }
    }

    #[test]
    fn docs_are_optional_when_no_processor_declares_them() {
        let model = UncheckedModel::new(vec![alias("Id", Type::basic(Basic::Int))]).unwrap();
        let compiled = compile(&model, &[Processor::from_name("coding").unwrap()]).unwrap();
        let decl = compiled.model.declarations.get("Id").unwrap();
        let fragment = generate_decoder(decl, &compiled.api(), &options(ReferenceStyle::Standalone)).unwrap();
        assert_eq!(fragment.function.doc, None);
        assert_eq!(compiled.defaults.alias.values.get(docs::DOC), None);
    }
}
