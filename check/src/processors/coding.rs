//! The `coding` processor.
//!
//! Owns the slots the serialization backends read:
//!
//! | Node | Slot | Spec | Default |
//! |------|------|------|---------|
//! | model | `coding.module` | qname | `Generated` |
//! | model | `coding.references` | enum{codec\|decoder} | `decoder` |
//! | model | `coding.tagField` | string | `tag` |
//! | declarations | `coding.kind` | optional<enum{codec\|decoder\|encoder}> | absent |
//! | fields | `coding.fieldName` | optional<string> | absent |
//!
//! Besides schema conformance it checks that every field decodes from its
//! own wire key and that refinements describe a non-empty value set.

use std::collections::BTreeSet;

use thiserror::Error;
use typegen_ir::model::{
    CheckedModel, Classification, Declarable, Field, Position, Restriction, TypeKind,
};
use typegen_ir::property::{define_properties, PropSpec, Property, PropertyView};

use crate::defaults::{DefaultProperties, NodeKind};
use crate::slots::{validate_slots, SlotError};

/// Module the generated code lives in.
pub const MODULE: &str = "coding.module";
/// How sibling declarations are referenced.
pub const REFERENCES: &str = "coding.references";
/// Labels of [`REFERENCES`].
pub const REFERENCE_STYLES: [&str; 2] = ["decoder", "codec"];
/// Discriminant key of tagged sums.
pub const TAG_FIELD: &str = "coding.tagField";
/// Which backend generates a declaration.
pub const KIND: &str = "coding.kind";
/// Labels of [`KIND`].
pub const KINDS: [&str; 3] = ["decoder", "encoder", "codec"];
/// Wire key override for a field.
pub const FIELD_NAME: &str = "coding.fieldName";

/// Errors reported by the `coding` processor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodingError {
    /// A slot does not satisfy its spec.
    #[error(transparent)]
    Slot(#[from] SlotError),
    /// Two fields in one scope decode from the same key.
    #[error("`{scope}` reads two fields from the key `{key}`")]
    DuplicateWireKey {
        /// Declaration or constructor path.
        scope: String,
        /// Repeated key.
        key: String,
        /// Position of the second field.
        position: Position,
    },
    /// A constructor field uses the sum's discriminant key.
    #[error("`{scope}` has a field keyed `{key}`, which is the tag field")]
    TagFieldClash {
        /// Constructor path.
        scope: String,
        /// The clashing key.
        key: String,
        /// Position of the field.
        position: Position,
    },
    /// `RInt` with `min > max`.
    #[error("`{declaration}` admits no integer: min {min} exceeds max {max}")]
    EmptyRange {
        /// The refinement.
        declaration: String,
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
        /// Position of the declaration.
        position: Position,
    },
    /// `RInt` with a width outside `1..=64`.
    #[error("`{declaration}` has unsupported width {width}")]
    InvalidWidth {
        /// The refinement.
        declaration: String,
        /// Declared width.
        width: u32,
        /// Position of the declaration.
        position: Position,
    },
    /// `RString` with `minLength > maxLength`.
    #[error("`{declaration}` admits no string: minLength {min} exceeds maxLength {max}")]
    EmptyLength {
        /// The refinement.
        declaration: String,
        /// Minimum length.
        min: usize,
        /// Maximum length.
        max: usize,
        /// Position of the declaration.
        position: Position,
    },
    /// `RString` whose pattern does not compile.
    #[error("`{declaration}` has an invalid pattern: {message}")]
    InvalidPattern {
        /// The refinement.
        declaration: String,
        /// Compiler message.
        message: String,
        /// Position of the declaration.
        position: Position,
    },
}

impl CodingError {
    /// Position of the offending node.
    pub fn position(&self) -> &Position {
        match self {
            CodingError::Slot(err) => err.position(),
            CodingError::DuplicateWireKey { position, .. }
            | CodingError::TagFieldClash { position, .. }
            | CodingError::EmptyRange { position, .. }
            | CodingError::InvalidWidth { position, .. }
            | CodingError::EmptyLength { position, .. }
            | CodingError::InvalidPattern { position, .. } => position,
        }
    }
}

/// The `coding` processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodingProcessor;

impl CodingProcessor {
    /// Default-properties record.
    pub fn defaults(&self) -> DefaultProperties {
        DefaultProperties::default()
            .with(
                &[NodeKind::Top],
                define_properties(
                    &[],
                    &[
                        (MODULE, Property::qname("Generated")),
                        (REFERENCES, Property::enumeration(REFERENCE_STYLES, "decoder")),
                        (TAG_FIELD, Property::String("tag".to_string())),
                    ],
                ),
            )
            .with(
                &[
                    NodeKind::Alias,
                    NodeKind::Sum,
                    NodeKind::Enum,
                    NodeKind::Restricted,
                ],
                define_properties(
                    &[],
                    &[(KIND, Property::none(PropSpec::enumeration(KINDS)))],
                ),
            )
            .with(
                &[NodeKind::Field],
                define_properties(&[], &[(FIELD_NAME, Property::none(PropSpec::String))]),
            )
    }

    /// Checks the model. Slot errors are reported alone, since the semantic
    /// checks read those slots.
    ///
    /// # Errors
    ///
    /// Every [`CodingError`] found.
    pub fn check(&self, model: CheckedModel) -> Result<CheckedModel, Vec<CodingError>> {
        let defaults = self.defaults();
        let slot_errors = validate_slots(&defaults, &model);
        if !slot_errors.is_empty() {
            return Err(slot_errors.into_iter().map(CodingError::from).collect());
        }

        let mut errors = Vec::new();
        let top = PropertyView::new(&model.properties, &defaults.top.values);
        let tag_field = match top.string(TAG_FIELD) {
            Ok(tag) => tag.to_string(),
            Err(_) => "tag".to_string(),
        };

        for decl in &model.declarations {
            match &decl.body {
                Declarable::Alias { ty, .. } => {
                    ty.walk(&mut |node| {
                        if let TypeKind::Product(fields) = &node.kind {
                            check_wire_keys(&decl.name, fields, &defaults, None, &mut errors);
                        }
                    });
                }
                Declarable::Sum { constructors, .. } => {
                    for ctor in constructors {
                        let scope = format!("{}.{}", decl.name, ctor.name);
                        check_wire_keys(
                            &scope,
                            &ctor.fields,
                            &defaults,
                            Some(tag_field.as_str()),
                            &mut errors,
                        );
                        for field in &ctor.fields {
                            field.ty.walk(&mut |node| {
                                if let TypeKind::Product(fields) = &node.kind {
                                    check_wire_keys(&scope, fields, &defaults, None, &mut errors);
                                }
                            });
                        }
                    }
                }
                Declarable::Enum { .. } => {}
                Declarable::Restricted { restriction, .. } => {
                    check_restriction(&decl.name, restriction, &decl.position, &mut errors);
                }
            }
        }

        if errors.is_empty() {
            Ok(model)
        } else {
            Err(errors)
        }
    }
}

/// The key a field is read from: its `coding.fieldName`, else its name.
pub fn wire_key<'a>(field: &'a Field<Classification>, defaults: &'a DefaultProperties) -> &'a str {
    PropertyView::new(&field.properties, &defaults.fields.values)
        .optional_string(FIELD_NAME)
        .ok()
        .flatten()
        .unwrap_or(field.name.as_str())
}

fn check_wire_keys(
    scope: &str,
    fields: &[Field<Classification>],
    defaults: &DefaultProperties,
    tag_field: Option<&str>,
    errors: &mut Vec<CodingError>,
) {
    let mut seen = BTreeSet::new();
    for field in fields {
        let key = wire_key(field, defaults);
        if !seen.insert(key) {
            errors.push(CodingError::DuplicateWireKey {
                scope: scope.to_string(),
                key: key.to_string(),
                position: field.position.clone(),
            });
        }
        if tag_field == Some(key) {
            errors.push(CodingError::TagFieldClash {
                scope: scope.to_string(),
                key: key.to_string(),
                position: field.position.clone(),
            });
        }
    }
}

fn check_restriction(
    declaration: &str,
    restriction: &Restriction,
    position: &Position,
    errors: &mut Vec<CodingError>,
) {
    match restriction {
        Restriction::Int(r) => {
            if let (Some(min), Some(max)) = (r.min, r.max) {
                if min > max {
                    errors.push(CodingError::EmptyRange {
                        declaration: declaration.to_string(),
                        min,
                        max,
                        position: position.clone(),
                    });
                }
            }
            if let Some(width) = r.width {
                if width == 0 || width > 64 {
                    errors.push(CodingError::InvalidWidth {
                        declaration: declaration.to_string(),
                        width,
                        position: position.clone(),
                    });
                }
            }
        }
        Restriction::String(r) => {
            if let (Some(min), Some(max)) = (r.min_length, r.max_length) {
                if min > max {
                    errors.push(CodingError::EmptyLength {
                        declaration: declaration.to_string(),
                        min,
                        max,
                        position: position.clone(),
                    });
                }
            }
            if let Some(pattern) = &r.regex {
                if let Err(err) = regex::Regex::new(pattern) {
                    errors.push(CodingError::InvalidPattern {
                        declaration: declaration.to_string(),
                        message: err.to_string(),
                        position: position.clone(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use typegen_ir::model::{
        Basic, Constructor, Declaration, IntRestriction, StringRestriction, Type, UncheckedModel,
        Unresolved,
    };
    use typegen_ir::property::Properties;

    fn checked(decls: Vec<Declaration<Unresolved>>) -> CheckedModel {
        let model = UncheckedModel::new(decls).unwrap();
        CheckedModel::initial(typegen_ir::resolve(&model).unwrap())
    }

    fn renamed(name: &str, key: &str) -> Field<Unresolved> {
        Field::new(name, Type::basic(Basic::String)).with_properties(
            [(FIELD_NAME, Property::some(Property::String(key.into())))]
                .into_iter()
                .collect(),
        )
    }

    #[test]
    fn defaults_pass_on_a_plain_model() {
        let model = checked(vec![Declaration::new(
            "Id",
            Declarable::Alias {
                ty: Type::basic(Basic::Int),
                properties: Properties::new(),
            },
        )]);
        assert!(CodingProcessor.check(model).is_ok());
    }

    #[test]
    fn renamed_fields_may_not_collide() {
        let model = checked(vec![Declaration::new(
            "User",
            Declarable::Alias {
                ty: Type::product(vec![renamed("first", "name"), renamed("last", "name")]),
                properties: Properties::new(),
            },
        )]);
        let errors = CodingProcessor.check(model).unwrap_err();
        assert!(matches!(
            &errors[..],
            [CodingError::DuplicateWireKey { key, .. }] if key == "name"
        ));
    }

    #[test]
    fn constructor_fields_may_not_use_the_tag_key() {
        let model = checked(vec![Declaration::new(
            "Event",
            Declarable::Sum {
                constructors: vec![Constructor::new("Named", vec![renamed("label", "tag")])],
                properties: Properties::new(),
            },
        )]);
        let errors = CodingProcessor.check(model).unwrap_err();
        assert!(matches!(&errors[0], CodingError::TagFieldClash { scope, .. } if scope == "Event.Named"));
    }

    #[test]
    fn refinements_must_admit_values() {
        let model = checked(vec![
            Declaration::new(
                "Port",
                Declarable::Restricted {
                    restriction: Restriction::Int(IntRestriction {
                        min: Some(10),
                        max: Some(1),
                        width: Some(128),
                    }),
                    properties: Properties::new(),
                },
            ),
            Declaration::new(
                "Slug",
                Declarable::Restricted {
                    restriction: Restriction::String(StringRestriction {
                        min_length: None,
                        max_length: None,
                        regex: Some("[a-z".into()),
                    }),
                    properties: Properties::new(),
                },
            ),
        ]);
        let errors = CodingProcessor.check(model).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[2], CodingError::InvalidPattern { .. }));
    }

    #[test]
    fn wrong_kind_slot_is_reported_before_semantics() {
        let mut model = checked(vec![]);
        model
            .properties
            .insert(REFERENCES, Property::String("decoder".into()));
        let errors = CodingProcessor.check(model).unwrap_err();
        assert!(matches!(&errors[..], [CodingError::Slot(SlotError::WrongKind { .. })]));
    }
}
