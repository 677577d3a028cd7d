//! The `docs` processor.
//!
//! Declarations and fields may carry a `doc` string. When the model sets
//! `docs.required`, every declaration must have one. Docs that pass are
//! normalized in place so backends can emit them verbatim.

use thiserror::Error;
use typegen_ir::model::{CheckedModel, Position};
use typegen_ir::property::{define_properties, PropSpec, Properties, Property, PropertyView};

use crate::defaults::{DefaultProperties, NodeKind};
use crate::slots::{validate_slots, SlotError};

/// Documentation text.
pub const DOC: &str = "doc";
/// Whether every declaration must be documented.
pub const REQUIRED: &str = "docs.required";

/// Errors reported by the `docs` processor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocsError {
    /// A slot does not satisfy its spec.
    #[error(transparent)]
    Slot(#[from] SlotError),
    /// `docs.required` is set and a declaration has no doc.
    #[error("`{declaration}` is not documented")]
    MissingDoc {
        /// The undocumented declaration.
        declaration: String,
        /// Its position.
        position: Position,
    },
}

impl DocsError {
    /// Position of the offending node.
    pub fn position(&self) -> &Position {
        match self {
            DocsError::Slot(err) => err.position(),
            DocsError::MissingDoc { position, .. } => position,
        }
    }
}

/// The `docs` processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocsProcessor;

impl DocsProcessor {
    /// Default-properties record.
    pub fn defaults(&self) -> DefaultProperties {
        DefaultProperties::default()
            .with(
                &[NodeKind::Top],
                define_properties(&[], &[(REQUIRED, Property::Bool(false))]),
            )
            .with(
                &[
                    NodeKind::Alias,
                    NodeKind::Sum,
                    NodeKind::Enum,
                    NodeKind::Restricted,
                    NodeKind::Field,
                ],
                define_properties(&[], &[(DOC, Property::none(PropSpec::String))]),
            )
    }

    /// Checks the model and normalizes every doc string.
    ///
    /// # Errors
    ///
    /// Every [`DocsError`] found.
    pub fn check(&self, mut model: CheckedModel) -> Result<CheckedModel, Vec<DocsError>> {
        let defaults = self.defaults();
        let slot_errors = validate_slots(&defaults, &model);
        if !slot_errors.is_empty() {
            return Err(slot_errors.into_iter().map(DocsError::from).collect());
        }

        let required = PropertyView::new(&model.properties, &defaults.top.values)
            .boolean(REQUIRED)
            .unwrap_or(false);

        let mut errors = Vec::new();
        for decl in model.declarations.iter_mut() {
            let record = defaults.get(NodeKind::of_declaration(&decl.body));
            let has_doc = PropertyView::new(decl.body.properties(), &record.values)
                .optional_string(DOC)
                .ok()
                .flatten()
                .is_some_and(|doc| !doc.trim().is_empty());
            if required && !has_doc {
                errors.push(DocsError::MissingDoc {
                    declaration: decl.name.clone(),
                    position: decl.position.clone(),
                });
                continue;
            }
            normalize_slot(decl.body.properties_mut());
            decl.body
                .for_each_field_mut(&mut |field| normalize_slot(&mut field.properties));
        }

        if errors.is_empty() {
            Ok(model)
        } else {
            Err(errors)
        }
    }
}

/// Trims every line, drops blank leading and trailing lines, and joins
/// with `\n`.
pub fn normalize_doc(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    lines[start..end].join("\n")
}

fn normalize_slot(properties: &mut Properties) {
    let normalized = match properties.get(DOC) {
        Some(Property::Optional {
            value: Some(inner), ..
        }) => match inner.as_ref() {
            Property::String(text) => normalize_doc(text),
            _ => return,
        },
        _ => return,
    };
    properties.insert(DOC, Property::some(Property::String(normalized)));
}
