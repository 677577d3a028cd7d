//! Schema validation of node metadata.
//!
//! Walks every node of a model and checks the slots a processor declared
//! for that node kind: each must be present (on the node or in the
//! defaults) and kind-correct. Slots owned by other processors are ignored.

use thiserror::Error;
use typegen_ir::model::{CheckedModel, Classification, Container, Declarable, Field, Position, Type, TypeKind};
use typegen_ir::property::{PropSpec, Properties};

use crate::defaults::{DefaultProperties, NodeDefaults, NodeKind};

/// A slot that does not satisfy its declared spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Neither the node nor the defaults set the slot.
    #[error("{path}: required property `{slot}` ({spec}) is not set")]
    Missing {
        /// Dotted path of the node.
        path: String,
        /// Slot name.
        slot: String,
        /// Declared spec.
        spec: PropSpec,
        /// Position of the node.
        position: Position,
    },
    /// The slot holds a value of another kind.
    #[error("{path}: property `{slot}` must be {spec}, found {found}")]
    WrongKind {
        /// Dotted path of the node.
        path: String,
        /// Slot name.
        slot: String,
        /// Declared spec.
        spec: PropSpec,
        /// Spec of the stored value.
        found: PropSpec,
        /// Position of the node.
        position: Position,
    },
}

impl SlotError {
    /// Position of the offending node.
    pub fn position(&self) -> &Position {
        match self {
            SlotError::Missing { position, .. } | SlotError::WrongKind { position, .. } => position,
        }
    }
}

/// Checks every node of `model` against `defaults`.
pub fn validate_slots(defaults: &DefaultProperties, model: &CheckedModel) -> Vec<SlotError> {
    let mut errors = Vec::new();
    let top = Position::default();
    check_node(&defaults.top, &model.properties, "model", &top, &mut errors);
    for decl in &model.declarations {
        let record = defaults.get(NodeKind::of_declaration(&decl.body));
        check_node(record, decl.body.properties(), &decl.name, &decl.position, &mut errors);
        match &decl.body {
            Declarable::Alias { ty, .. } => check_type(defaults, ty, &decl.name, &mut errors),
            Declarable::Sum { constructors, .. } => {
                for ctor in constructors {
                    let scope = format!("{}.{}", decl.name, ctor.name);
                    for field in &ctor.fields {
                        check_field(defaults, field, &scope, &mut errors);
                    }
                }
            }
            Declarable::Enum { .. } | Declarable::Restricted { .. } => {}
        }
    }
    errors
}

fn check_field(
    defaults: &DefaultProperties,
    field: &Field<Classification>,
    scope: &str,
    errors: &mut Vec<SlotError>,
) {
    let path = format!("{scope}.{}", field.name);
    check_node(&defaults.fields, &field.properties, &path, &field.position, errors);
    check_type(defaults, &field.ty, &path, errors);
}

fn check_type(
    defaults: &DefaultProperties,
    ty: &Type<Classification>,
    path: &str,
    errors: &mut Vec<SlotError>,
) {
    let record = defaults.get(NodeKind::of_type(&ty.kind));
    check_node(record, &ty.properties, path, &ty.position, errors);
    match &ty.kind {
        TypeKind::Unit | TypeKind::Basic(_) | TypeKind::Named { .. } | TypeKind::EmptyProduct => {}
        TypeKind::Product(fields) => {
            for field in fields {
                check_field(defaults, field, path, errors);
            }
        }
        TypeKind::Container(Container::Dict(k, v)) => {
            check_type(defaults, k, &format!("{path}<key>"), errors);
            check_type(defaults, v, &format!("{path}<value>"), errors);
        }
        TypeKind::Container(Container::List(t) | Container::Set(t) | Container::Optional(t)) => {
            check_type(defaults, t, &format!("{path}<element>"), errors);
        }
        TypeKind::Function { argument, result } => {
            check_type(defaults, argument, &format!("{path}<argument>"), errors);
            check_type(defaults, result, &format!("{path}<result>"), errors);
        }
    }
}

fn check_node(
    record: &NodeDefaults,
    own: &Properties,
    path: &str,
    position: &Position,
    errors: &mut Vec<SlotError>,
) {
    for (slot, spec) in &record.specs {
        match own.get(slot).or_else(|| record.values.get(slot)) {
            None => errors.push(SlotError::Missing {
                path: path.to_string(),
                slot: slot.clone(),
                spec: spec.clone(),
                position: position.clone(),
            }),
            Some(value) if !value.matches(spec) => errors.push(SlotError::WrongKind {
                path: path.to_string(),
                slot: slot.clone(),
                spec: spec.clone(),
                found: value.spec(),
                position: position.clone(),
            }),
            Some(_) => {}
        }
    }
}
