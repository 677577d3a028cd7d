//! Reference resolution: unchecked model → classified model.
//!
//! Every `Named` reference is looked up in a name-keyed table and tagged
//! with a [`Classification`] of its target. Lookups never follow the
//! target's own references, so recursive models resolve like any other.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::model::{
    Basic, Classification, ClassifiedModel, Declarable, Declaration, Declarations, Position, Restriction,
    UncheckedModel,
};

/// A failure to resolve a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No declaration has the referenced name.
    #[error("unresolved reference `{name}`")]
    UnresolvedReference {
        /// The name that failed to resolve.
        name: String,
        /// Position of the reference.
        position: Position,
    },
}

impl ResolveError {
    /// Renders the error with a caller-supplied position renderer.
    pub fn render(&self, render_position: impl Fn(&Position) -> String) -> String {
        match self {
            ResolveError::UnresolvedReference { position, .. } => {
                format!("{}: {self}", render_position(position))
            }
        }
    }
}

/// Classifies what kind of declaration a reference to `declarable` hits.
pub fn classify<R>(declarable: &Declarable<R>) -> Classification {
    match declarable {
        Declarable::Enum { .. } => Classification::Enum,
        Declarable::Restricted {
            restriction: Restriction::Int(_),
            ..
        } => Classification::Restricted(Basic::Int),
        Declarable::Restricted {
            restriction: Restriction::String(_),
            ..
        } => Classification::Restricted(Basic::String),
        Declarable::Alias { .. } | Declarable::Sum { .. } => Classification::None,
    }
}

/// Resolves and classifies every reference in `model`.
///
/// The model itself is left untouched; the classified copy keeps names,
/// declaration order, properties and positions.
///
/// # Errors
///
/// Returns one [`ResolveError::UnresolvedReference`] per dangling reference,
/// in model order.
pub fn resolve(model: &UncheckedModel) -> Result<ClassifiedModel, Vec<ResolveError>> {
    let table: BTreeMap<&str, Classification> = model
        .declarations()
        .iter()
        .map(|d| (d.name.as_str(), classify(&d.body)))
        .collect();

    let mut errors = Vec::new();
    let declarations: Vec<Declaration<Classification>> = model
        .declarations()
        .iter()
        .map(|decl| Declaration {
            name: decl.name.clone(),
            body: decl.body.map_references(&mut |name, _, position| {
                match table.get(name) {
                    Some(class) => *class,
                    None => {
                        errors.push(ResolveError::UnresolvedReference {
                            name: name.to_string(),
                            position: position.clone(),
                        });
                        Classification::None
                    }
                }
            }),
            position: decl.position.clone(),
        })
        .collect();

    if !errors.is_empty() {
        debug!(unresolved = errors.len(), "reference resolution failed");
        return Err(errors);
    }
    debug!(declarations = declarations.len(), "references resolved");
    Ok(ClassifiedModel {
        declarations: Declarations::from_ordered(declarations),
    })
}
