//! typegen intermediate representation.
//!
//! The `typegen-ir` crate holds the model grammar shared by every stage of
//! the compiler: the type algebra ([`model`]), typed node metadata
//! ([`property`]) and the reference resolver ([`resolve`]) that turns an
//! unchecked model into a classified one.
//!
//! # Entry Point
//!
//! ```
//! use typegen_ir::model::{Basic, Declarable, Declaration, Type, UncheckedModel};
//! use typegen_ir::property::Properties;
//!
//! let model = UncheckedModel::new(vec![
//!     Declaration::new("UserId", Declarable::Alias {
//!         ty: Type::basic(Basic::Int),
//!         properties: Properties::new(),
//!     }),
//!     Declaration::new("Users", Declarable::Alias {
//!         ty: Type::list(Type::named("UserId")),
//!         properties: Properties::new(),
//!     }),
//! ])
//! .expect("well-formed model");
//! let classified = typegen_ir::resolve::resolve(&model).expect("every name resolves");
//! assert_eq!(classified.declarations.len(), 2);
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod model;
pub mod property;
pub mod resolve;

pub use model::{
    Basic, CheckedModel, Classification, ClassifiedModel, Constructor, Container, Declarable,
    Declaration, DeclarationKind, Declarations, Field, ModelError, Position, Restriction, Type,
    TypeKind, UncheckedModel, Unresolved,
};
pub use property::{define_properties, PropSpec, PropSpecs, Properties, Property, PropertyError, PropertyView};
pub use resolve::{resolve, ResolveError};
