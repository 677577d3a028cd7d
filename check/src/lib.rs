//! typegen processor framework.
//!
//! Takes a model from `typegen-ir`, resolves it, and threads it through an
//! ordered list of processors. Each processor owns a set of metadata slots,
//! described per node kind by a [`DefaultProperties`] record, and checks
//! that the model uses them correctly. The run halts at the first processor
//! that fails.
//!
//! # Processors
//!
//! | Processor | Slots |
//! |-----------|-------|
//! | `coding` | `coding.module`, `coding.references`, `coding.tagField`, `coding.kind`, `coding.fieldName` |
//! | `docs` | `doc`, `docs.required` |
//!
//! # Entry Point
//!
//! ```
//! use typegen_check::{compile, Processor};
//! use typegen_ir::model::{Basic, Declarable, Declaration, Type, UncheckedModel};
//! use typegen_ir::property::Properties;
//!
//! let model = UncheckedModel::new(vec![Declaration::new(
//!     "UserId",
//!     Declarable::Alias { ty: Type::basic(Basic::Int), properties: Properties::new() },
//! )])
//! .expect("well-formed model");
//! let compiled = compile(&model, &Processor::ALL).expect("model compiles");
//! assert_eq!(compiled.processors, ["coding", "docs"]);
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod api;
pub mod defaults;
pub mod fold;
pub mod pipeline;
pub mod processors;
pub mod slots;

pub use api::PropertiesApi;
pub use defaults::{DefaultProperties, NodeDefaults, NodeKind};
pub use fold::{fold_processors, Halted};
pub use pipeline::{compile, compile_with, run_processors, CompileError, Compiled};
pub use processors::{Processor, ProcessorError};
pub use slots::{validate_slots, SlotError};
