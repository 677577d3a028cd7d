//! Built-in processors.
//!
//! | Processor | Owns | Checks |
//! |-----------|------|--------|
//! | [`coding`] | `coding.*` slots | wire keys, tag field, refinements |
//! | [`docs`] | `doc`, `docs.required` | documentation presence |

pub mod coding;
pub mod docs;

use std::fmt;

use thiserror::Error;
use typegen_ir::model::{CheckedModel, Position};

pub use coding::{CodingError, CodingProcessor};
pub use docs::{DocsError, DocsProcessor};

use crate::defaults::DefaultProperties;

/// A pluggable processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processor {
    /// Serialization metadata.
    Coding(CodingProcessor),
    /// Documentation metadata.
    Docs(DocsProcessor),
}

impl Processor {
    /// Every built-in processor, in the order a default run uses.
    pub const ALL: [Processor; 2] = [
        Processor::Coding(CodingProcessor),
        Processor::Docs(DocsProcessor),
    ];

    /// Short name used on the command line and in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Processor::Coding(_) => "coding",
            Processor::Docs(_) => "docs",
        }
    }

    /// Looks a processor up by [`Processor::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// The processor's default-properties record.
    #[must_use]
    pub fn defaults(&self) -> DefaultProperties {
        match self {
            Processor::Coding(p) => p.defaults(),
            Processor::Docs(p) => p.defaults(),
        }
    }

    /// Runs the processor's check.
    ///
    /// # Errors
    ///
    /// Everything the processor reports.
    pub fn check(&self, model: CheckedModel) -> Result<CheckedModel, Vec<ProcessorError>> {
        match self {
            Processor::Coding(p) => p
                .check(model)
                .map_err(|errs| errs.into_iter().map(ProcessorError::from).collect()),
            Processor::Docs(p) => p
                .check(model)
                .map_err(|errs| errs.into_iter().map(ProcessorError::from).collect()),
        }
    }

    /// Formats this processor's errors, one line each, prefixed by the
    /// rendered position.
    pub fn format_errors(
        &self,
        errors: &[ProcessorError],
        render: impl Fn(&Position) -> String,
    ) -> Vec<String> {
        errors
            .iter()
            .map(|err| format!("{}: [{}] {err}", render(err.position()), self.name()))
            .collect()
    }
}

impl fmt::Display for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error reported by one of the built-in processors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessorError {
    /// From [`Processor::Coding`].
    #[error(transparent)]
    Coding(#[from] CodingError),
    /// From [`Processor::Docs`].
    #[error(transparent)]
    Docs(#[from] DocsError),
}

impl ProcessorError {
    /// Position of the offending node.
    pub fn position(&self) -> &Position {
        match self {
            ProcessorError::Coding(err) => err.position(),
            ProcessorError::Docs(err) => err.position(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for processor in Processor::ALL {
            assert_eq!(Processor::from_name(processor.name()), Some(processor));
        }
        assert_eq!(Processor::from_name("lint"), None);
    }

    #[test]
    fn format_errors_prefixes_position_and_name() {
        let err = ProcessorError::Docs(DocsError::MissingDoc {
            declaration: "User".into(),
            position: Position::in_file("model.json", 3, 7),
        });
        let lines = Processor::Docs(DocsProcessor).format_errors(&[err], |p| {
            format!("{}:{}", p.line, p.column)
        });
        assert_eq!(lines, ["3:7: [docs] `User` is not documented"]);
    }
}
