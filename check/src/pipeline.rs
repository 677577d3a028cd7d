//! The compile pipeline: resolve, then fold processors.

use thiserror::Error;
use tracing::{debug, info};
use typegen_ir::model::{CheckedModel, Position, UncheckedModel};
use typegen_ir::property::Properties;
use typegen_ir::resolve::{resolve, ResolveError};

use crate::api::PropertiesApi;
use crate::defaults::DefaultProperties;
use crate::fold::fold_processors;
use crate::processors::{Processor, ProcessorError};

/// A model that resolved and passed every processor.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// The checked model.
    pub model: CheckedModel,
    /// Merged defaults of every processor that ran.
    pub defaults: DefaultProperties,
    /// Names of the processors that ran, in order.
    pub processors: Vec<&'static str>,
}

impl Compiled {
    /// A Properties API over the checked model.
    #[must_use]
    pub fn api(&self) -> PropertiesApi<'_> {
        PropertiesApi::new(&self.defaults, &self.model)
    }
}

/// Why a model failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Some references do not resolve.
    #[error("{} unresolved reference(s)", .0.len())]
    Resolve(Vec<ResolveError>),
    /// A processor rejected the model. Later processors did not run.
    #[error("processor `{processor}` reported {} error(s)", errors.len())]
    Processor {
        /// The failing processor.
        processor: Processor,
        /// Its errors.
        errors: Vec<ProcessorError>,
    },
}

impl CompileError {
    /// One line per underlying error.
    pub fn render(&self, render_position: impl Fn(&Position) -> String) -> Vec<String> {
        match self {
            CompileError::Resolve(errors) => errors
                .iter()
                .map(|err| err.render(&render_position))
                .collect(),
            CompileError::Processor { processor, errors } => {
                processor.format_errors(errors, render_position)
            }
        }
    }
}

/// Folds `processors` over `model` in order, halting at the first failure.
///
/// # Errors
///
/// [`CompileError::Processor`] for the first processor that fails.
pub fn run_processors(
    model: CheckedModel,
    processors: &[Processor],
) -> Result<CheckedModel, CompileError> {
    fold_processors(processors, model, |processor, model| {
        debug!(processor = processor.name(), "running processor");
        processor.check(model)
    })
    .map_err(|halted| CompileError::Processor {
        processor: *halted.processor,
        errors: halted.errors,
    })
}

/// Compiles `model` with empty top-level properties.
///
/// # Errors
///
/// See [`compile_with`].
pub fn compile(model: &UncheckedModel, processors: &[Processor]) -> Result<Compiled, CompileError> {
    compile_with(model, Properties::new(), processors)
}

/// Compiles `model`, seeding the checked model's top-level properties.
///
/// # Errors
///
/// [`CompileError::Resolve`] when references dangle, otherwise
/// [`CompileError::Processor`] for the first failing processor.
pub fn compile_with(
    model: &UncheckedModel,
    properties: Properties,
    processors: &[Processor],
) -> Result<Compiled, CompileError> {
    let classified = resolve(model).map_err(CompileError::Resolve)?;
    let mut initial = CheckedModel::initial(classified);
    initial.properties = properties;

    let checked = run_processors(initial, processors)?;
    let records: Vec<DefaultProperties> = processors.iter().map(Processor::defaults).collect();
    let names: Vec<&'static str> = processors.iter().map(Processor::name).collect();
    info!(
        declarations = checked.declarations.len(),
        processors = ?names,
        "model compiled"
    );
    Ok(Compiled {
        model: checked,
        defaults: DefaultProperties::merged(&records),
        processors: names,
    })
}
