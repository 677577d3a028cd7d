//! typegen code generator.
//!
//! Takes a [`Compiled`] model from `typegen-check` and produces one
//! [`Fragment`](emit::Fragment) per declaration. Each declaration picks its
//! backend through the `coding.kind` slot; the decoder backend is the one
//! implemented here, encoders and codecs are named but unavailable.
//!
//! # Entry Point
//!
//! ```
//! use typegen_check::{compile, Processor};
//! use typegen_codegen::{generate, DecoderOptions};
//! use typegen_ir::model::{Basic, Declarable, Declaration, Type, UncheckedModel};
//! use typegen_ir::property::Property;
//!
//! let kind = Property::some(Property::enumeration(["decoder", "encoder", "codec"], "decoder"));
//! let model = UncheckedModel::new(vec![Declaration::new(
//!     "UserId",
//!     Declarable::Alias {
//!         ty: Type::basic(Basic::Int),
//!         properties: [("coding.kind", kind)].into_iter().collect(),
//!     },
//! )])
//! .expect("well-formed model");
//! let compiled = compile(&model, &Processor::ALL).expect("model compiles");
//! let options = DecoderOptions::from_api(&compiled.api()).expect("coding ran");
//! let report = generate(&compiled, &options);
//! assert_eq!(report.fragments[0].function.name, "userIdDecoder");
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod decoder;
pub mod emit;
pub mod listing;
pub mod runtime;

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};
use typegen_check::processors::coding;
use typegen_check::{Compiled, PropertiesApi};
use typegen_ir::model::{Declarable, Position};
use typegen_ir::property::PropertyError;

use emit::{Fragment, ReferenceStyle};

/// A code-generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Standalone decoder functions.
    Decoder,
    /// Standalone encoder functions.
    Encoder,
    /// Structural codecs.
    Codec,
}

impl Backend {
    /// The backend selected by a `coding.kind` label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "decoder" => Some(Backend::Decoder),
            "encoder" => Some(Backend::Encoder),
            "codec" => Some(Backend::Codec),
            _ => None,
        }
    }

    /// The `coding.kind` label selecting this backend.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Backend::Decoder => "decoder",
            Backend::Encoder => "encoder",
            Backend::Codec => "codec",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Options shared by every decoder of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderOptions {
    /// How sibling declarations are referenced.
    pub references: ReferenceStyle,
    /// Discriminant key of tagged sums.
    pub tag_field: String,
    /// Module the fragments belong to.
    pub module: Vec<String>,
}

impl DecoderOptions {
    /// Reads the options from the model-level `coding.*` slots.
    ///
    /// # Errors
    ///
    /// [`PropertyError`] if the `coding` processor did not run.
    pub fn from_api(api: &PropertiesApi<'_>) -> Result<Self, PropertyError> {
        let model = api.model();
        let references = match model.enumeration(coding::REFERENCES, &coding::REFERENCE_STYLES)? {
            "codec" => ReferenceStyle::CodecAccessor,
            _ => ReferenceStyle::Standalone,
        };
        Ok(Self {
            references,
            tag_field: model.string(coding::TAG_FIELD)?.to_string(),
            module: model.qname(coding::MODULE)?.to_vec(),
        })
    }
}

/// Why a declaration produced no fragment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// The declaration does not set `coding.kind`.
    #[error("`{declaration}` has no coding strategy; set `coding.kind`")]
    NoCodingStrategy {
        /// The declaration.
        declaration: String,
        /// Its position.
        position: Position,
    },
    /// A checked slot could not be read.
    #[error(transparent)]
    Property(#[from] PropertyError),
    /// The declaration contains a type no decoder can read.
    #[error("`{declaration}` cannot be decoded: `{path}` is a function type")]
    Undecodable {
        /// The declaration.
        declaration: String,
        /// Path of the function type.
        path: String,
        /// Its position.
        position: Position,
    },
    /// The selected backend is an extension point without an implementation.
    #[error("`{declaration}` selects the {backend} backend, which is not available")]
    BackendUnavailable {
        /// The declaration.
        declaration: String,
        /// The selected backend.
        backend: Backend,
    },
}

/// Report of what was generated.
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Fragments, in model order.
    pub fragments: Vec<Fragment>,
    /// Declarations that produced no fragment.
    pub errors: Vec<GenerateError>,
    /// Number of alias decoders generated.
    pub alias_count: usize,
    /// Number of tagged decoders generated.
    pub sum_count: usize,
    /// Number of enumeration decoders generated.
    pub enum_count: usize,
    /// Number of refinement decoders generated.
    pub restricted_count: usize,
}

impl GenerationReport {
    /// Returns true if every declaration produced a fragment.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Generates one fragment per declaration of `compiled`.
///
/// Per-declaration failures are collected in the report and never stop the
/// run.
#[must_use]
pub fn generate(compiled: &Compiled, options: &DecoderOptions) -> GenerationReport {
    let api = compiled.api();
    let mut report = GenerationReport::default();

    for decl in &compiled.model.declarations {
        let kind = api
            .declaration(&decl.body)
            .optional_enumeration(coding::KIND, &coding::KINDS);
        let result = match kind {
            Err(err) => Err(GenerateError::from(err)),
            Ok(None) => Err(GenerateError::NoCodingStrategy {
                declaration: decl.name.clone(),
                position: decl.position.clone(),
            }),
            Ok(Some(label)) => match Backend::from_label(label) {
                Some(Backend::Decoder) => decoder::generate_decoder(decl, &api, options),
                Some(backend) => Err(GenerateError::BackendUnavailable {
                    declaration: decl.name.clone(),
                    backend,
                }),
                None => Err(GenerateError::NoCodingStrategy {
                    declaration: decl.name.clone(),
                    position: decl.position.clone(),
                }),
            },
        };

        match result {
            Ok(fragment) => {
                debug!(declaration = %decl.name, function = %fragment.function.name, "generated");
                match &decl.body {
                    Declarable::Alias { .. } => report.alias_count += 1,
                    Declarable::Sum { .. } => report.sum_count += 1,
                    Declarable::Enum { .. } => report.enum_count += 1,
                    Declarable::Restricted { .. } => report.restricted_count += 1,
                }
                report.fragments.push(fragment);
            }
            Err(err) => {
                warn!(declaration = %decl.name, error = %err, "skipped declaration");
                report.errors.push(err);
            }
        }
    }

    info!(
        fragments = report.fragments.len(),
        errors = report.errors.len(),
        "generation finished"
    );
    report
}
