//! Abstract emission values.
//!
//! Backends do not print target syntax. They produce a [`Fragment`] per
//! declaration: a [`FunctionDecl`] whose body is a [`Decoder`] tree, plus a
//! [`Linkage`] naming the support modules the body needs and the names it
//! exposes. A code builder turns fragments into concrete source.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use typegen_ir::model::{Basic, Restriction};

/// How a reference to a sibling declaration is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStyle {
    /// Call the sibling's standalone decoder function.
    Standalone,
    /// Go through the sibling's structural codec.
    CodecAccessor,
}

/// Support modules a decoder body depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    /// Scalar decoders and combinators.
    Decode,
    /// Set construction.
    Set,
    /// String-keyed maps.
    Dict,
    /// Maps whose keys go through another decoder.
    KeyedDict,
    /// The "absent field is fine" combinator.
    OptionalField,
    /// Discriminant dispatch for sums.
    Tagged,
    /// Label codecs for enumerations.
    Enumeration,
    /// Validating codecs for refinements.
    Refinement,
    /// Structural codec accessors.
    Codec,
}

impl Support {
    /// Module path of the support code.
    #[must_use]
    pub fn module(self) -> &'static str {
        match self {
            Support::Decode => "Json.Decode",
            Support::Set => "Set",
            Support::Dict => "Dict",
            Support::KeyedDict => "Typegen.KeyedDict",
            Support::OptionalField => "Typegen.Field",
            Support::Tagged => "Typegen.Tagged",
            Support::Enumeration => "Typegen.Enum",
            Support::Refinement => "Typegen.Refined",
            Support::Codec => "Typegen.Codec",
        }
    }
}

/// How map keys are decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "key", rename_all = "snake_case")]
pub enum KeyDecoder {
    /// Keys are kept as strings.
    Text,
    /// Keys must be labels of the named enumeration.
    Enumeration {
        /// The enumeration.
        target: String,
    },
    /// Keys are parsed as the refined scalar and validated.
    Refined {
        /// The refinement.
        target: String,
        /// The scalar keys are parsed as.
        basic: Basic,
    },
}

/// Whether a field may be absent from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// The key must be present.
    Required,
    /// The key may be absent or `null`.
    Optional,
}

/// Decoder of one object field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDecoder {
    /// Field name in the model.
    pub name: String,
    /// Key read from the input object.
    pub key: String,
    /// Whether the key may be missing.
    pub presence: Presence,
    /// Decoder of the value; for optional fields, of the present value.
    pub decoder: Decoder,
}

/// One branch of a tagged decoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Case {
    /// Discriminant value selecting this branch.
    pub tag: String,
    /// Constructor applied to the decoded fields.
    pub constructor: String,
    /// Field decoders, in constructor order.
    pub fields: Vec<FieldDecoder>,
}

impl Case {
    /// The arity-specific combinator composing the fields:
    /// `succeed`, `map`, `map2`, ...
    #[must_use]
    pub fn combinator(&self) -> String {
        match self.fields.len() {
            0 => "succeed".to_string(),
            1 => "map".to_string(),
            n => format!("map{n}"),
        }
    }
}

/// A decoder expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decoder", rename_all = "snake_case")]
pub enum Decoder {
    /// Succeeds with the unit value.
    Unit,
    /// One of the four scalar decoders.
    Primitive {
        /// The scalar.
        basic: Basic,
    },
    /// Decodes through a sibling declaration.
    Call {
        /// The sibling.
        target: String,
        /// How the sibling is reached.
        style: ReferenceStyle,
    },
    /// Array of elements.
    List {
        /// Element decoder.
        element: Box<Decoder>,
    },
    /// Array of elements, deduplicated.
    Set {
        /// Element decoder.
        element: Box<Decoder>,
    },
    /// `null` or a value.
    Nullable {
        /// Value decoder.
        element: Box<Decoder>,
    },
    /// Object read as a map.
    Dict {
        /// Key decoder.
        key: KeyDecoder,
        /// Value decoder.
        value: Box<Decoder>,
    },
    /// Object read field by field; unknown keys are ignored.
    Object {
        /// Field decoders, in model order.
        fields: Vec<FieldDecoder>,
    },
    /// Object dispatched on a discriminant key.
    Tagged {
        /// The discriminant key.
        discriminant: String,
        /// One case per constructor.
        cases: Vec<Case>,
    },
    /// String that must be one of `labels`.
    Enumeration {
        /// The enumeration.
        name: String,
        /// Its labels.
        labels: Vec<String>,
    },
    /// Scalar that must satisfy `restriction`.
    Refined {
        /// The refinement.
        name: String,
        /// Its predicate.
        restriction: Restriction,
    },
}

impl Decoder {
    /// Shorthand for [`Decoder::Primitive`].
    #[must_use]
    pub fn primitive(basic: Basic) -> Self {
        Decoder::Primitive { basic }
    }
}

/// A generated function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    /// Function name.
    pub name: String,
    /// Documentation, when the declaration has one.
    pub doc: Option<String>,
    /// Type signature, when the backend knows one.
    pub signature: Option<String>,
    /// Parameter names.
    pub params: Vec<String>,
    /// Function body.
    pub body: Decoder,
}

/// What a fragment imports and exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Linkage {
    /// Module the fragment belongs to.
    pub module: Vec<String>,
    /// Support modules the body needs.
    pub imports: BTreeSet<Support>,
    /// Names the fragment exposes.
    pub exposes: Vec<String>,
}

/// Everything generated for one declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    /// The declaration the fragment was generated from.
    pub declaration: String,
    /// The generated function.
    pub function: FunctionDecl,
    /// Its linkage.
    pub linkage: Linkage,
}

/// Name of the standalone decoder of `declaration`: `User` becomes `userDecoder`.
#[must_use]
pub fn decoder_name(declaration: &str) -> String {
    format!("{}Decoder", lower_first(declaration))
}

/// Name of the codec of `declaration`: `User` becomes `userCodec`.
#[must_use]
pub fn codec_name(declaration: &str) -> String {
    format!("{}Codec", lower_first(declaration))
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for ReferenceStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceStyle::Standalone => f.write_str("decoder"),
            ReferenceStyle::CodecAccessor => f.write_str("codec"),
        }
    }
}

/// Writes `content` to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be written.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
