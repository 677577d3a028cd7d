//! Reference interpreter for emitted decoders.
//!
//! Runs [`Decoder`] trees against `serde_json` values the way generated
//! code behaves: unknown object keys are ignored, optional fields may be
//! absent or `null`, sums dispatch on their discriminant, and enumerations
//! and refinements reject values outside their domain. Sibling references
//! resolve through the fragments the runtime was built from.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use typegen_ir::model::{Basic, IntRestriction, Restriction, StringRestriction};

use crate::emit::{Case, Decoder, FieldDecoder, Fragment, KeyDecoder, Presence};

/// A decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// The unit value.
    Unit,
    /// A flag.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A float.
    Real(f64),
    /// A string.
    String(String),
    /// An ordered sequence.
    List(Vec<Decoded>),
    /// A collection without duplicates, in first-seen order.
    Set(Vec<Decoded>),
    /// A value that may be absent.
    Optional(Option<Box<Decoded>>),
    /// A map, in input key order.
    Dict(Vec<(Decoded, Decoded)>),
    /// A record, by field name.
    Record(BTreeMap<String, Decoded>),
    /// A constructor applied to its fields.
    Constructor {
        /// Constructor name.
        name: String,
        /// Fields by name.
        fields: BTreeMap<String, Decoded>,
    },
    /// An enumeration label.
    Label(String),
}

/// Why an input was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No fragment decodes the named declaration.
    #[error("no decoder for `{name}`")]
    UnknownDecoder {
        /// The declaration.
        name: String,
    },
    /// The input has the wrong JSON shape.
    #[error("{path}: expected {expected}, found {found}")]
    Expected {
        /// Where in the input.
        path: String,
        /// What the decoder wanted.
        expected: &'static str,
        /// What the input held.
        found: String,
    },
    /// A required key is absent.
    #[error("{path}: missing field `{key}`")]
    MissingField {
        /// The object.
        path: String,
        /// The absent key.
        key: String,
    },
    /// The discriminant names no constructor.
    #[error("{path}: unknown tag `{tag}`")]
    UnknownTag {
        /// The object.
        path: String,
        /// The discriminant value.
        tag: String,
    },
    /// The string is not a label of the enumeration.
    #[error("{path}: `{label}` is not a label of {enumeration}")]
    UnknownLabel {
        /// Where in the input.
        path: String,
        /// The enumeration.
        enumeration: String,
        /// The offending string.
        label: String,
    },
    /// The value fails the refinement's predicate.
    #[error("{path}: {value} is not a valid {refinement}: {reason}")]
    Refinement {
        /// Where in the input.
        path: String,
        /// The refinement.
        refinement: String,
        /// The offending value.
        value: String,
        /// The failed predicate.
        reason: String,
    },
    /// A map key failed its key decoder.
    #[error("{path}: invalid key `{key}`: {reason}")]
    InvalidKey {
        /// The map.
        path: String,
        /// The offending key.
        key: String,
        /// Why the key was rejected.
        reason: String,
    },
    /// A declaration reaches itself again without consuming any input,
    /// as in `A = Optional(A)`.
    #[error("{path}: `{name}` refers to itself without consuming input")]
    NonProductiveCycle {
        /// Where in the input.
        path: String,
        /// The declaration entered twice.
        name: String,
    },
}

/// Decoders by declaration name.
#[derive(Debug, Clone)]
pub struct Runtime<'f> {
    decoders: BTreeMap<&'f str, &'f Decoder>,
}

impl<'f> Runtime<'f> {
    /// Indexes `fragments` by declaration.
    #[must_use]
    pub fn new(fragments: &'f [Fragment]) -> Self {
        Self {
            decoders: fragments
                .iter()
                .map(|f| (f.declaration.as_str(), &f.function.body))
                .collect(),
        }
    }

    /// Decodes `input` as a value of the declaration `name`.
    ///
    /// # Errors
    ///
    /// [`DecodeError`] describing the first rejected part of `input`.
    pub fn decode(&self, name: &str, input: &Value) -> Result<Decoded, DecodeError> {
        self.call(name, input, "$", &[])
    }

    /// Runs the decoder of `target` on `input`. `entered` lists the
    /// declarations already entered at this same input.
    fn call(&self, target: &str, input: &Value, path: &str, entered: &[&str]) -> Result<Decoded, DecodeError> {
        if entered.iter().any(|name| *name == target) {
            return Err(DecodeError::NonProductiveCycle {
                path: path.to_string(),
                name: target.to_string(),
            });
        }
        let entered: Vec<&str> = entered.iter().copied().chain([target]).collect();
        self.run(self.lookup(target)?, input, path, &entered)
    }

    fn lookup(&self, name: &str) -> Result<&'f Decoder, DecodeError> {
        self.decoders
            .get(name)
            .copied()
            .ok_or_else(|| DecodeError::UnknownDecoder {
                name: name.to_string(),
            })
    }

    fn run(&self, decoder: &Decoder, input: &Value, path: &str, entered: &[&str]) -> Result<Decoded, DecodeError> {
        match decoder {
            Decoder::Unit => Ok(Decoded::Unit),
            Decoder::Primitive { basic } => primitive(*basic, input, path),
            Decoder::Call { target, .. } => self.call(target, input, path, entered),
            Decoder::List { element } => Ok(Decoded::List(self.elements(element, input, path)?)),
            Decoder::Set { element } => {
                let mut unique: Vec<Decoded> = Vec::new();
                for item in self.elements(element, input, path)? {
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                Ok(Decoded::Set(unique))
            }
            Decoder::Nullable { element } => match input {
                Value::Null => Ok(Decoded::Optional(None)),
                other => Ok(Decoded::Optional(Some(Box::new(self.run(element, other, path, entered)?)))),
            },
            Decoder::Dict { key, value } => {
                let object = expect_object(input, path)?;
                let mut entries = Vec::with_capacity(object.len());
                for (raw, item) in object {
                    let decoded_key = self.key(key, raw, path)?;
                    let decoded = self.run(value, item, &format!("{path}[{raw:?}]"), &[])?;
                    entries.push((decoded_key, decoded));
                }
                Ok(Decoded::Dict(entries))
            }
            Decoder::Object { fields } => {
                let object = expect_object(input, path)?;
                Ok(Decoded::Record(self.fields(fields, object, path)?))
            }
            Decoder::Tagged {
                discriminant,
                cases,
            } => self.tagged(discriminant, cases, input, path),
            Decoder::Enumeration { name, labels } => match input {
                Value::String(label) if labels.contains(label) => Ok(Decoded::Label(label.clone())),
                Value::String(label) => Err(DecodeError::UnknownLabel {
                    path: path.to_string(),
                    enumeration: name.clone(),
                    label: label.clone(),
                }),
                other => Err(expected("a string", other, path)),
            },
            Decoder::Refined { name, restriction } => {
                let value = primitive(restriction.basic(), input, path)?;
                refine(name, restriction, &value, path)?;
                Ok(value)
            }
        }
    }

    fn elements(&self, element: &Decoder, input: &Value, path: &str) -> Result<Vec<Decoded>, DecodeError> {
        match input {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.run(element, item, &format!("{path}[{i}]"), &[]))
                .collect(),
            other => Err(expected("an array", other, path)),
        }
    }

    fn fields(
        &self,
        fields: &[FieldDecoder],
        object: &serde_json::Map<String, Value>,
        path: &str,
    ) -> Result<BTreeMap<String, Decoded>, DecodeError> {
        let mut out = BTreeMap::new();
        for field in fields {
            let at = format!("{path}.{}", field.key);
            let value = match (field.presence, object.get(&field.key)) {
                (Presence::Required, Some(raw)) => self.run(&field.decoder, raw, &at, &[])?,
                (Presence::Required, None) => {
                    return Err(DecodeError::MissingField {
                        path: path.to_string(),
                        key: field.key.clone(),
                    })
                }
                (Presence::Optional, None | Some(Value::Null)) => Decoded::Optional(None),
                (Presence::Optional, Some(raw)) => {
                    Decoded::Optional(Some(Box::new(self.run(&field.decoder, raw, &at, &[])?)))
                }
            };
            out.insert(field.name.clone(), value);
        }
        Ok(out)
    }

    fn tagged(&self, discriminant: &str, cases: &[Case], input: &Value, path: &str) -> Result<Decoded, DecodeError> {
        let object = expect_object(input, path)?;
        let tag = match object.get(discriminant) {
            Some(Value::String(tag)) => tag,
            Some(other) => return Err(expected("a string tag", other, &format!("{path}.{discriminant}"))),
            None => {
                return Err(DecodeError::MissingField {
                    path: path.to_string(),
                    key: discriminant.to_string(),
                })
            }
        };
        let case = cases
            .iter()
            .find(|c| &c.tag == tag)
            .ok_or_else(|| DecodeError::UnknownTag {
                path: path.to_string(),
                tag: tag.clone(),
            })?;
        Ok(Decoded::Constructor {
            name: case.constructor.clone(),
            fields: self.fields(&case.fields, object, path)?,
        })
    }

    /// Keys that fail their decoder fail the whole map.
    fn key(&self, key: &KeyDecoder, raw: &str, path: &str) -> Result<Decoded, DecodeError> {
        let invalid = |reason: String| DecodeError::InvalidKey {
            path: path.to_string(),
            key: raw.to_string(),
            reason,
        };
        match key {
            KeyDecoder::Text => Ok(Decoded::String(raw.to_string())),
            KeyDecoder::Enumeration { target } => match self.lookup(target)? {
                Decoder::Enumeration { labels, .. } if labels.iter().any(|l| l == raw) => {
                    Ok(Decoded::Label(raw.to_string()))
                }
                Decoder::Enumeration { name, .. } => Err(invalid(format!("not a label of {name}"))),
                _ => Err(invalid(format!("{target} is not an enumeration"))),
            },
            KeyDecoder::Refined { target, basic } => {
                let value = match basic {
                    Basic::Int => {
                        let n = raw
                            .parse::<i64>()
                            .map_err(|e| invalid(format!("not an integer ({e})")))?;
                        // Only the canonical spelling, so "080" and "80" never merge.
                        if n.to_string() != raw {
                            return Err(invalid("not a canonical integer".to_string()));
                        }
                        Decoded::Int(n)
                    }
                    _ => Decoded::String(raw.to_string()),
                };
                match self.lookup(target)? {
                    Decoder::Refined { name, restriction } => {
                        refine(name, restriction, &value, path).map_err(|e| match e {
                            DecodeError::Refinement { reason, .. } => invalid(reason),
                            other => other,
                        })?;
                        Ok(value)
                    }
                    _ => Err(invalid(format!("{target} is not a refinement"))),
                }
            }
        }
    }
}

fn primitive(basic: Basic, input: &Value, path: &str) -> Result<Decoded, DecodeError> {
    match (basic, input) {
        (Basic::Bool, Value::Bool(b)) => Ok(Decoded::Bool(*b)),
        (Basic::Int, Value::Number(n)) if n.is_i64() => n
            .as_i64()
            .map(Decoded::Int)
            .ok_or_else(|| expected("an integer", input, path)),
        (Basic::Real, Value::Number(n)) => n
            .as_f64()
            .map(Decoded::Real)
            .ok_or_else(|| expected("a number", input, path)),
        (Basic::String, Value::String(s)) => Ok(Decoded::String(s.clone())),
        (Basic::Bool, _) => Err(expected("a bool", input, path)),
        (Basic::Int, _) => Err(expected("an integer", input, path)),
        (Basic::Real, _) => Err(expected("a number", input, path)),
        (Basic::String, _) => Err(expected("a string", input, path)),
    }
}

fn refine(name: &str, restriction: &Restriction, value: &Decoded, path: &str) -> Result<(), DecodeError> {
    let reason = match (restriction, value) {
        (Restriction::Int(r), Decoded::Int(n)) => int_violation(r, *n),
        (Restriction::String(r), Decoded::String(s)) => string_violation(r, s),
        _ => Some("value has the wrong scalar type".to_string()),
    };
    match reason {
        None => Ok(()),
        Some(reason) => Err(DecodeError::Refinement {
            path: path.to_string(),
            refinement: name.to_string(),
            value: match value {
                Decoded::Int(n) => n.to_string(),
                Decoded::String(s) => format!("{s:?}"),
                other => format!("{other:?}"),
            },
            reason,
        }),
    }
}

/// Widths are signed two's-complement bit counts.
fn int_violation(r: &IntRestriction, n: i64) -> Option<String> {
    if let Some(min) = r.min.filter(|min| n < *min) {
        return Some(format!("below minimum {min}"));
    }
    if let Some(max) = r.max.filter(|max| n > *max) {
        return Some(format!("above maximum {max}"));
    }
    match r.width {
        Some(width @ 1..=63) => {
            let bound = 1i64 << (width - 1);
            (n < -bound || n >= bound).then(|| format!("does not fit in {width} bits"))
        }
        _ => None,
    }
}

fn string_violation(r: &StringRestriction, s: &str) -> Option<String> {
    let length = s.chars().count();
    if let Some(min) = r.min_length.filter(|min| length < *min) {
        return Some(format!("shorter than {min} characters"));
    }
    if let Some(max) = r.max_length.filter(|max| length > *max) {
        return Some(format!("longer than {max} characters"));
    }
    let pattern = r.regex.as_deref()?;
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(re) if re.is_match(s) => None,
        Ok(_) => Some(format!("does not match /{pattern}/")),
        Err(err) => Some(format!("pattern does not compile: {err}")),
    }
}

fn expect_object<'v>(input: &'v Value, path: &str) -> Result<&'v serde_json::Map<String, Value>, DecodeError> {
    input.as_object().ok_or_else(|| expected("an object", input, path))
}

fn expected(what: &'static str, found: &Value, path: &str) -> DecodeError {
    let found = match found {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    DecodeError::Expected {
        path: path.to_string(),
        expected: what,
        found: found.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::emit::{FunctionDecl, Linkage, ReferenceStyle};
    use serde_json::json;

    fn fragment(name: &str, body: Decoder) -> Fragment {
        Fragment {
            declaration: name.to_string(),
            function: FunctionDecl {
                name: crate::emit::decoder_name(name),
                doc: None,
                signature: None,
                params: vec![],
                body,
            },
            linkage: Linkage::default(),
        }
    }

    fn refined(name: &str, restriction: Restriction) -> Fragment {
        fragment(
            name,
            Decoder::Refined {
                name: name.to_string(),
                restriction,
            },
        )
    }

    #[test]
    fn width_is_signed() {
        let r = IntRestriction {
            width: Some(8),
            ..IntRestriction::default()
        };
        assert_eq!(int_violation(&r, 127), None);
        assert_eq!(int_violation(&r, -128), None);
        assert!(int_violation(&r, 128).is_some());
        assert!(int_violation(&r, -129).is_some());
    }

    #[test]
    fn string_refinement_checks_length_and_whole_pattern() {
        let fragments = [refined(
            "Slug",
            Restriction::String(StringRestriction {
                min_length: Some(2),
                max_length: Some(8),
                regex: Some("[a-z-]+".into()),
            }),
        )];
        let runtime = Runtime::new(&fragments);
        assert!(runtime.decode("Slug", &json!("hello-1")).is_err(), "digit outside the pattern");
        assert!(runtime.decode("Slug", &json!("a")).is_err());
        assert_eq!(runtime.decode("Slug", &json!("ok")).unwrap(), Decoded::String("ok".into()));
    }

    #[test]
    fn refined_int_keys_are_parsed_then_validated() {
        let fragments = [
            refined(
                "Port",
                Restriction::Int(IntRestriction {
                    min: Some(1),
                    max: Some(65535),
                    width: None,
                }),
            ),
            fragment(
                "Ports",
                Decoder::Dict {
                    key: KeyDecoder::Refined {
                        target: "Port".into(),
                        basic: Basic::Int,
                    },
                    value: Box::new(Decoder::primitive(Basic::String)),
                },
            ),
        ];
        let runtime = Runtime::new(&fragments);
        let ok = runtime.decode("Ports", &json!({"80": "http"})).unwrap();
        assert_eq!(ok, Decoded::Dict(vec![(Decoded::Int(80), Decoded::String("http".into()))]));
        assert!(matches!(
            runtime.decode("Ports", &json!({"80": "http", "0": "none"})),
            Err(DecodeError::InvalidKey { key, .. }) if key == "0"
        ));
        assert!(matches!(
            runtime.decode("Ports", &json!({"http": "x"})),
            Err(DecodeError::InvalidKey { .. })
        ));
        for spelling in ["080", "+80"] {
            assert!(
                matches!(
                    runtime.decode("Ports", &json!({ spelling: "http" })),
                    Err(DecodeError::InvalidKey { key, .. }) if key == spelling
                ),
                "{spelling} must not fold into 80"
            );
        }
    }

    #[test]
    fn self_reference_without_input_is_an_error() {
        let fragments = [
            fragment(
                "Loop",
                Decoder::Nullable {
                    element: Box::new(Decoder::Call {
                        target: "Loop".into(),
                        style: ReferenceStyle::Standalone,
                    }),
                },
            ),
            fragment(
                "Same",
                Decoder::Call {
                    target: "Same".into(),
                    style: ReferenceStyle::Standalone,
                },
            ),
        ];
        let runtime = Runtime::new(&fragments);
        assert_eq!(runtime.decode("Loop", &json!(null)).unwrap(), Decoded::Optional(None));
        assert_eq!(
            runtime.decode("Loop", &json!(1)).unwrap_err(),
            DecodeError::NonProductiveCycle {
                path: "$".into(),
                name: "Loop".into(),
            }
        );
        assert!(matches!(
            runtime.decode("Same", &json!({})),
            Err(DecodeError::NonProductiveCycle { name, .. }) if name == "Same"
        ));
    }

    #[test]
    fn set_drops_duplicates_and_nullable_accepts_null() {
        let fragments = [
            fragment(
                "Tags",
                Decoder::Set {
                    element: Box::new(Decoder::primitive(Basic::String)),
                },
            ),
            fragment(
                "MaybeInt",
                Decoder::Nullable {
                    element: Box::new(Decoder::primitive(Basic::Int)),
                },
            ),
        ];
        let runtime = Runtime::new(&fragments);
        assert_eq!(
            runtime.decode("Tags", &json!(["a", "b", "a"])).unwrap(),
            Decoded::Set(vec![Decoded::String("a".into()), Decoded::String("b".into())])
        );
        assert_eq!(runtime.decode("MaybeInt", &json!(null)).unwrap(), Decoded::Optional(None));
        assert!(runtime.decode("MaybeInt", &json!("1")).is_err());
    }

    #[test]
    fn calls_resolve_through_sibling_fragments() {
        let fragments = [
            fragment("Id", Decoder::primitive(Basic::Int)),
            fragment(
                "Ids",
                Decoder::List {
                    element: Box::new(Decoder::Call {
                        target: "Id".into(),
                        style: ReferenceStyle::Standalone,
                    }),
                },
            ),
        ];
        let runtime = Runtime::new(&fragments);
        assert_eq!(
            runtime.decode("Ids", &json!([1, 2])).unwrap(),
            Decoded::List(vec![Decoded::Int(1), Decoded::Int(2)])
        );
        assert_eq!(
            runtime.decode("Ids", &json!([1, "x"])).unwrap_err(),
            DecodeError::Expected {
                path: "$[1]".into(),
                expected: "an integer",
                found: "a string".into(),
            }
        );
        assert!(matches!(
            runtime.decode("Missing", &json!(1)),
            Err(DecodeError::UnknownDecoder { .. })
        ));
    }
}
