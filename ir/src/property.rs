//! Typed node metadata.
//!
//! Every node of the algebra carries [`Properties`]: an open map from slot
//! name to a closed tagged [`Property`] value. A processor describes the
//! slots it owns with a parallel [`PropSpec`] schema and supplies default
//! values for them. Reads go through [`PropertyView`], which falls back to
//! those defaults and checks the value kind.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Schema of one metadata slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "spec", content = "of", rename_all = "snake_case")]
pub enum PropSpec {
    /// Free text.
    String,
    /// One label out of a closed set.
    Enum(BTreeSet<String>),
    /// Dotted qualified name.
    QName,
    /// Flag.
    Bool,
    /// A value of the inner spec, or nothing.
    Optional(Box<PropSpec>),
}

impl PropSpec {
    /// `PSEnum` over the given labels.
    pub fn enumeration<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PropSpec::Enum(labels.into_iter().map(Into::into).collect())
    }

    /// `PSOptional(inner)`.
    #[must_use]
    pub fn optional(inner: PropSpec) -> Self {
        PropSpec::Optional(Box::new(inner))
    }
}

impl fmt::Display for PropSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropSpec::String => f.write_str("string"),
            PropSpec::Enum(labels) => {
                let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
                write!(f, "enum{{{}}}", labels.join("|"))
            }
            PropSpec::QName => f.write_str("qname"),
            PropSpec::Bool => f.write_str("bool"),
            PropSpec::Optional(inner) => write!(f, "optional<{inner}>"),
        }
    }
}

/// Schemas keyed by slot name.
pub type PropSpecs = BTreeMap<String, PropSpec>;

/// A metadata value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "property", content = "value", rename_all = "snake_case")]
pub enum Property {
    /// Free text.
    String(String),
    /// A label together with the closed set it was drawn from.
    Enum {
        /// The closed label set.
        labels: BTreeSet<String>,
        /// The chosen label.
        value: String,
    },
    /// Dotted qualified name, one segment per element.
    QName(Vec<String>),
    /// Flag.
    Bool(bool),
    /// An optional value together with the inner spec.
    Optional {
        /// Spec of the wrapped value.
        spec: PropSpec,
        /// The value, if any.
        value: Option<Box<Property>>,
    },
}

impl Property {
    /// `PEnum(labels, value)`.
    pub fn enumeration<I, S>(labels: I, value: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Property::Enum {
            labels: labels.into_iter().map(Into::into).collect(),
            value: value.into(),
        }
    }

    /// `PQName` from a dotted path such as `"app.model.User"`.
    #[must_use]
    pub fn qname(path: &str) -> Self {
        Property::QName(path.split('.').map(str::to_string).collect())
    }

    /// A present optional value; the inner spec is inferred from `value`.
    #[must_use]
    pub fn some(value: Property) -> Self {
        Property::Optional {
            spec: value.spec(),
            value: Some(Box::new(value)),
        }
    }

    /// An explicitly absent optional value of `spec`.
    #[must_use]
    pub fn none(spec: PropSpec) -> Self {
        Property::Optional { spec, value: None }
    }

    /// The `PropSpec` this value was built against.
    #[must_use]
    pub fn spec(&self) -> PropSpec {
        match self {
            Property::String(_) => PropSpec::String,
            Property::Enum { labels, .. } => PropSpec::Enum(labels.clone()),
            Property::QName(_) => PropSpec::QName,
            Property::Bool(_) => PropSpec::Bool,
            Property::Optional { spec, .. } => PropSpec::Optional(Box::new(spec.clone())),
        }
    }

    /// Returns true if this value is kind-correct for `spec`.
    #[must_use]
    pub fn matches(&self, spec: &PropSpec) -> bool {
        match (self, spec) {
            (Property::String(_), PropSpec::String)
            | (Property::QName(_), PropSpec::QName)
            | (Property::Bool(_), PropSpec::Bool) => true,
            (Property::Enum { labels, value }, PropSpec::Enum(expected)) => {
                labels == expected && expected.contains(value)
            }
            (Property::Optional { spec: own, value }, PropSpec::Optional(inner)) => {
                own == inner.as_ref() && value.as_ref().map_or(true, |v| v.matches(inner))
            }
            _ => false,
        }
    }
}

/// Metadata attached to one node, keyed by slot name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, Property>);

impl Properties {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a slot up.
    #[must_use]
    pub fn get(&self, slot: &str) -> Option<&Property> {
        self.0.get(slot)
    }

    /// Sets a slot, returning the value it replaces.
    pub fn insert(&mut self, slot: impl Into<String>, value: Property) -> Option<Property> {
        self.0.insert(slot.into(), value)
    }

    /// Returns true if the slot is set.
    #[must_use]
    pub fn contains(&self, slot: &str) -> bool {
        self.0.contains_key(slot)
    }

    /// Slots in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of slots set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no slot is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copies every slot of `other` over this map; `other` wins on overlap.
    pub fn merge_from(&mut self, other: &Properties) {
        for (slot, value) in &other.0 {
            self.0.insert(slot.clone(), value.clone());
        }
    }
}

impl<S: Into<String>> FromIterator<(S, Property)> for Properties {
    fn from_iter<I: IntoIterator<Item = (S, Property)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Builds a schema and a default mapping in one go.
///
/// Every `required` slot contributes a schema entry only; its value must be
/// supplied by the model. Every `set` slot contributes a schema entry
/// inferred from its value, plus the value itself.
#[must_use]
pub fn define_properties(
    required: &[(&str, PropSpec)],
    set: &[(&str, Property)],
) -> (PropSpecs, Properties) {
    let mut specs: PropSpecs = required
        .iter()
        .map(|(slot, spec)| ((*slot).to_string(), spec.clone()))
        .collect();
    let mut values = Properties::new();
    for (slot, value) in set {
        specs.insert((*slot).to_string(), value.spec());
        values.insert(*slot, value.clone());
    }
    (specs, values)
}

/// A property read that should have been impossible after checking.
///
/// Accessors run only on models that passed the owning processor's check,
/// so either variant points at a processor whose schema disagrees with
/// what it later reads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// Neither the node nor the defaults supply the slot.
    #[error("checked property `{slot}` is missing (expected {spec})")]
    Missing {
        /// Slot name.
        slot: String,
        /// Spec the accessor asked for.
        spec: PropSpec,
    },
    /// The slot holds a value of another kind.
    #[error("checked property `{slot}` has the wrong kind (expected {spec}, found {found})")]
    WrongKind {
        /// Slot name.
        slot: String,
        /// Spec the accessor asked for.
        spec: PropSpec,
        /// Spec of the stored value.
        found: PropSpec,
    },
}

/// Read access to one node's metadata with defaults behind it.
#[derive(Debug, Clone, Copy)]
pub struct PropertyView<'a> {
    own: &'a Properties,
    defaults: &'a Properties,
}

impl<'a> PropertyView<'a> {
    /// Views `own`, falling back to `defaults`.
    #[must_use]
    pub fn new(own: &'a Properties, defaults: &'a Properties) -> Self {
        Self { own, defaults }
    }

    /// The raw value of a slot, node first, then defaults.
    #[must_use]
    pub fn lookup(&self, slot: &str) -> Option<&'a Property> {
        self.own.get(slot).or_else(|| self.defaults.get(slot))
    }

    fn read(&self, slot: &str, spec: &PropSpec) -> Result<&'a Property, PropertyError> {
        let value = self.lookup(slot).ok_or_else(|| PropertyError::Missing {
            slot: slot.to_string(),
            spec: spec.clone(),
        })?;
        if value.matches(spec) {
            Ok(value)
        } else {
            Err(wrong_kind(slot, spec, value))
        }
    }

    /// Reads a `PSString` slot.
    ///
    /// # Errors
    ///
    /// [`PropertyError`] if the slot is absent or not a string.
    pub fn string(&self, slot: &str) -> Result<&'a str, PropertyError> {
        let spec = PropSpec::String;
        match self.read(slot, &spec)? {
            Property::String(s) => Ok(s.as_str()),
            other => Err(wrong_kind(slot, &spec, other)),
        }
    }

    /// Reads a `PSEnum` slot drawn from exactly `labels`.
    ///
    /// # Errors
    ///
    /// [`PropertyError`] if the slot is absent or not an enum over `labels`.
    pub fn enumeration(&self, slot: &str, labels: &[&str]) -> Result<&'a str, PropertyError> {
        let spec = PropSpec::enumeration(labels.iter().copied());
        match self.read(slot, &spec)? {
            Property::Enum { value, .. } => Ok(value.as_str()),
            other => Err(wrong_kind(slot, &spec, other)),
        }
    }

    /// Reads a `PSQName` slot.
    ///
    /// # Errors
    ///
    /// [`PropertyError`] if the slot is absent or not a qualified name.
    pub fn qname(&self, slot: &str) -> Result<&'a [String], PropertyError> {
        let spec = PropSpec::QName;
        match self.read(slot, &spec)? {
            Property::QName(path) => Ok(path.as_slice()),
            other => Err(wrong_kind(slot, &spec, other)),
        }
    }

    /// Reads a `PSBool` slot.
    ///
    /// # Errors
    ///
    /// [`PropertyError`] if the slot is absent or not a flag.
    pub fn boolean(&self, slot: &str) -> Result<bool, PropertyError> {
        let spec = PropSpec::Bool;
        match self.read(slot, &spec)? {
            Property::Bool(b) => Ok(*b),
            other => Err(wrong_kind(slot, &spec, other)),
        }
    }

    /// Reads a `PSOptional(PSString)` slot; an explicit absent value is `None`.
    ///
    /// # Errors
    ///
    /// [`PropertyError`] if the slot is absent or not an optional string.
    pub fn optional_string(&self, slot: &str) -> Result<Option<&'a str>, PropertyError> {
        let spec = PropSpec::optional(PropSpec::String);
        match self.read(slot, &spec)? {
            Property::Optional { value: None, .. } => Ok(None),
            Property::Optional {
                value: Some(inner), ..
            } => match inner.as_ref() {
                Property::String(s) => Ok(Some(s.as_str())),
                other => Err(wrong_kind(slot, &spec, other)),
            },
            other => Err(wrong_kind(slot, &spec, other)),
        }
    }

    /// Reads a `PSOptional(PSEnum(labels))` slot; an explicit absent value is `None`.
    ///
    /// # Errors
    ///
    /// [`PropertyError`] if the slot is absent or not an optional enum over `labels`.
    pub fn optional_enumeration(
        &self,
        slot: &str,
        labels: &[&str],
    ) -> Result<Option<&'a str>, PropertyError> {
        let spec = PropSpec::optional(PropSpec::enumeration(labels.iter().copied()));
        match self.read(slot, &spec)? {
            Property::Optional { value: None, .. } => Ok(None),
            Property::Optional {
                value: Some(inner), ..
            } => match inner.as_ref() {
                Property::Enum { value, .. } => Ok(Some(value.as_str())),
                other => Err(wrong_kind(slot, &spec, other)),
            },
            other => Err(wrong_kind(slot, &spec, other)),
        }
    }
}

fn wrong_kind(slot: &str, spec: &PropSpec, found: &Property) -> PropertyError {
    PropertyError::WrongKind {
        slot: slot.to_string(),
        spec: spec.clone(),
        found: found.spec(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn define_properties_infers_spec_from_set_values() {
        let (specs, values) = define_properties(&[], &[("x", Property::Bool(true))]);
        assert_eq!(specs.get("x"), Some(&PropSpec::Bool));
        assert_eq!(values.get("x"), Some(&Property::Bool(true)));
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn define_properties_required_slots_have_no_value() {
        let (specs, values) = define_properties(&[("y", PropSpec::String)], &[]);
        assert_eq!(specs.get("y"), Some(&PropSpec::String));
        assert!(values.is_empty());
    }

    #[test]
    fn present_value_wins_over_default() {
        let own: Properties = [("name", Property::String("own".into()))].into_iter().collect();
        let defaults: Properties =
            [("name", Property::String("default".into()))].into_iter().collect();
        let view = PropertyView::new(&own, &defaults);
        assert_eq!(view.string("name").unwrap(), "own");
    }

    #[test]
    fn absent_value_falls_back_to_default() {
        let own = Properties::new();
        let defaults: Properties = [("flag", Property::Bool(false))].into_iter().collect();
        assert!(!PropertyView::new(&own, &defaults).boolean("flag").unwrap());
    }

    #[test]
    fn absent_value_without_default_is_missing() {
        let empty = Properties::new();
        let err = PropertyView::new(&empty, &empty).qname("module").unwrap_err();
        assert_eq!(
            err,
            PropertyError::Missing {
                slot: "module".into(),
                spec: PropSpec::QName
            }
        );
    }

    #[test]
    fn wrong_kind_is_reported_with_both_specs() {
        let own: Properties = [("flag", Property::String("yes".into()))].into_iter().collect();
        let err = PropertyView::new(&own, &Properties::new())
            .boolean("flag")
            .unwrap_err();
        assert_eq!(
            err,
            PropertyError::WrongKind {
                slot: "flag".into(),
                spec: PropSpec::Bool,
                found: PropSpec::String
            }
        );
    }

    #[test]
    fn enum_from_other_label_set_is_wrong_kind() {
        let own: Properties = [("mode", Property::enumeration(["a", "b"], "a"))]
            .into_iter()
            .collect();
        let defaults = Properties::new();
        let view = PropertyView::new(&own, &defaults);
        assert_eq!(view.enumeration("mode", &["a", "b"]).unwrap(), "a");
        assert!(matches!(
            view.enumeration("mode", &["a", "c"]),
            Err(PropertyError::WrongKind { .. })
        ));
    }

    #[test]
    fn optional_accessors_return_none_for_explicit_absence() {
        let own: Properties = [
            ("doc", Property::none(PropSpec::String)),
            ("kind", Property::some(Property::enumeration(["x", "y"], "y"))),
        ]
        .into_iter()
        .collect();
        let defaults = Properties::new();
        let view = PropertyView::new(&own, &defaults);
        assert_eq!(view.optional_string("doc").unwrap(), None);
        assert_eq!(
            view.optional_enumeration("kind", &["x", "y"]).unwrap(),
            Some("y")
        );
    }

    #[test]
    fn optional_match_checks_inner_value() {
        let bad = Property::Optional {
            spec: PropSpec::String,
            value: Some(Box::new(Property::Bool(true))),
        };
        assert!(!bad.matches(&PropSpec::optional(PropSpec::String)));
        assert!(Property::qname("a.b").matches(&PropSpec::QName));
    }

    #[test]
    fn merge_from_is_last_write_wins() {
        let mut a: Properties = [("x", Property::Bool(true))].into_iter().collect();
        let b: Properties = [("x", Property::Bool(false))].into_iter().collect();
        a.merge_from(&b);
        assert_eq!(a.get("x"), Some(&Property::Bool(false)));
    }

    #[test]
    fn spec_display_is_readable() {
        let spec = PropSpec::optional(PropSpec::enumeration(["codec", "decoder"]));
        assert_eq!(spec.to_string(), "optional<enum{codec|decoder}>");
    }
}
