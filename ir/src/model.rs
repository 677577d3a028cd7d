//! Type algebra for typegen models.
//!
//! The grammar is parameterized over the payload `R` carried by every
//! `Named` reference: [`Unresolved`] straight out of ingestion, and
//! [`Classification`] once the resolver has looked the name up. Every node
//! carries its own [`Properties`] and an opaque [`Position`].
//!
//! The three pipeline stages are [`UncheckedModel`], [`ClassifiedModel`] and
//! [`CheckedModel`]. Declarations are kept in a name-keyed table
//! ([`Declarations`]) so self- and mutually-recursive models need no owned
//! reference graph.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::property::Properties;

/// Source position of a node.
///
/// Threaded through for diagnostics only. Any two positions compare equal,
/// so node equality never depends on where a node was written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Position {
    /// Source file, when ingestion knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-based line, 0 when unknown.
    #[serde(default)]
    pub line: u32,
    /// 1-based column, 0 when unknown.
    #[serde(default)]
    pub column: u32,
}

impl Position {
    /// A position without a file.
    #[must_use]
    pub fn at(line: u32, column: u32) -> Self {
        Self {
            file: None,
            line,
            column,
        }
    }

    /// A position inside `file`.
    #[must_use]
    pub fn in_file(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: Some(file.into()),
            line,
            column,
        }
    }
}

impl PartialEq for Position {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Position {}

/// The closed set of basic scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Basic {
    /// Booleans.
    Bool,
    /// Signed integers.
    Int,
    /// Floating point numbers.
    Real,
    /// Unicode strings.
    String,
}

impl Basic {
    /// Returns the lowercase name used in diagnostics and listings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Basic::Bool => "bool",
            Basic::Int => "int",
            Basic::Real => "real",
            Basic::String => "string",
        }
    }
}

impl fmt::Display for Basic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container type constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container<T> {
    /// Ordered sequence.
    List(Box<T>),
    /// Unordered collection without duplicates.
    Set(Box<T>),
    /// Map from key type to value type.
    Dict(Box<T>, Box<T>),
    /// Value that may be absent.
    Optional(Box<T>),
}

/// Reference payload before resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unresolved;

/// What a resolved `Named` reference points at.
///
/// Container keys and cross-declaration calls special-case enumerations and
/// refined scalars, so the resolver records which one a name targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The target is an enumeration.
    Enum,
    /// The target is a refinement of the given basic scalar.
    Restricted(Basic),
    /// The target is an alias or a sum.
    None,
}

/// A named, typed member of a product or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field<R> {
    /// Field name, unique within its product or constructor.
    pub name: String,
    /// Field type.
    #[serde(rename = "type")]
    pub ty: Type<R>,
    /// Field metadata.
    #[serde(default)]
    pub properties: Properties,
    /// Where the field was written.
    #[serde(default)]
    pub position: Position,
}

impl<R> Field<R> {
    /// Creates a field with no metadata.
    pub fn new(name: impl Into<String>, ty: Type<R>) -> Self {
        Self {
            name: name.into(),
            ty,
            properties: Properties::default(),
            position: Position::default(),
        }
    }

    /// Replaces the field's metadata.
    #[must_use]
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    fn map_references<S, F>(&self, f: &mut F) -> Field<S>
    where
        F: FnMut(&str, &R, &Position) -> S,
    {
        Field {
            name: self.name.clone(),
            ty: self.ty.map_references(f),
            properties: self.properties.clone(),
            position: self.position.clone(),
        }
    }
}

/// The shape of a type node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind<R> {
    /// The unit type.
    Unit,
    /// A basic scalar.
    Basic(Basic),
    /// A reference to a top-level declaration.
    Named {
        /// Declaration name.
        name: String,
        /// Stage-specific payload.
        reference: R,
    },
    /// A non-empty record of uniquely named fields.
    Product(Vec<Field<R>>),
    /// The record with no fields.
    EmptyProduct,
    /// A container of other types.
    Container(Container<Type<R>>),
    /// A function type.
    Function {
        /// Argument type.
        argument: Box<Type<R>>,
        /// Result type.
        result: Box<Type<R>>,
    },
}

/// A type node: its shape, metadata and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Type<R> {
    /// Node shape.
    pub kind: TypeKind<R>,
    /// Node metadata.
    #[serde(default)]
    pub properties: Properties,
    /// Where the node was written.
    #[serde(default)]
    pub position: Position,
}

impl<R> Type<R> {
    /// Wraps a shape into a node with empty metadata.
    pub fn new(kind: TypeKind<R>) -> Self {
        Self {
            kind,
            properties: Properties::default(),
            position: Position::default(),
        }
    }

    /// Sets the node's position.
    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// The unit type.
    pub fn unit() -> Self {
        Self::new(TypeKind::Unit)
    }

    /// A basic scalar.
    pub fn basic(basic: Basic) -> Self {
        Self::new(TypeKind::Basic(basic))
    }

    /// A reference carrying an explicit payload.
    pub fn named_with(name: impl Into<String>, reference: R) -> Self {
        Self::new(TypeKind::Named {
            name: name.into(),
            reference,
        })
    }

    /// A record; an empty field list yields [`TypeKind::EmptyProduct`].
    pub fn product(fields: Vec<Field<R>>) -> Self {
        if fields.is_empty() {
            Self::new(TypeKind::EmptyProduct)
        } else {
            Self::new(TypeKind::Product(fields))
        }
    }

    /// `List(element)`.
    pub fn list(element: Type<R>) -> Self {
        Self::new(TypeKind::Container(Container::List(Box::new(element))))
    }

    /// `Set(element)`.
    pub fn set(element: Type<R>) -> Self {
        Self::new(TypeKind::Container(Container::Set(Box::new(element))))
    }

    /// `Dict(key, value)`.
    pub fn dict(key: Type<R>, value: Type<R>) -> Self {
        Self::new(TypeKind::Container(Container::Dict(
            Box::new(key),
            Box::new(value),
        )))
    }

    /// `Optional(element)`.
    pub fn optional(element: Type<R>) -> Self {
        Self::new(TypeKind::Container(Container::Optional(Box::new(element))))
    }

    /// `Function(argument, result)`.
    pub fn function(argument: Type<R>, result: Type<R>) -> Self {
        Self::new(TypeKind::Function {
            argument: Box::new(argument),
            result: Box::new(result),
        })
    }

    /// Rebuilds the tree with every `Named` payload replaced by `f(name, payload, position)`.
    pub fn map_references<S, F>(&self, f: &mut F) -> Type<S>
    where
        F: FnMut(&str, &R, &Position) -> S,
    {
        let kind = match &self.kind {
            TypeKind::Unit => TypeKind::Unit,
            TypeKind::Basic(basic) => TypeKind::Basic(*basic),
            TypeKind::Named { name, reference } => TypeKind::Named {
                name: name.clone(),
                reference: f(name, reference, &self.position),
            },
            TypeKind::Product(fields) => {
                TypeKind::Product(fields.iter().map(|fd| fd.map_references(f)).collect())
            }
            TypeKind::EmptyProduct => TypeKind::EmptyProduct,
            TypeKind::Container(container) => TypeKind::Container(match container {
                Container::List(t) => Container::List(Box::new(t.map_references(f))),
                Container::Set(t) => Container::Set(Box::new(t.map_references(f))),
                Container::Dict(k, v) => {
                    let k = k.map_references(f);
                    Container::Dict(Box::new(k), Box::new(v.map_references(f)))
                }
                Container::Optional(t) => Container::Optional(Box::new(t.map_references(f))),
            }),
            TypeKind::Function { argument, result } => {
                let argument = argument.map_references(f);
                TypeKind::Function {
                    argument: Box::new(argument),
                    result: Box::new(result.map_references(f)),
                }
            }
        };
        Type {
            kind,
            properties: self.properties.clone(),
            position: self.position.clone(),
        }
    }

    /// Calls `f` on every field of every product nested in this type.
    pub fn for_each_field_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Field<R>),
    {
        match &mut self.kind {
            TypeKind::Unit | TypeKind::Basic(_) | TypeKind::Named { .. } | TypeKind::EmptyProduct => {}
            TypeKind::Product(fields) => {
                for field in fields {
                    f(&mut *field);
                    field.ty.for_each_field_mut(f);
                }
            }
            TypeKind::Container(Container::Dict(k, v)) => {
                k.for_each_field_mut(f);
                v.for_each_field_mut(f);
            }
            TypeKind::Container(
                Container::List(t) | Container::Set(t) | Container::Optional(t),
            ) => t.for_each_field_mut(f),
            TypeKind::Function { argument, result } => {
                argument.for_each_field_mut(f);
                result.for_each_field_mut(f);
            }
        }
    }

    /// Calls `f` on this node and every nested node, parents first.
    pub fn walk<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Type<R>),
    {
        f(self);
        match &self.kind {
            TypeKind::Unit | TypeKind::Basic(_) | TypeKind::Named { .. } | TypeKind::EmptyProduct => {}
            TypeKind::Product(fields) => fields.iter().for_each(|fd| fd.ty.walk(f)),
            TypeKind::Container(Container::Dict(k, v)) => {
                k.walk(f);
                v.walk(f);
            }
            TypeKind::Container(
                Container::List(t) | Container::Set(t) | Container::Optional(t),
            ) => t.walk(f),
            TypeKind::Function { argument, result } => {
                argument.walk(f);
                result.walk(f);
            }
        }
    }
}

impl Type<Unresolved> {
    /// A reference awaiting resolution.
    pub fn named(name: impl Into<String>) -> Self {
        Self::named_with(name, Unresolved)
    }
}

/// Refinement of a basic scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Restriction {
    /// Integer bounds and bit width.
    Int(IntRestriction),
    /// String length bounds and pattern.
    String(StringRestriction),
}

impl Restriction {
    /// The scalar this restriction narrows.
    #[must_use]
    pub fn basic(&self) -> Basic {
        match self {
            Restriction::Int(_) => Basic::Int,
            Restriction::String(_) => Basic::String,
        }
    }
}

/// `RInt`: every bound is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRestriction {
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    /// Two's-complement bit width the value must fit in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

/// `RString`: every bound is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringRestriction {
    /// Minimum length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Pattern the whole string must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

/// One constructor of a sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "R: Deserialize<'de>"))]
pub struct Constructor<R> {
    /// Constructor name, unique within the sum.
    pub name: String,
    /// Constructor fields, possibly none.
    #[serde(default)]
    pub fields: Vec<Field<R>>,
    /// Where the constructor was written.
    #[serde(default)]
    pub position: Position,
}

impl<R> Constructor<R> {
    /// Creates a constructor.
    pub fn new(name: impl Into<String>, fields: Vec<Field<R>>) -> Self {
        Self {
            name: name.into(),
            fields,
            position: Position::default(),
        }
    }
}

/// The body of a top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declarable<R> {
    /// A name for a type.
    Alias {
        /// Aliased type.
        #[serde(rename = "type")]
        ty: Type<R>,
        /// Declaration metadata.
        #[serde(default)]
        properties: Properties,
    },
    /// A tagged union.
    Sum {
        /// Non-empty, uniquely named constructors.
        constructors: Vec<Constructor<R>>,
        /// Declaration metadata.
        #[serde(default)]
        properties: Properties,
    },
    /// A closed set of labels.
    Enum {
        /// Non-empty, unique labels.
        labels: Vec<String>,
        /// Declaration metadata.
        #[serde(default)]
        properties: Properties,
    },
    /// A refined scalar.
    Restricted {
        /// The refinement.
        restriction: Restriction,
        /// Declaration metadata.
        #[serde(default)]
        properties: Properties,
    },
}

/// Declaration variant, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    /// [`Declarable::Alias`].
    Alias,
    /// [`Declarable::Sum`].
    Sum,
    /// [`Declarable::Enum`].
    Enum,
    /// [`Declarable::Restricted`].
    Restricted,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeclarationKind::Alias => "alias",
            DeclarationKind::Sum => "sum",
            DeclarationKind::Enum => "enum",
            DeclarationKind::Restricted => "restricted",
        })
    }
}

impl<R> Declarable<R> {
    /// The declaration variant.
    pub fn kind(&self) -> DeclarationKind {
        match self {
            Declarable::Alias { .. } => DeclarationKind::Alias,
            Declarable::Sum { .. } => DeclarationKind::Sum,
            Declarable::Enum { .. } => DeclarationKind::Enum,
            Declarable::Restricted { .. } => DeclarationKind::Restricted,
        }
    }

    /// Declaration-level metadata.
    pub fn properties(&self) -> &Properties {
        match self {
            Declarable::Alias { properties, .. }
            | Declarable::Sum { properties, .. }
            | Declarable::Enum { properties, .. }
            | Declarable::Restricted { properties, .. } => properties,
        }
    }

    /// Mutable declaration-level metadata.
    pub fn properties_mut(&mut self) -> &mut Properties {
        match self {
            Declarable::Alias { properties, .. }
            | Declarable::Sum { properties, .. }
            | Declarable::Enum { properties, .. }
            | Declarable::Restricted { properties, .. } => properties,
        }
    }

    /// Calls `f` on every field in the body: constructor fields and the
    /// fields of nested products.
    pub fn for_each_field_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Field<R>),
    {
        match self {
            Declarable::Alias { ty, .. } => ty.for_each_field_mut(f),
            Declarable::Sum { constructors, .. } => {
                for field in constructors.iter_mut().flat_map(|c| c.fields.iter_mut()) {
                    f(&mut *field);
                    field.ty.for_each_field_mut(f);
                }
            }
            Declarable::Enum { .. } | Declarable::Restricted { .. } => {}
        }
    }

    /// Rebuilds the body with every `Named` payload replaced.
    pub fn map_references<S, F>(&self, f: &mut F) -> Declarable<S>
    where
        F: FnMut(&str, &R, &Position) -> S,
    {
        match self {
            Declarable::Alias { ty, properties } => Declarable::Alias {
                ty: ty.map_references(f),
                properties: properties.clone(),
            },
            Declarable::Sum {
                constructors,
                properties,
            } => Declarable::Sum {
                constructors: constructors
                    .iter()
                    .map(|c| Constructor {
                        name: c.name.clone(),
                        fields: c.fields.iter().map(|fd| fd.map_references(f)).collect(),
                        position: c.position.clone(),
                    })
                    .collect(),
                properties: properties.clone(),
            },
            Declarable::Enum { labels, properties } => Declarable::Enum {
                labels: labels.clone(),
                properties: properties.clone(),
            },
            Declarable::Restricted {
                restriction,
                properties,
            } => Declarable::Restricted {
                restriction: restriction.clone(),
                properties: properties.clone(),
            },
        }
    }
}

/// A named top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration<R> {
    /// Declaration name, unique within the model.
    pub name: String,
    /// Declaration body.
    #[serde(flatten)]
    pub body: Declarable<R>,
    /// Where the declaration was written.
    #[serde(default)]
    pub position: Position,
}

impl<R> Declaration<R> {
    /// Creates a declaration without a position.
    pub fn new(name: impl Into<String>, body: Declarable<R>) -> Self {
        Self {
            name: name.into(),
            body,
            position: Position::default(),
        }
    }
}

/// Name-keyed declaration table that remembers model order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declarations<R> {
    entries: Vec<Declaration<R>>,
    index: BTreeMap<String, usize>,
}

impl<R> Declarations<R> {
    /// Builds the table. Callers guarantee unique names; a repeated name
    /// shadows its earlier entry in lookups.
    pub(crate) fn from_ordered(entries: Vec<Declaration<R>>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        Self { entries, index }
    }

    /// Looks a declaration up by name.
    pub fn get(&self, name: &str) -> Option<&Declaration<R>> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Mutable lookup by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Declaration<R>> {
        match self.index.get(name) {
            Some(&i) => self.entries.get_mut(i),
            None => None,
        }
    }

    /// Returns true if `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declarations in model order.
    pub fn iter(&self) -> std::slice::Iter<'_, Declaration<R>> {
        self.entries.iter()
    }

    /// Mutable declarations in model order. Names cannot be changed through
    /// this iterator without desynchronizing lookups; processors only touch
    /// properties.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Declaration<R>> {
        self.entries.iter_mut()
    }

    /// Declaration names in model order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|d| d.name.as_str())
    }

    /// Number of declarations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a, R> IntoIterator for &'a Declarations<R> {
    type Item = &'a Declaration<R>;
    type IntoIter = std::slice::Iter<'a, Declaration<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Structural problems in an unchecked model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Two declarations share a name.
    #[error("duplicate declaration `{name}`")]
    DuplicateDeclaration {
        /// Repeated name.
        name: String,
        /// Position of the repeat.
        position: Position,
    },
    /// Two fields of one product or constructor share a name.
    #[error("duplicate field `{field}` in `{scope}`")]
    DuplicateField {
        /// Declaration or constructor owning the fields.
        scope: String,
        /// Repeated field name.
        field: String,
        /// Position of the repeat.
        position: Position,
    },
    /// Two constructors of one sum share a name.
    #[error("duplicate constructor `{constructor}` in `{declaration}`")]
    DuplicateConstructor {
        /// The sum.
        declaration: String,
        /// Repeated constructor.
        constructor: String,
        /// Position of the repeat.
        position: Position,
    },
    /// An enumeration repeats a label.
    #[error("duplicate label `{label}` in `{declaration}`")]
    DuplicateLabel {
        /// The enumeration.
        declaration: String,
        /// Repeated label.
        label: String,
        /// Position of the enumeration.
        position: Position,
    },
    /// A sum without constructors, an enumeration without labels, or a
    /// product without fields.
    #[error("`{declaration}` declares an empty {what}")]
    Empty {
        /// The offending declaration.
        declaration: String,
        /// `"sum"`, `"enum"` or `"product"`.
        what: &'static str,
        /// Position of the declaration, or of the product node.
        position: Position,
    },
}

/// Stage one: declarations as ingestion produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncheckedModel {
    declarations: Vec<Declaration<Unresolved>>,
}

impl UncheckedModel {
    /// Validates scoping rules and wraps the declarations.
    ///
    /// # Errors
    ///
    /// Returns every [`ModelError`] found; the check does not stop at the first.
    pub fn new(declarations: Vec<Declaration<Unresolved>>) -> Result<Self, Vec<ModelError>> {
        let mut errors = Vec::new();
        let mut seen = BTreeSet::new();
        for decl in &declarations {
            if !seen.insert(decl.name.as_str()) {
                errors.push(ModelError::DuplicateDeclaration {
                    name: decl.name.clone(),
                    position: decl.position.clone(),
                });
            }
            check_declaration(decl, &mut errors);
        }
        if errors.is_empty() {
            Ok(Self { declarations })
        } else {
            Err(errors)
        }
    }

    /// Declarations in model order.
    pub fn declarations(&self) -> &[Declaration<Unresolved>] {
        &self.declarations
    }
}

fn check_declaration<R>(decl: &Declaration<R>, errors: &mut Vec<ModelError>) {
    match &decl.body {
        Declarable::Alias { ty, .. } => check_type(&decl.name, ty, errors),
        Declarable::Sum { constructors, .. } => {
            if constructors.is_empty() {
                errors.push(ModelError::Empty {
                    declaration: decl.name.clone(),
                    what: "sum",
                    position: decl.position.clone(),
                });
            }
            let mut names = BTreeSet::new();
            for ctor in constructors {
                if !names.insert(ctor.name.as_str()) {
                    errors.push(ModelError::DuplicateConstructor {
                        declaration: decl.name.clone(),
                        constructor: ctor.name.clone(),
                        position: ctor.position.clone(),
                    });
                }
                let scope = format!("{}.{}", decl.name, ctor.name);
                check_fields(&scope, &ctor.fields, errors);
            }
        }
        Declarable::Enum { labels, .. } => {
            if labels.is_empty() {
                errors.push(ModelError::Empty {
                    declaration: decl.name.clone(),
                    what: "enum",
                    position: decl.position.clone(),
                });
            }
            let mut seen = BTreeSet::new();
            for label in labels {
                if !seen.insert(label.as_str()) {
                    errors.push(ModelError::DuplicateLabel {
                        declaration: decl.name.clone(),
                        label: label.clone(),
                        position: decl.position.clone(),
                    });
                }
            }
        }
        Declarable::Restricted { .. } => {}
    }
}

fn check_fields<R>(scope: &str, fields: &[Field<R>], errors: &mut Vec<ModelError>) {
    let mut names = BTreeSet::new();
    for field in fields {
        if !names.insert(field.name.as_str()) {
            errors.push(ModelError::DuplicateField {
                scope: scope.to_string(),
                field: field.name.clone(),
                position: field.position.clone(),
            });
        }
        check_type(scope, &field.ty, errors);
    }
}

fn check_type<R>(scope: &str, ty: &Type<R>, errors: &mut Vec<ModelError>) {
    ty.walk(&mut |node| {
        if let TypeKind::Product(fields) = &node.kind {
            if fields.is_empty() {
                errors.push(ModelError::Empty {
                    declaration: scope.to_string(),
                    what: "product",
                    position: node.position.clone(),
                });
            }
            let mut names = BTreeSet::new();
            for field in fields {
                if !names.insert(field.name.as_str()) {
                    errors.push(ModelError::DuplicateField {
                        scope: scope.to_string(),
                        field: field.name.clone(),
                        position: field.position.clone(),
                    });
                }
            }
        }
    });
}

/// Stage two: every reference looked up and classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedModel {
    /// Classified declarations.
    pub declarations: Declarations<Classification>,
}

/// Stage three: the model after a run of processors.
///
/// Every slot required by every processor that ran is present (on the node
/// or in that processor's defaults) and matches its spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedModel {
    /// Model-level metadata.
    pub properties: Properties,
    /// Classified declarations.
    pub declarations: Declarations<Classification>,
}

impl CheckedModel {
    /// The state processors start from: no top-level metadata yet.
    #[must_use]
    pub fn initial(model: ClassifiedModel) -> Self {
        Self {
            properties: Properties::default(),
            declarations: model.declarations,
        }
    }
}
