//! Per-processor default-properties records.
//!
//! A processor owns one (schema, default values) pair per node kind. The
//! pair for a kind describes which slots that processor expects on nodes of
//! that kind and what value an absent slot reads as.

use typegen_ir::model::{Declarable, TypeKind};
use typegen_ir::property::{PropSpecs, Properties};

/// The kinds of node that carry metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// The model itself.
    Top,
    /// Alias declarations.
    Alias,
    /// Sum declarations.
    Sum,
    /// Enum declarations.
    Enum,
    /// Restricted declarations.
    Restricted,
    /// Fields of products and constructors.
    Field,
    /// `Unit` type nodes.
    Unit,
    /// `Basic` type nodes.
    Basic,
    /// `Named` type nodes.
    Named,
    /// `Product` type nodes.
    Product,
    /// `EmptyProduct` type nodes.
    EmptyProduct,
    /// Container type nodes of any shape.
    Container,
    /// `Function` type nodes.
    Function,
}

impl NodeKind {
    /// Every node kind, in record order.
    pub const ALL: [NodeKind; 13] = [
        NodeKind::Top,
        NodeKind::Alias,
        NodeKind::Sum,
        NodeKind::Enum,
        NodeKind::Restricted,
        NodeKind::Field,
        NodeKind::Unit,
        NodeKind::Basic,
        NodeKind::Named,
        NodeKind::Product,
        NodeKind::EmptyProduct,
        NodeKind::Container,
        NodeKind::Function,
    ];

    /// Node kind of a declaration body.
    pub fn of_declaration<R>(declarable: &Declarable<R>) -> Self {
        match declarable {
            Declarable::Alias { .. } => NodeKind::Alias,
            Declarable::Sum { .. } => NodeKind::Sum,
            Declarable::Enum { .. } => NodeKind::Enum,
            Declarable::Restricted { .. } => NodeKind::Restricted,
        }
    }

    /// Node kind of a type node.
    pub fn of_type<R>(kind: &TypeKind<R>) -> Self {
        match kind {
            TypeKind::Unit => NodeKind::Unit,
            TypeKind::Basic(_) => NodeKind::Basic,
            TypeKind::Named { .. } => NodeKind::Named,
            TypeKind::Product(_) => NodeKind::Product,
            TypeKind::EmptyProduct => NodeKind::EmptyProduct,
            TypeKind::Container(_) => NodeKind::Container,
            TypeKind::Function { .. } => NodeKind::Function,
        }
    }
}

/// Schema and default values for one node kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeDefaults {
    /// Slots this processor checks on nodes of the kind.
    pub specs: PropSpecs,
    /// Values absent slots read as.
    pub values: Properties,
}

impl NodeDefaults {
    /// Adds `other`'s slots; `other` wins on overlap.
    pub fn merge_from(&mut self, other: &NodeDefaults) {
        for (slot, spec) in &other.specs {
            self.specs.insert(slot.clone(), spec.clone());
        }
        self.values.merge_from(&other.values);
    }
}

impl From<(PropSpecs, Properties)> for NodeDefaults {
    fn from((specs, values): (PropSpecs, Properties)) -> Self {
        Self { specs, values }
    }
}

/// A processor's full default-properties record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultProperties {
    /// Model-level slots.
    pub top: NodeDefaults,
    /// Alias declaration slots.
    pub alias: NodeDefaults,
    /// Sum declaration slots.
    pub sum: NodeDefaults,
    /// Enum declaration slots.
    pub enumeration: NodeDefaults,
    /// Restricted declaration slots.
    pub restricted: NodeDefaults,
    /// Field slots.
    pub fields: NodeDefaults,
    /// Unit type slots.
    pub unit: NodeDefaults,
    /// Basic type slots.
    pub basic: NodeDefaults,
    /// Named type slots.
    pub named: NodeDefaults,
    /// Product type slots.
    pub product: NodeDefaults,
    /// Empty product type slots.
    pub empty_product: NodeDefaults,
    /// Container type slots.
    pub container: NodeDefaults,
    /// Function type slots.
    pub function: NodeDefaults,
}

impl DefaultProperties {
    /// The sub-record for `kind`.
    pub fn get(&self, kind: NodeKind) -> &NodeDefaults {
        match kind {
            NodeKind::Top => &self.top,
            NodeKind::Alias => &self.alias,
            NodeKind::Sum => &self.sum,
            NodeKind::Enum => &self.enumeration,
            NodeKind::Restricted => &self.restricted,
            NodeKind::Field => &self.fields,
            NodeKind::Unit => &self.unit,
            NodeKind::Basic => &self.basic,
            NodeKind::Named => &self.named,
            NodeKind::Product => &self.product,
            NodeKind::EmptyProduct => &self.empty_product,
            NodeKind::Container => &self.container,
            NodeKind::Function => &self.function,
        }
    }

    /// Mutable sub-record for `kind`.
    pub fn get_mut(&mut self, kind: NodeKind) -> &mut NodeDefaults {
        match kind {
            NodeKind::Top => &mut self.top,
            NodeKind::Alias => &mut self.alias,
            NodeKind::Sum => &mut self.sum,
            NodeKind::Enum => &mut self.enumeration,
            NodeKind::Restricted => &mut self.restricted,
            NodeKind::Field => &mut self.fields,
            NodeKind::Unit => &mut self.unit,
            NodeKind::Basic => &mut self.basic,
            NodeKind::Named => &mut self.named,
            NodeKind::Product => &mut self.product,
            NodeKind::EmptyProduct => &mut self.empty_product,
            NodeKind::Container => &mut self.container,
            NodeKind::Function => &mut self.function,
        }
    }

    /// Sets the sub-record for each kind in `kinds`.
    #[must_use]
    pub fn with(mut self, kinds: &[NodeKind], defaults: impl Into<NodeDefaults>) -> Self {
        let defaults = defaults.into();
        for kind in kinds {
            *self.get_mut(*kind) = defaults.clone();
        }
        self
    }

    /// Unions several records into one, later records winning on overlap.
    pub fn merged<'a>(records: impl IntoIterator<Item = &'a DefaultProperties>) -> Self {
        let mut out = DefaultProperties::default();
        for record in records {
            for kind in NodeKind::ALL {
                out.get_mut(kind).merge_from(record.get(kind));
            }
        }
        out
    }
}
