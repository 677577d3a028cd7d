//! Read-only typed accessors over a checked model's metadata.
//!
//! A [`PropertiesApi`] pairs a checked model with the merged defaults of
//! the processors that checked it. Every view it hands out reads the node's
//! own slots first and the matching default sub-record second.

use typegen_ir::model::{CheckedModel, Classification, Declarable, Field, Type};
use typegen_ir::property::PropertyView;

use crate::defaults::{DefaultProperties, NodeKind};

/// Scoped property views over one checked model.
#[derive(Debug, Clone, Copy)]
pub struct PropertiesApi<'a> {
    defaults: &'a DefaultProperties,
    model: &'a CheckedModel,
}

impl<'a> PropertiesApi<'a> {
    /// Builds the API over `model`, falling back to `defaults`.
    #[must_use]
    pub fn new(defaults: &'a DefaultProperties, model: &'a CheckedModel) -> Self {
        Self { defaults, model }
    }

    /// The model the views read.
    #[must_use]
    pub fn checked_model(&self) -> &'a CheckedModel {
        self.model
    }

    /// Model-level view.
    #[must_use]
    pub fn model(&self) -> PropertyView<'a> {
        PropertyView::new(&self.model.properties, &self.defaults.top.values)
    }

    /// View of one declaration; the default sub-record follows its variant.
    #[must_use]
    pub fn declaration(&self, declarable: &'a Declarable<Classification>) -> PropertyView<'a> {
        let record = self.defaults.get(NodeKind::of_declaration(declarable));
        PropertyView::new(declarable.properties(), &record.values)
    }

    /// View of one field of a product or constructor.
    #[must_use]
    pub fn field(&self, field: &'a Field<Classification>) -> PropertyView<'a> {
        PropertyView::new(&field.properties, &self.defaults.fields.values)
    }

    /// View of one type node.
    #[must_use]
    pub fn type_node(&self, ty: &'a Type<Classification>) -> PropertyView<'a> {
        let record = self.defaults.get(NodeKind::of_type(&ty.kind));
        PropertyView::new(&ty.properties, &record.values)
    }
}
