//! Abstract schema families
//!
//! A family is a closed set of concrete variants sharing one abstract base.
//! Each variant owns a unique discriminator tag.

use std::sync::Arc;

use tracing::trace;

use super::errors::{FormError, FormResult};
use super::types::Schema;

/// An abstract schema and its registered concrete variants.
#[derive(Debug, Clone)]
pub struct SchemaFamily {
    base: Arc<Schema>,
    variants: Vec<Arc<Schema>>,
}

impl SchemaFamily {
    /// Creates an empty family over an abstract base schema.
    pub fn new(base: Arc<Schema>) -> FormResult<Self> {
        if !base.is_abstract() {
            return Err(FormError::configuration(format!(
                "schema '{}' is not abstract and cannot root a family",
                base.name()
            )));
        }
        Ok(Self {
            base,
            variants: Vec::new(),
        })
    }

    /// Registers a concrete variant.
    ///
    /// Fails if the variant does not extend this family's base, or if its tag
    /// or name is already taken.
    pub fn register(&mut self, variant: Arc<Schema>) -> FormResult<()> {
        if variant.parent() != Some(self.base.name()) {
            return Err(FormError::configuration(format!(
                "schema '{}' does not extend '{}'",
                variant.name(),
                self.base.name()
            )));
        }
        let tag = variant.tag().unwrap_or_default();
        if let Some(existing) = self.variant_by_tag(tag) {
            return Err(FormError::configuration(format!(
                "tag '{}' of '{}' collides with '{}' in family '{}'",
                tag,
                variant.name(),
                existing.name(),
                self.base.name()
            )));
        }
        if self.variant_by_name(variant.name()).is_some() {
            return Err(FormError::configuration(format!(
                "variant '{}' registered twice in family '{}'",
                variant.name(),
                self.base.name()
            )));
        }

        trace!(family = self.base.name(), variant = variant.name(), tag, "variant registered");
        self.variants.push(variant);
        Ok(())
    }

    /// Chaining form of [`SchemaFamily::register`].
    pub fn with_variant(mut self, variant: Arc<Schema>) -> FormResult<Self> {
        self.register(variant)?;
        Ok(self)
    }

    /// Checks the family can be bound: at least one variant, unique tags.
    pub fn check(&self) -> FormResult<()> {
        if self.variants.is_empty() {
            return Err(FormError::configuration(format!(
                "family '{}' has no registered variants",
                self.base.name()
            )));
        }
        for (i, variant) in self.variants.iter().enumerate() {
            if self.variants[..i].iter().any(|v| v.tag() == variant.tag()) {
                return Err(FormError::configuration(format!(
                    "tag '{}' is declared twice in family '{}'",
                    variant.tag().unwrap_or_default(),
                    self.base.name()
                )));
            }
        }
        Ok(())
    }

    pub fn base(&self) -> &Arc<Schema> {
        &self.base
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    /// The discriminator field name shared by all variants
    pub fn discriminator(&self) -> &str {
        self.base.discriminator().unwrap_or_default()
    }

    pub fn variants(&self) -> &[Arc<Schema>] {
        &self.variants
    }

    pub fn variant_by_tag(&self, tag: &str) -> Option<&Arc<Schema>> {
        self.variants.iter().find(|v| v.tag() == Some(tag))
    }

    pub fn variant_by_name(&self, name: &str) -> Option<&Arc<Schema>> {
        self.variants.iter().find(|v| v.name() == name)
    }
}
