//! Mapped record types

use std::collections::BTreeMap;

use crate::column::ColumnBinding;
use crate::schema::{FormError, FormResult};

/// A record type mapped onto a table, with its bound form columns.
///
/// Several mappers may share one table, each binding its columns differently.
#[derive(Debug)]
pub struct Mapper {
    name: String,
    table: String,
    bindings: BTreeMap<String, ColumnBinding>,
}

impl Mapper {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            bindings: BTreeMap::new(),
        }
    }

    /// Registers a column binding. A column can be bound once.
    pub fn with_binding(mut self, binding: ColumnBinding) -> FormResult<Self> {
        if self.bindings.contains_key(binding.column()) {
            return Err(FormError::configuration(format!(
                "column '{}' of '{}' is already bound",
                binding.column(),
                self.name
            )));
        }
        self.bindings.insert(binding.column().to_string(), binding);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn binding(&self, column: &str) -> FormResult<&ColumnBinding> {
        self.bindings.get(column).ok_or_else(|| {
            FormError::configuration(format!(
                "column '{}' is not bound on '{}'",
                column, self.name
            ))
        })
    }

    pub fn bindings(&self) -> impl Iterator<Item = &ColumnBinding> {
        self.bindings.values()
    }
}
