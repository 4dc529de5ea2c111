//! Column binding options and stored representations

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the column stores the serialized form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageFormat {
    /// Native JSON column
    #[default]
    Json,
    /// Text column holding encoded JSON
    Text,
}

/// Options fixed when a column is bound.
///
/// Deserializable so bindings can be declared in configuration; every field
/// falls back to its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOptions {
    /// Wrap loaded forms in a mutation tracker.
    ///
    /// Default is `false`: in-place edits are invisible to the owning record
    /// and only reassignment marks it modified.
    pub mutable: bool,

    /// Stored representation (default: native JSON)
    pub storage: StorageFormat,

    /// Whether the column may hold no form at all (default: false)
    pub nullable: bool,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self {
            mutable: false,
            storage: StorageFormat::Json,
            nullable: false,
        }
    }
}

impl ColumnOptions {
    /// Options for a tracked column
    pub fn mutable() -> Self {
        Self {
            mutable: true,
            ..Self::default()
        }
    }

    pub fn with_storage(mut self, storage: StorageFormat) -> Self {
        self.storage = storage;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// A column cell as held by storage
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// SQL NULL
    Null,
    /// Native JSON value
    Json(Value),
    /// Encoded JSON text
    Text(String),
}

impl StoredValue {
    pub fn is_null(&self) -> bool {
        matches!(self, StoredValue::Null | StoredValue::Json(Value::Null))
    }
}
