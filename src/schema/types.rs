//! Schema type definitions
//!
//! Supported field types:
//! - integer: 64-bit signed integer
//! - float: 64-bit floating point (integers accepted)
//! - string: UTF-8 string
//! - boolean: JSON boolean, or the integers 0 and 1
//! - tuple: fixed-length array of heterogeneous element types
//! - list: homogeneous array
//! - dict: object with string keys and homogeneous values
//! - type: the discriminator of an abstract schema family

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use super::errors::{FormError, FormResult};
use super::validator;

/// Supported field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Float,
    String,
    Boolean,
    /// Fixed-length array, one type per position
    Tuple {
        items: Vec<FieldType>,
    },
    /// Homogeneous array
    List {
        item: Box<FieldType>,
    },
    /// Object with validated keys and values
    Dict {
        key: Box<FieldType>,
        value: Box<FieldType>,
    },
    /// Discriminator carrying a variant tag
    Type,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Tuple { .. } => "tuple",
            FieldType::List { .. } => "list",
            FieldType::Dict { .. } => "dict",
            FieldType::Type => "type",
        }
    }

    pub fn tuple(items: Vec<FieldType>) -> Self {
        FieldType::Tuple { items }
    }

    pub fn list(item: FieldType) -> Self {
        FieldType::List {
            item: Box::new(item),
        }
    }

    pub fn dict(key: FieldType, value: FieldType) -> Self {
        FieldType::Dict {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Checks the type is well formed when nested inside a field.
    fn check_nested(&self, field: &str, top_level: bool) -> FormResult<()> {
        match self {
            FieldType::Type if !top_level => Err(FormError::configuration(format!(
                "field '{}' nests a type discriminator inside a container",
                field
            ))),
            FieldType::Tuple { items } => {
                if items.is_empty() {
                    return Err(FormError::configuration(format!(
                        "tuple field '{}' declares no items",
                        field
                    )));
                }
                items.iter().try_for_each(|t| t.check_nested(field, false))
            }
            FieldType::List { item } => item.check_nested(field, false),
            FieldType::Dict { key, value } => {
                if **key != FieldType::String {
                    return Err(FormError::configuration(format!(
                        "dict field '{}' must use string keys, not {}",
                        field,
                        key.type_name()
                    )));
                }
                value.check_nested(field, false)
            }
            _ => Ok(()),
        }
    }
}

/// Validation rules attached to a field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rules {
    /// Inclusive lower bound for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive upper bound for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Minimum length of strings, lists and dicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum length of strings, lists and dicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Allowed values for string fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

impl Rules {
    pub fn is_empty(&self) -> bool {
        *self == Rules::default()
    }
}

fn default_required() -> bool {
    true
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name, also the JSON key
    pub name: String,
    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether the field must be present (after defaulting)
    #[serde(default = "default_required")]
    pub required: bool,
    /// Raw default, validated like any input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Rules::is_empty")]
    pub rules: Rules,
}

impl FieldDef {
    /// Create a required field of the given type
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            default: None,
            rules: Rules::default(),
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn tuple(name: impl Into<String>, items: Vec<FieldType>) -> Self {
        Self::new(name, FieldType::tuple(items))
    }

    pub fn list(name: impl Into<String>, item: FieldType) -> Self {
        Self::new(name, FieldType::list(item))
    }

    pub fn dict(name: impl Into<String>, key: FieldType, value: FieldType) -> Self {
        Self::new(name, FieldType::dict(key, value))
    }

    /// Mark the field optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Attach a default used when the field is omitted
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.rules.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.rules.max = Some(max);
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.rules.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.rules.max_length = Some(len);
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_discriminator(&self) -> bool {
        self.field_type == FieldType::Type
    }
}

/// Whether a schema can be instantiated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Instantiable schema
    Concrete,
    /// Shared fields of a family; never instantiated
    Abstract,
}

/// Complete schema definition
///
/// Fields are kept in declaration order; inherited fields come first.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    kind: SchemaKind,
    fields: Vec<FieldDef>,
    /// Discriminator field name (abstract schemas and their variants)
    discriminator: Option<String>,
    /// Variant tag (variants only)
    tag: Option<String>,
    /// Abstract parent name (variants only)
    parent: Option<String>,
}

impl Schema {
    /// Start a concrete, non-polymorphic schema
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            kind: SchemaKind::Concrete,
            fields: Vec::new(),
            discriminator: None,
            tag: None,
            parent: None,
        }
    }

    /// Start an abstract schema whose variants are told apart by `discriminator`.
    ///
    /// The discriminator is declared as the first field.
    pub fn abstract_builder(name: impl Into<String>, discriminator: impl Into<String>) -> SchemaBuilder {
        let discriminator = discriminator.into();
        SchemaBuilder {
            name: name.into(),
            kind: SchemaKind::Abstract,
            fields: vec![FieldDef::new(discriminator.clone(), FieldType::Type)],
            discriminator: Some(discriminator),
            tag: None,
            parent: None,
        }
    }

    /// Start a concrete variant extending `parent` and owning `tag`.
    pub fn variant_of(parent: &Schema, name: impl Into<String>, tag: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            kind: SchemaKind::Concrete,
            fields: parent.fields.clone(),
            discriminator: parent.discriminator.clone(),
            tag: Some(tag.into()),
            parent: Some(parent.name.clone()).filter(|_| parent.is_abstract()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    pub fn is_abstract(&self) -> bool {
        self.kind == SchemaKind::Abstract
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Validates the schema structure itself (not a document)
    pub fn validate_structure(&self) -> FormResult<()> {
        if self.name.is_empty() {
            return Err(FormError::configuration("schema name must not be empty"));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(FormError::configuration(format!(
                    "schema '{}' declares field '{}' twice",
                    self.name, field.name
                )));
            }
            field.field_type.check_nested(&field.name, true)?;
        }

        let discriminators: Vec<&FieldDef> =
            self.fields.iter().filter(|f| f.is_discriminator()).collect();
        match (&self.discriminator, discriminators.as_slice()) {
            (None, []) => {}
            (Some(name), [field]) if field.name == *name => {}
            _ => {
                return Err(FormError::configuration(format!(
                    "schema '{}' must declare exactly one discriminator when polymorphic, and none otherwise",
                    self.name
                )))
            }
        }

        match (self.kind, &self.discriminator, &self.tag) {
            (SchemaKind::Abstract, Some(_), None) => {}
            (SchemaKind::Concrete, None, None) => {}
            (SchemaKind::Concrete, Some(_), Some(tag)) if !tag.is_empty() && self.parent.is_some() => {}
            _ => {
                return Err(FormError::configuration(format!(
                    "schema '{}' must extend an abstract schema and own a non-empty tag to be a variant",
                    self.name
                )))
            }
        }

        for field in &self.fields {
            if let Some(default) = &field.default {
                if field.is_discriminator() {
                    return Err(FormError::configuration(format!(
                        "discriminator '{}' cannot declare a default",
                        field.name
                    )));
                }
                validator::validate_field(field, None, Some(default)).map_err(|e| {
                    FormError::configuration(format!(
                        "schema '{}' has an invalid default: {}",
                        self.name, e
                    ))
                })?;
            }
        }

        Ok(())
    }
}

/// Builder for [`Schema`]
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    kind: SchemaKind,
    fields: Vec<FieldDef>,
    discriminator: Option<String>,
    tag: Option<String>,
    parent: Option<String>,
}

impl SchemaBuilder {
    /// Append a field after all previously declared ones
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Validates the structure and freezes the schema.
    pub fn build(self) -> FormResult<Arc<Schema>> {
        let schema = Schema {
            name: self.name,
            kind: self.kind,
            fields: self.fields,
            discriminator: self.discriminator,
            tag: self.tag,
            parent: self.parent,
        };
        schema.validate_structure()?;
        Ok(Arc::new(schema))
    }
}
