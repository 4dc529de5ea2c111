//! Typed field values held by a form instance

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// A validated field value.
///
/// Values only come out of the validator, so each one already satisfies
/// its field's type and rules.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Tuple(Vec<FieldValue>),
    List(Vec<FieldValue>),
    Dict(BTreeMap<String, FieldValue>),
    /// Discriminator tag
    Tag(String),
}

impl FieldValue {
    /// Converts back to the JSON wire representation
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Float(f) => {
                // Floats only come from JSON numbers, which are always finite.
                debug_assert!(f.is_finite(), "non-finite float in a validated form");
                Number::from_f64(*f).map_or(Value::Null, Value::Number)
            }
            FieldValue::String(s) | FieldValue::Tag(s) => Value::String(s.clone()),
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::Tuple(items) | FieldValue::List(items) => {
                Value::Array(items.iter().map(FieldValue::to_json).collect())
            }
            FieldValue::Dict(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) | FieldValue::Tag(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Tuple and list items
    pub fn as_items(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Tuple(items) | FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Number of items for strings, lists, tuples and dicts
    pub(crate) fn len(&self) -> Option<usize> {
        match self {
            FieldValue::String(s) => Some(s.chars().count()),
            FieldValue::Tuple(items) | FieldValue::List(items) => Some(items.len()),
            FieldValue::Dict(entries) => Some(entries.len()),
            _ => None,
        }
    }
}
