//! Field validation
//!
//! Validation semantics:
//! - Raw values are checked against the field type, then the field rules
//! - Missing or null raw values fall back to the field default
//! - Missing required fields without a default fail
//! - Errors name the field path and the offending raw value
//!
//! Validation never mutates its input and is deterministic.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::errors::{FormError, FormResult};
use super::types::{FieldDef, FieldType, Rules};
use crate::form::FieldValue;

impl FieldDef {
    /// Validates one raw value against this field's type and rules.
    ///
    /// Defaults and requiredness are not applied; see [`validate_field`].
    pub fn validate(&self, raw: &Value) -> FormResult<FieldValue> {
        if self.is_discriminator() {
            return Err(FormError::configuration(format!(
                "discriminator '{}' is validated by its schema's tag",
                self.name
            )));
        }
        let value = validate_value(&self.field_type, raw, &self.name)?;
        check_rules(&self.rules, &value, raw, &self.name)?;
        Ok(value)
    }
}

/// Validates the raw input for one declared field of a schema.
///
/// `tag` is the owning schema's variant tag, used for the discriminator.
/// Returns `None` for an absent optional field.
pub(crate) fn validate_field(
    field: &FieldDef,
    tag: Option<&str>,
    raw: Option<&Value>,
) -> FormResult<Option<FieldValue>> {
    let path = field.name.as_str();

    if field.is_discriminator() {
        return validate_tag(path, tag, raw).map(Some);
    }

    let raw = match raw.filter(|v| !v.is_null()).or(field.default.as_ref()) {
        Some(raw) => raw,
        None if field.required => return Err(FormError::missing(path)),
        None => return Ok(None),
    };

    let value = validate_value(&field.field_type, raw, path)?;
    check_rules(&field.rules, &value, raw, path)?;
    Ok(Some(value))
}

/// The discriminator always carries the schema's own tag.
fn validate_tag(path: &str, tag: Option<&str>, raw: Option<&Value>) -> FormResult<FieldValue> {
    let tag = tag.ok_or_else(|| {
        FormError::configuration(format!(
            "discriminator '{}' belongs to an abstract schema and cannot be instantiated",
            path
        ))
    })?;

    match raw {
        None | Some(Value::Null) => Ok(FieldValue::Tag(tag.to_string())),
        Some(Value::String(s)) if s == tag => Ok(FieldValue::Tag(tag.to_string())),
        Some(other) => Err(FormError::invalid(path, other, format!("is not {}", tag))),
    }
}

/// Validates a value against a field type.
pub(crate) fn validate_value(ty: &FieldType, raw: &Value, path: &str) -> FormResult<FieldValue> {
    match ty {
        FieldType::Integer => match raw.as_i64() {
            Some(i) => Ok(FieldValue::Integer(i)),
            None if raw.is_u64() => Err(FormError::invalid(path, raw, "is out of range")),
            None => Err(FormError::invalid(path, raw, "is not an integer")),
        },
        FieldType::Float => raw
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| FormError::invalid(path, raw, "is not a float")),
        FieldType::String => raw
            .as_str()
            .map(|s| FieldValue::String(s.to_string()))
            .ok_or_else(|| FormError::invalid(path, raw, "is not a string")),
        FieldType::Boolean => match raw {
            Value::Bool(b) => Ok(FieldValue::Boolean(*b)),
            Value::Number(n) if n.as_i64() == Some(0) => Ok(FieldValue::Boolean(false)),
            Value::Number(n) if n.as_i64() == Some(1) => Ok(FieldValue::Boolean(true)),
            _ => Err(FormError::invalid(path, raw, "is not a boolean")),
        },
        FieldType::Tuple { items } => {
            let arr = raw
                .as_array()
                .ok_or_else(|| FormError::invalid(path, raw, "is not a tuple"))?;
            if arr.len() != items.len() {
                return Err(FormError::invalid(
                    path,
                    raw,
                    format!("does not have {} items", items.len()),
                ));
            }
            items
                .iter()
                .zip(arr)
                .enumerate()
                .map(|(i, (item_type, elem))| validate_value(item_type, elem, &index_path(path, i)))
                .collect::<FormResult<Vec<_>>>()
                .map(FieldValue::Tuple)
        }
        FieldType::List { item } => {
            let arr = raw
                .as_array()
                .ok_or_else(|| FormError::invalid(path, raw, "is not a list"))?;
            arr.iter()
                .enumerate()
                .map(|(i, elem)| validate_value(item, elem, &index_path(path, i)))
                .collect::<FormResult<Vec<_>>>()
                .map(FieldValue::List)
        }
        FieldType::Dict { key, value } => {
            let obj = raw
                .as_object()
                .ok_or_else(|| FormError::invalid(path, raw, "is not a dict"))?;
            let mut entries = BTreeMap::new();
            for (k, v) in obj {
                let entry_path = make_path(path, k);
                validate_value(key, &Value::String(k.clone()), &entry_path)?;
                entries.insert(k.clone(), validate_value(value, v, &entry_path)?);
            }
            Ok(FieldValue::Dict(entries))
        }
        FieldType::Type => Err(FormError::configuration(format!(
            "'{}' nests a type discriminator",
            path
        ))),
    }
}

/// Checks the field rules against an already type-checked value.
pub(crate) fn check_rules(rules: &Rules, value: &FieldValue, raw: &Value, path: &str) -> FormResult<()> {
    let bound_order = |bound: f64| match value {
        FieldValue::Integer(i) => compare_int(*i, bound),
        FieldValue::Float(f) => f.partial_cmp(&bound),
        _ => None,
    };
    if let Some(min) = rules.min {
        if bound_order(min) == Some(Ordering::Less) {
            return Err(FormError::invalid(path, raw, format!("is less than {}", min)));
        }
    }
    if let Some(max) = rules.max {
        if bound_order(max) == Some(Ordering::Greater) {
            return Err(FormError::invalid(path, raw, format!("is greater than {}", max)));
        }
    }

    if let Some(len) = value.len() {
        check_length(rules, len, raw, path)?;
    }

    if let (Some(choices), Some(s)) = (&rules.choices, value.as_str()) {
        if !choices.iter().any(|c| c == s) {
            return Err(FormError::invalid(
                path,
                raw,
                format!("is not one of {}", choices.join(", ")),
            ));
        }
    }

    Ok(())
}

/// Checks length bounds; also used before in-place container edits.
pub(crate) fn check_length(rules: &Rules, len: usize, raw: &Value, path: &str) -> FormResult<()> {
    if let Some(min) = rules.min_length {
        if len < min {
            return Err(FormError::invalid(path, raw, format!("is shorter than {}", min)));
        }
    }
    if let Some(max) = rules.max_length {
        if len > max {
            return Err(FormError::invalid(path, raw, format!("is longer than {}", max)));
        }
    }
    Ok(())
}

/// Orders an integer against a float bound without rounding the integer.
fn compare_int(i: i64, bound: f64) -> Option<Ordering> {
    // 2^63: the first float above every i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if bound.is_nan() {
        return None;
    }
    if bound >= LIMIT {
        return Some(Ordering::Less);
    }
    if bound < -LIMIT {
        return Some(Ordering::Greater);
    }
    let floor = bound.floor();
    match i.cmp(&(floor as i64)) {
        Ordering::Equal if bound > floor => Some(Ordering::Less),
        ord => Some(ord),
    }
}

/// Creates a field path from prefix and key.
pub(crate) fn make_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Creates an element path for sequence items.
pub(crate) fn index_path(prefix: &str, index: usize) -> String {
    format!("{}[{}]", prefix, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(result: FormResult<impl std::fmt::Debug>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn test_integer_rejects_array() {
        let field = FieldDef::integer("a");
        assert_eq!(
            message(validate_field(&field, None, Some(&json!([])))),
            "a - \"[]\" is not an integer"
        );
    }

    #[test]
    fn test_integer_rejects_float() {
        let field = FieldDef::integer("a");
        assert!(validate_field(&field, None, Some(&json!(1.5))).is_err());
        assert_eq!(
            validate_field(&field, None, Some(&json!(7))).unwrap(),
            Some(FieldValue::Integer(7))
        );
    }

    #[test]
    fn test_integer_out_of_range() {
        let field = FieldDef::integer("a");
        let err = validate_field(&field, None, Some(&json!(u64::MAX))).unwrap_err();
        assert!(err.to_string().contains("is out of range"));
    }

    #[test]
    fn test_float_accepts_integers() {
        let field = FieldDef::float("b");
        assert_eq!(
            validate_field(&field, None, Some(&json!(100))).unwrap(),
            Some(FieldValue::Float(100.0))
        );
    }

    #[test]
    fn test_missing_required_field() {
        let field = FieldDef::integer("a");
        assert_eq!(message(validate_field(&field, None, None)), "a - missing");
        assert_eq!(message(validate_field(&field, None, Some(&Value::Null))), "a - missing");
    }

    #[test]
    fn test_missing_field_uses_default() {
        let field = FieldDef::float("b").with_default(json!(121.12));
        assert_eq!(
            validate_field(&field, None, None).unwrap(),
            Some(FieldValue::Float(121.12))
        );
    }

    #[test]
    fn test_missing_optional_field_is_absent() {
        let field = FieldDef::string("note").optional();
        assert_eq!(validate_field(&field, None, None).unwrap(), None);
    }

    #[test]
    fn test_boolean_accepts_zero_and_one() {
        let field = FieldDef::boolean("flag");
        assert_eq!(
            validate_field(&field, None, Some(&json!(1))).unwrap(),
            Some(FieldValue::Boolean(true))
        );
        assert_eq!(
            validate_field(&field, None, Some(&json!(0))).unwrap(),
            Some(FieldValue::Boolean(false))
        );
        assert!(validate_field(&field, None, Some(&json!(2))).is_err());
    }

    #[test]
    fn test_tuple_element_path() {
        let field = FieldDef::tuple("c", vec![FieldType::String, FieldType::Boolean]);
        assert_eq!(
            message(validate_field(&field, None, Some(&json!(["a", "b"])))),
            "c[1] - \"b\" is not a boolean"
        );
        assert_eq!(
            message(validate_field(&field, None, Some(&json!(["a"])))),
            "c - \"[\"a\"]\" does not have 2 items"
        );
    }

    #[test]
    fn test_dict_entry_path() {
        let field = FieldDef::dict("d", FieldType::String, FieldType::String);
        assert_eq!(
            message(validate_field(&field, None, Some(&json!({"a": 1})))),
            "d.a - \"1\" is not a string"
        );
    }

    #[test]
    fn test_list_items_validated() {
        let field = FieldDef::list("tags", FieldType::String);
        assert_eq!(
            message(validate_field(&field, None, Some(&json!(["x", null])))),
            "tags[1] - \"null\" is not a string"
        );
    }

    #[test]
    fn test_numeric_bounds() {
        let field = FieldDef::integer("age").min(0.0).max(150.0);
        assert!(validate_field(&field, None, Some(&json!(30))).is_ok());
        assert_eq!(
            message(validate_field(&field, None, Some(&json!(-1)))),
            "age - \"-1\" is less than 0"
        );
        assert_eq!(
            message(validate_field(&field, None, Some(&json!(151)))),
            "age - \"151\" is greater than 150"
        );
    }

    #[test]
    fn test_length_bounds_and_choices() {
        let field = FieldDef::string("code").min_length(2).max_length(3);
        assert!(validate_field(&field, None, Some(&json!("ab"))).is_ok());
        assert!(message(validate_field(&field, None, Some(&json!("a")))).contains("is shorter than 2"));
        assert!(message(validate_field(&field, None, Some(&json!("abcd")))).contains("is longer than 3"));

        let field = FieldDef::string("color").choices(["red", "blue"]);
        assert!(validate_field(&field, None, Some(&json!("red"))).is_ok());
        assert_eq!(
            message(validate_field(&field, None, Some(&json!("green")))),
            "color - \"green\" is not one of red, blue"
        );
    }

    #[test]
    fn test_discriminator_filled_from_tag() {
        let field = FieldDef::new("_type_", FieldType::Type);
        assert_eq!(
            validate_field(&field, Some("a.c.v1"), None).unwrap(),
            Some(FieldValue::Tag("a.c.v1".into()))
        );
        assert_eq!(
            message(validate_field(&field, Some("a.c.v1"), Some(&json!("a.b.v1")))),
            "_type_ - \"a.b.v1\" is not a.c.v1"
        );
        assert!(validate_field(&field, None, None).unwrap_err().is_configuration());
    }

    #[test]
    fn test_field_def_validate_ignores_default() {
        let field = FieldDef::float("b").with_default(json!(1.0));
        assert_eq!(field.validate(&json!(2.5)).unwrap(), FieldValue::Float(2.5));
        assert!(field.validate(&Value::Null).is_err());
    }

    #[test]
    fn test_integer_bounds_compared_exactly() {
        // 2^53 + 1 rounds down to 2^53 as a float.
        let max = 9_007_199_254_740_992.0;
        let field = FieldDef::integer("n").max(max);
        assert!(field.validate(&json!(9_007_199_254_740_992_i64)).is_ok());
        let err = field.validate(&json!(9_007_199_254_740_993_i64)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "n - \"9007199254740993\" is greater than 9007199254740992"
        );

        let field = FieldDef::integer("n").min(-9_007_199_254_740_992.0);
        assert!(field.validate(&json!(-9_007_199_254_740_993_i64)).is_err());

        let field = FieldDef::integer("n").min(0.5).max(1.5);
        assert!(field.validate(&json!(0)).is_err());
        assert!(field.validate(&json!(1)).is_ok());
        assert!(field.validate(&json!(2)).is_err());

        let field = FieldDef::integer("n").max(1e19);
        assert!(field.validate(&json!(i64::MAX)).is_ok());
    }
}
