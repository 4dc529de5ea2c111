//! Validated form instances

use serde_json::{Map, Value};
use std::sync::Arc;

use super::value::FieldValue;
use crate::codec::FormCodec;
use crate::schema::{validate_field, FieldDef, FormError, FormResult, Schema};

/// A validated in-memory document conforming to one concrete schema.
///
/// Every assignment goes through field validation, so a `Form` is valid at
/// all times.
#[derive(Debug, Clone)]
pub struct Form {
    schema: Arc<Schema>,
    /// One slot per schema field, in declaration order; `None` for absent optional fields
    values: Vec<Option<FieldValue>>,
}

impl Form {
    /// Validates `raw` against a concrete schema.
    pub fn new(schema: &Arc<Schema>, raw: &Value) -> FormResult<Self> {
        FormCodec::new(Arc::clone(schema))?.deserialize(raw)
    }

    pub(crate) fn from_values(schema: Arc<Schema>, values: Vec<Option<FieldValue>>) -> Self {
        debug_assert_eq!(schema.fields().len(), values.len());
        Self { schema, values }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn schema_name(&self) -> &str {
        self.schema.name()
    }

    /// The variant tag, for members of a polymorphic family
    pub fn tag(&self) -> Option<&str> {
        self.schema.tag()
    }

    /// True for the form's own schema and for the abstract schema it extends.
    pub fn is_instance_of(&self, schema: &Schema) -> bool {
        self.schema.name() == schema.name() || self.schema.parent() == Some(schema.name())
    }

    /// True when the form was built from `schema` itself or from a
    /// structurally identical one. A name match alone is not enough.
    pub fn conforms_to(&self, schema: &Arc<Schema>) -> bool {
        Arc::ptr_eq(&self.schema, schema) || *self.schema == **schema
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema
            .field_index(name)
            .and_then(|idx| self.values[idx].as_ref())
    }

    /// Iterates fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&FieldValue>)> {
        self.schema
            .fields()
            .iter()
            .zip(&self.values)
            .map(|(def, value)| (def.name.as_str(), value.as_ref()))
    }

    /// Validates and assigns one field. The form is unchanged on failure.
    ///
    /// `null` clears an optional field or restores a default.
    pub fn set(&mut self, name: &str, raw: Value) -> FormResult<()> {
        let idx = self.index_of(name)?;
        let value = validate_field(&self.schema.fields()[idx], self.schema.tag(), Some(&raw))?;
        self.values[idx] = value;
        Ok(())
    }

    /// Clears an optional field, or restores the default of a defaulted one.
    pub fn clear(&mut self, name: &str) -> FormResult<()> {
        self.set(name, Value::Null)
    }

    /// The JSON object for this form: every declared field, absent ones as `null`.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    value.map_or(Value::Null, FieldValue::to_json),
                )
            })
            .collect();
        Value::Object(map)
    }

    /// Field definition and value slot, for in-place container edits.
    pub(crate) fn field_slot(&mut self, name: &str) -> FormResult<(&FieldDef, &mut Option<FieldValue>)> {
        let idx = self.index_of(name)?;
        Ok((&self.schema.fields()[idx], &mut self.values[idx]))
    }

    fn index_of(&self, name: &str) -> FormResult<usize> {
        self.schema.field_index(name).ok_or_else(|| {
            FormError::validation(name, format!("is not a field of {}", self.schema.name()))
        })
    }
}

impl PartialEq for Form {
    fn eq(&self, other: &Self) -> bool {
        self.conforms_to(&other.schema) && self.values == other.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Schema::builder("Form")
            .field(FieldDef::integer("a"))
            .field(FieldDef::float("b").with_default(json!(121.12)))
            .field(FieldDef::string("note").optional())
            .field(FieldDef::dict("d", FieldType::String, FieldType::String))
            .build()
            .unwrap()
    }

    #[test]
    fn test_set_validates() {
        let mut form = Form::new(&schema(), &json!({"a": 1, "d": {}})).unwrap();
        form.set("a", json!(321)).unwrap();
        assert_eq!(form.get("a"), Some(&FieldValue::Integer(321)));

        let err = form.set("a", json!([])).unwrap_err();
        assert_eq!(err.to_string(), "a - \"[]\" is not an integer");
        assert_eq!(form.get("a"), Some(&FieldValue::Integer(321)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut form = Form::new(&schema(), &json!({"a": 1, "d": {}})).unwrap();
        let err = form.set("zzz", json!(1)).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("is not a field of Form"));
    }

    #[test]
    fn test_clear_restores_default_or_absence() {
        let mut form = Form::new(&schema(), &json!({"a": 1, "b": 3.5, "note": "x", "d": {}})).unwrap();
        form.clear("b").unwrap();
        assert_eq!(form.get("b"), Some(&FieldValue::Float(121.12)));
        form.clear("note").unwrap();
        assert_eq!(form.get("note"), None);
        assert!(form.clear("a").is_err());
    }

    #[test]
    fn test_to_json_includes_every_field() {
        let form = Form::new(&schema(), &json!({"a": 1, "d": {"k": "v"}})).unwrap();
        assert_eq!(
            form.to_json(),
            json!({"a": 1, "b": 121.12, "note": null, "d": {"k": "v"}})
        );
    }

    #[test]
    fn test_equality_by_schema_and_values() {
        let s = schema();
        let a = Form::new(&s, &json!({"a": 1, "d": {}})).unwrap();
        let b = Form::new(&s, &json!({"a": 1, "b": 121.12, "d": {}})).unwrap();
        let c = Form::new(&s, &json!({"a": 2, "d": {}})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
