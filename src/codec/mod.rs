//! Form codec
//!
//! Converts between raw JSON and validated forms for one concrete schema.
//!
//! - `serialize` emits every declared field, defaults included
//! - `deserialize` validates fields in declaration order and stops at the
//!   first failure
//! - Unknown keys in raw input are ignored

use serde_json::Value;
use std::sync::Arc;

use crate::form::Form;
use crate::schema::{validate_field, FormError, FormResult, Schema};

/// Validate + (de)serialize transform bound to one concrete schema.
#[derive(Debug, Clone)]
pub struct FormCodec {
    schema: Arc<Schema>,
}

impl FormCodec {
    /// Creates a codec. Abstract schemas cannot be instantiated.
    pub fn new(schema: Arc<Schema>) -> FormResult<Self> {
        if schema.is_abstract() {
            return Err(FormError::configuration(format!(
                "abstract schema '{}' cannot be instantiated",
                schema.name()
            )));
        }
        Ok(Self { schema })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Checks the form was built from this codec's schema.
    pub fn accept(&self, form: &Form) -> FormResult<()> {
        if form.conforms_to(&self.schema) {
            return Ok(());
        }
        let reason = if form.schema_name() == self.schema.name() {
            format!("{} does not match the declared {}", form.schema_name(), self.schema.name())
        } else {
            format!("{} is not a {}", form.schema_name(), self.schema.name())
        };
        Err(FormError::validation("$root", reason))
    }

    /// Serializes a form of this codec's schema to its JSON object.
    pub fn serialize(&self, form: &Form) -> FormResult<Value> {
        self.accept(form)?;
        Ok(form.to_json())
    }

    /// Validates a raw JSON object into a form.
    pub fn deserialize(&self, raw: &Value) -> FormResult<Form> {
        let obj = raw
            .as_object()
            .ok_or_else(|| FormError::invalid("$root", raw, "is not an object"))?;

        let values = self
            .schema
            .fields()
            .iter()
            .map(|field| validate_field(field, self.schema.tag(), obj.get(&field.name)))
            .collect::<FormResult<Vec<_>>>()?;

        Ok(Form::from_values(Arc::clone(&self.schema), values))
    }
}
