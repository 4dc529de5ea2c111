//! Polymorphic resolver
//!
//! Routes (de)serialization to the concrete variant of an abstract family.
//! The family is a closed tag -> schema table fixed at binding time; no
//! runtime type inspection beyond the form's own schema identity.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use crate::codec::FormCodec;
use crate::form::Form;
use crate::schema::{FormError, FormResult, SchemaFamily};

/// Picks the codec of the right variant, by runtime schema on write and by
/// discriminator tag on read.
#[derive(Debug, Clone)]
pub struct PolymorphicResolver {
    family: Arc<SchemaFamily>,
    /// Codecs keyed by variant tag
    codecs: BTreeMap<String, FormCodec>,
}

impl PolymorphicResolver {
    /// Builds the tag table. Fails if the family has no variants or a tag collides.
    pub fn new(family: Arc<SchemaFamily>) -> FormResult<Self> {
        family.check()?;

        let mut codecs = BTreeMap::new();
        for variant in family.variants() {
            let tag = variant.tag().unwrap_or_default().to_string();
            codecs.insert(tag, FormCodec::new(Arc::clone(variant))?);
        }

        trace!(family = family.name(), variants = codecs.len(), "resolver built");
        Ok(Self { family, codecs })
    }

    pub fn family(&self) -> &Arc<SchemaFamily> {
        &self.family
    }

    /// The discriminator key carried by every payload
    pub fn discriminator(&self) -> &str {
        self.family.discriminator()
    }

    /// Tags known to this resolver, sorted
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.codecs.keys().map(String::as_str)
    }

    /// Returns the codec for the form's runtime variant.
    pub fn resolve_for_write(&self, form: &Form) -> FormResult<&FormCodec> {
        form.tag()
            .and_then(|tag| self.codecs.get(tag))
            .filter(|codec| form.conforms_to(codec.schema()))
            .ok_or_else(|| FormError::unknown_variant(self.family.name(), form.schema_name()))
    }

    /// Returns the codec named by the discriminator of `raw`.
    ///
    /// Only the discriminator is inspected; the rest of the payload is left to
    /// the returned codec.
    pub fn resolve_for_read(&self, raw: &Value) -> FormResult<&FormCodec> {
        let obj = raw
            .as_object()
            .ok_or_else(|| FormError::invalid("$root", raw, "is not an object"))?;

        let discriminator = self.discriminator();
        let tag = match obj.get(discriminator) {
            None | Some(Value::Null) => return Err(FormError::missing(discriminator)),
            Some(Value::String(tag)) => tag,
            Some(other) => return Err(FormError::invalid(discriminator, other, "is not a string")),
        };

        self.codecs
            .get(tag)
            .ok_or_else(|| FormError::unknown_variant(self.family.name(), tag.as_str()))
    }

    /// Serializes through the form's variant codec; the tag is always written.
    pub fn serialize(&self, form: &Form) -> FormResult<Value> {
        self.resolve_for_write(form)?.serialize(form)
    }

    pub fn deserialize(&self, raw: &Value) -> FormResult<Form> {
        self.resolve_for_read(raw)?.deserialize(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldType, Schema};
    use serde_json::json;

    fn family() -> Arc<SchemaFamily> {
        let base = Schema::abstract_builder("AForm", "_type_")
            .field(FieldDef::integer("a"))
            .field(FieldDef::float("b").with_default(json!(1.13)))
            .build()
            .unwrap();
        let b = Schema::variant_of(&base, "BForm", "a.b.v1")
            .field(FieldDef::tuple("c", vec![FieldType::String, FieldType::Boolean]))
            .build()
            .unwrap();
        let c = Schema::variant_of(&base, "CForm", "a.c.v1")
            .field(FieldDef::dict("d", FieldType::String, FieldType::String))
            .build()
            .unwrap();
        Arc::new(
            SchemaFamily::new(base)
                .unwrap()
                .with_variant(b)
                .unwrap()
                .with_variant(c)
                .unwrap(),
        )
    }

    #[test]
    fn test_write_includes_tag() {
        let family = family();
        let resolver = PolymorphicResolver::new(Arc::clone(&family)).unwrap();
        let cform = family.variant_by_name("CForm").unwrap();
        let form = Form::new(cform, &json!({"a": 123, "b": 12.12, "d": {"a": "tag"}})).unwrap();

        let raw = resolver.serialize(&form).unwrap();
        assert_eq!(raw["_type_"], json!("a.c.v1"));
        assert_eq!(resolver.resolve_for_write(&form).unwrap().schema().name(), "CForm");
    }

    #[test]
    fn test_read_dispatches_on_tag() {
        let resolver = PolymorphicResolver::new(family()).unwrap();
        let form = resolver
            .deserialize(&json!({"_type_": "a.b.v1", "a": 1, "c": ["x", true]}))
            .unwrap();
        assert_eq!(form.schema_name(), "BForm");
        assert_eq!(form.tag(), Some("a.b.v1"));
    }

    #[test]
    fn test_unknown_tag() {
        let resolver = PolymorphicResolver::new(family()).unwrap();
        let err = resolver
            .resolve_for_read(&json!({"_type_": "a.z.v9", "a": 1}))
            .unwrap_err();
        assert!(err.is_unknown_variant());
        assert!(err.to_string().contains("a.z.v9"));
    }

    #[test]
    fn test_missing_or_non_string_discriminator() {
        let resolver = PolymorphicResolver::new(family()).unwrap();
        let err = resolver.resolve_for_read(&json!({"a": 1})).unwrap_err();
        assert_eq!(err.to_string(), "_type_ - missing");

        let err = resolver.resolve_for_read(&json!({"_type_": 7})).unwrap_err();
        assert_eq!(err.to_string(), "_type_ - \"7\" is not a string");
    }

    #[test]
    fn test_read_does_not_validate_payload() {
        let resolver = PolymorphicResolver::new(family()).unwrap();
        let codec = resolver
            .resolve_for_read(&json!({"_type_": "a.c.v1", "a": []}))
            .unwrap();
        assert_eq!(codec.schema().name(), "CForm");
    }

    #[test]
    fn test_unregistered_variant_on_write() {
        let family = family();
        let resolver = PolymorphicResolver::new(Arc::clone(&family)).unwrap();
        let stray = Schema::variant_of(family.base(), "DForm", "a.d.v1")
            .build()
            .unwrap();
        let form = Form::new(&stray, &json!({"a": 1})).unwrap();
        let err = resolver.resolve_for_write(&form).unwrap_err();
        assert!(err.is_unknown_variant());
        assert!(err.to_string().contains("DForm"));
    }

    #[test]
    fn test_same_name_and_tag_from_other_family_rejected() {
        let resolver = PolymorphicResolver::new(family()).unwrap();
        let base = Schema::abstract_builder("AForm", "_type_").build().unwrap();
        let lookalike = Schema::variant_of(&base, "CForm", "a.c.v1")
            .field(FieldDef::boolean("z"))
            .build()
            .unwrap();
        let form = Form::new(&lookalike, &json!({"z": true})).unwrap();

        assert!(resolver.resolve_for_write(&form).unwrap_err().is_unknown_variant());
        assert!(resolver.serialize(&form).is_err());
    }

    #[test]
    fn test_rebuilt_identical_variant_accepted() {
        let resolver = PolymorphicResolver::new(family()).unwrap();
        let other = family();
        let cform = other.variant_by_name("CForm").unwrap();
        let form = Form::new(cform, &json!({"a": 1, "d": {}})).unwrap();
        assert_eq!(resolver.resolve_for_write(&form).unwrap().schema().name(), "CForm");
    }

    #[test]
    fn test_empty_family_is_configuration_error() {
        let base = Schema::abstract_builder("AForm", "_type_").build().unwrap();
        let family = Arc::new(SchemaFamily::new(base).unwrap());
        assert!(PolymorphicResolver::new(family).unwrap_err().is_configuration());
    }
}
