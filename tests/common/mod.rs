//! Shared fixtures for integration tests
//!
//! Mirrors a small catalogue of forms:
//! - `Form`: a, b (default 121.12), c (string, boolean), d {string: string}
//! - `AForm`: abstract, discriminated by `_type_`, with a and b (default 1.13)
//! - `BForm` ("a.b.v1") and `CForm` ("a.c.v1") extending `AForm`

#![allow(dead_code)]

use std::sync::Arc;

use formcol::column::{bind, bind_with, ColumnOptions, StorageFormat};
use formcol::schema::{FieldDef, FieldType, Schema, SchemaFamily};
use formcol::session::Mapper;
use serde_json::json;

pub fn form_schema() -> Arc<Schema> {
    Schema::builder("Form")
        .field(FieldDef::integer("a"))
        .field(FieldDef::float("b").with_default(json!(121.12)))
        .field(FieldDef::tuple("c", vec![FieldType::String, FieldType::Boolean]))
        .field(FieldDef::dict("d", FieldType::String, FieldType::String))
        .build()
        .unwrap()
}

pub struct Catalogue {
    pub base: Arc<Schema>,
    pub bform: Arc<Schema>,
    pub cform: Arc<Schema>,
    pub family: Arc<SchemaFamily>,
}

pub fn catalogue() -> Catalogue {
    let base = Schema::abstract_builder("AForm", "_type_")
        .field(FieldDef::integer("a"))
        .field(FieldDef::float("b").with_default(json!(1.13)))
        .build()
        .unwrap();
    let bform = Schema::variant_of(&base, "BForm", "a.b.v1")
        .field(FieldDef::tuple("c", vec![FieldType::String, FieldType::Boolean]))
        .build()
        .unwrap();
    let cform = Schema::variant_of(&base, "CForm", "a.c.v1")
        .field(FieldDef::dict("d", FieldType::String, FieldType::String))
        .build()
        .unwrap();
    let family = SchemaFamily::new(Arc::clone(&base))
        .unwrap()
        .with_variant(Arc::clone(&bform))
        .unwrap()
        .with_variant(Arc::clone(&cform))
        .unwrap();
    Catalogue {
        base,
        bform,
        cform,
        family: Arc::new(family),
    }
}

pub fn json_test(mutable: bool) -> Arc<Mapper> {
    let name = if mutable { "MutableJSONTest" } else { "JSONTest" };
    Arc::new(
        Mapper::new(name, "json_tests")
            .with_binding(bind("data", form_schema(), mutable).unwrap())
            .unwrap(),
    )
}

pub fn polymorphic_json_test(mutable: bool) -> Arc<Mapper> {
    let name = if mutable {
        "MutablePolymorphicJSONTest"
    } else {
        "PolymorphicJSONTest"
    };
    Arc::new(
        Mapper::new(name, "json_tests")
            .with_binding(bind("data", Arc::clone(&catalogue().family), mutable).unwrap())
            .unwrap(),
    )
}

pub fn encoded_json_test() -> Arc<Mapper> {
    let options = ColumnOptions::default().with_storage(StorageFormat::Text);
    Arc::new(
        Mapper::new("EncodedJSONTest", "encoded_json_tests")
            .with_binding(bind_with("data", form_schema(), options).unwrap())
            .unwrap(),
    )
}
