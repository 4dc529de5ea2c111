//! Schema subsystem
//!
//! Schemas describe the fields of a form: their types, defaults and rules.
//! Abstract schemas root polymorphic families whose concrete variants are
//! told apart by a discriminator tag.
//!
//! # Design Principles
//!
//! - Schemas are immutable once built and shared through `Arc`
//! - Field order is declaration order, inherited fields first
//! - Validation stops at the first failing field
//! - Every error names the field path and the offending raw value

mod errors;
mod family;
mod loader;
mod types;
mod validator;

pub use errors::{FormError, FormResult};
pub use family::SchemaFamily;
pub use loader::{SchemaDecl, SchemaLoader};
pub use types::{FieldDef, FieldType, Rules, Schema, SchemaBuilder, SchemaKind};

pub(crate) use validator::{check_length, index_path, make_path, validate_field, validate_value};
