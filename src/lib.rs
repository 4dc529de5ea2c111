//! formcol - structured form values stored in a single document column
//!
//! A column bound to a schema (or to an abstract family of schemas) accepts
//! and yields validated [`form::Form`] values. Raw data is validated on both
//! write and read, polymorphic families are resolved through a discriminator
//! tag, and mutable columns report in-place changes to their owning record.

pub mod cli;
pub mod codec;
pub mod column;
pub mod form;
pub mod resolver;
pub mod schema;
pub mod session;
pub mod tracker;

pub use codec::FormCodec;
pub use column::{bind, bind_with, BindTarget, ColumnBinding, ColumnOptions, ColumnValue};
pub use form::{FieldValue, Form};
pub use resolver::PolymorphicResolver;
pub use schema::{FieldDef, FieldType, FormError, FormResult, Schema, SchemaFamily};
pub use session::{Mapper, Record, Session};
pub use tracker::{ChangeHook, TrackedForm};
