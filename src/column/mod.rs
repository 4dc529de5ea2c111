//! Column-type adapter
//!
//! Presents a JSON (or JSON text) storage column as a validated form.
//! Bindings are built once per mapped column; building one eagerly checks
//! the schema or family it targets.

mod binding;
mod options;

pub use binding::{bind, bind_with, BindTarget, ColumnBinding, ColumnValue, FormAdapter};
pub use options::{ColumnOptions, StorageFormat, StoredValue};
