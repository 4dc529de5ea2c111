//! Form instances and their typed field values

mod instance;
mod value;

pub use instance::Form;
pub use value::FieldValue;
