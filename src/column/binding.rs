//! Column bindings
//!
//! A binding ties one storage column to one schema or one abstract family.
//! It is created once when a record type is mapped and never changes.
//!
//! Write path: form -> resolver/codec -> JSON -> stored cell.
//! Read path: stored cell -> JSON -> resolver/codec -> form -> tracker (if mutable).

use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;

use tracing::debug;

use super::options::{ColumnOptions, StorageFormat, StoredValue};
use crate::codec::FormCodec;
use crate::form::Form;
use crate::resolver::PolymorphicResolver;
use crate::schema::{FormError, FormResult, Schema, SchemaFamily};
use crate::tracker::{ChangeHook, TrackedForm};

/// What a column is bound to
#[derive(Debug, Clone)]
pub enum BindTarget {
    /// One concrete schema
    Schema(Arc<Schema>),
    /// An abstract family, dispatched on its discriminator
    Family(Arc<SchemaFamily>),
}

impl BindTarget {
    pub fn name(&self) -> &str {
        match self {
            BindTarget::Schema(schema) => schema.name(),
            BindTarget::Family(family) => family.name(),
        }
    }
}

impl From<Arc<Schema>> for BindTarget {
    fn from(schema: Arc<Schema>) -> Self {
        BindTarget::Schema(schema)
    }
}

impl From<Arc<SchemaFamily>> for BindTarget {
    fn from(family: Arc<SchemaFamily>) -> Self {
        BindTarget::Family(family)
    }
}

impl From<SchemaFamily> for BindTarget {
    fn from(family: SchemaFamily) -> Self {
        BindTarget::Family(Arc::new(family))
    }
}

/// Converts between forms and JSON for a binding target.
#[derive(Debug, Clone)]
pub enum FormAdapter {
    Single(FormCodec),
    Polymorphic(PolymorphicResolver),
}

impl FormAdapter {
    /// Builds the adapter. Misconfigured targets fail here, never later.
    pub fn new(target: BindTarget) -> FormResult<Self> {
        match target {
            BindTarget::Schema(schema) => FormCodec::new(schema).map(FormAdapter::Single),
            BindTarget::Family(family) => {
                PolymorphicResolver::new(family).map(FormAdapter::Polymorphic)
            }
        }
    }

    /// Checks a form may be assigned to this adapter's column.
    pub fn accept(&self, form: &Form) -> FormResult<()> {
        match self {
            FormAdapter::Single(codec) => codec.accept(form),
            FormAdapter::Polymorphic(resolver) => resolver.resolve_for_write(form).map(|_| ()),
        }
    }

    pub fn serialize(&self, form: &Form) -> FormResult<Value> {
        match self {
            FormAdapter::Single(codec) => codec.serialize(form),
            FormAdapter::Polymorphic(resolver) => resolver.serialize(form),
        }
    }

    pub fn deserialize(&self, raw: &Value) -> FormResult<Form> {
        match self {
            FormAdapter::Single(codec) => codec.deserialize(raw),
            FormAdapter::Polymorphic(resolver) => resolver.deserialize(raw),
        }
    }
}

/// The in-memory value of a bound column
#[derive(Debug)]
pub enum ColumnValue {
    /// Untracked form (immutable binding, or freshly assigned)
    Plain(Form),
    /// Form wrapped in a mutation tracker
    Tracked(TrackedForm),
}

impl ColumnValue {
    pub fn form(&self) -> &Form {
        match self {
            ColumnValue::Plain(form) => form,
            ColumnValue::Tracked(tracked) => tracked.form(),
        }
    }

    pub fn is_tracked(&self) -> bool {
        matches!(self, ColumnValue::Tracked(_))
    }

    /// Tracked handle; edits through it mark the owning record modified.
    pub fn as_tracked_mut(&mut self) -> Option<&mut TrackedForm> {
        match self {
            ColumnValue::Tracked(tracked) => Some(tracked),
            ColumnValue::Plain(_) => None,
        }
    }

    /// Untracked handle. Edits through it are NOT seen by the owning record;
    /// reassign the column to persist them.
    pub fn as_plain_mut(&mut self) -> Option<&mut Form> {
        match self {
            ColumnValue::Plain(form) => Some(form),
            ColumnValue::Tracked(_) => None,
        }
    }

    pub fn into_form(self) -> Form {
        match self {
            ColumnValue::Plain(form) => form,
            ColumnValue::Tracked(tracked) => tracked.into_inner(),
        }
    }

    pub(crate) fn mark_clean(&mut self) {
        if let ColumnValue::Tracked(tracked) = self {
            tracked.mark_clean();
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        if let ColumnValue::Tracked(tracked) = self {
            tracked.mark_dirty();
        }
    }
}

impl Deref for ColumnValue {
    type Target = Form;

    fn deref(&self) -> &Form {
        self.form()
    }
}

impl PartialEq<Form> for ColumnValue {
    fn eq(&self, other: &Form) -> bool {
        self.form() == other
    }
}

/// Binds `column` to a schema or family; `mutable` enables tracking.
pub fn bind(
    column: impl Into<String>,
    target: impl Into<BindTarget>,
    mutable: bool,
) -> FormResult<ColumnBinding> {
    bind_with(
        column,
        target,
        ColumnOptions {
            mutable,
            ..ColumnOptions::default()
        },
    )
}

/// Binds `column` with explicit options.
pub fn bind_with(
    column: impl Into<String>,
    target: impl Into<BindTarget>,
    options: ColumnOptions,
) -> FormResult<ColumnBinding> {
    let column = column.into();
    let target = target.into();
    let target_name = target.name().to_string();
    let adapter = FormAdapter::new(target)?;

    debug!(
        column = %column,
        target = %target_name,
        mutable = options.mutable,
        storage = ?options.storage,
        "column bound"
    );
    Ok(ColumnBinding {
        column,
        adapter,
        options,
    })
}

/// Adapter registered on one column.
#[derive(Debug, Clone)]
pub struct ColumnBinding {
    column: String,
    adapter: FormAdapter,
    options: ColumnOptions,
}

impl ColumnBinding {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn options(&self) -> ColumnOptions {
        self.options
    }

    pub fn is_mutable(&self) -> bool {
        self.options.mutable
    }

    pub fn adapter(&self) -> &FormAdapter {
        &self.adapter
    }

    /// Validates raw data assigned in memory, exactly as a load would.
    pub fn coerce(&self, raw: &Value) -> FormResult<Form> {
        self.adapter.deserialize(raw)
    }

    /// Checks a form assigned in memory belongs to this column.
    pub fn accept(&self, form: &Form) -> FormResult<()> {
        self.adapter.accept(form)
    }

    /// Converts the in-memory value into the stored cell.
    pub fn process_bind(&self, form: Option<&Form>) -> FormResult<StoredValue> {
        let Some(form) = form else {
            return self.null_or_missing().map(|_| StoredValue::Null);
        };
        let raw = self.adapter.serialize(form)?;
        Ok(match self.options.storage {
            StorageFormat::Json => StoredValue::Json(raw),
            StorageFormat::Text => StoredValue::Text(serde_json::to_string(&raw)?),
        })
    }

    /// Converts a stored cell back into a validated form.
    ///
    /// Data that is valid JSON but invalid per schema fails exactly like
    /// invalid data assigned by the application.
    pub fn process_result(&self, stored: &StoredValue) -> FormResult<Option<Form>> {
        let raw = match stored {
            StoredValue::Null => Value::Null,
            StoredValue::Json(raw) => raw.clone(),
            StoredValue::Text(text) => serde_json::from_str(text)?,
        };
        if raw.is_null() {
            return self.null_or_missing().map(|_| None);
        }
        self.adapter.deserialize(&raw).map(Some)
    }

    /// Presents a loaded form to the caller, tracked when the binding is mutable.
    pub fn present(&self, form: Form, hook: &Arc<dyn ChangeHook>) -> ColumnValue {
        if self.options.mutable {
            ColumnValue::Tracked(TrackedForm::new(form, self.column.clone(), Arc::clone(hook)))
        } else {
            ColumnValue::Plain(form)
        }
    }

    fn null_or_missing(&self) -> FormResult<()> {
        if self.options.nullable {
            Ok(())
        } else {
            Err(FormError::missing(self.column.as_str()))
        }
    }
}
