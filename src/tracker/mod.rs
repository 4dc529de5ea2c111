//! Mutation tracker
//!
//! Wraps a loaded form so that in-place edits mark the owning record as
//! modified, the same way whole-column assignment does.
//!
//! State machine per tracked value:
//!
//! ```text
//! Clean --write--> Dirty --flush ok--> Clean
//! Dirty --write--> Dirty   (no further notification)
//! ```
//!
//! Reads forward to the wrapped form through `Deref`. Writes validate,
//! forward, then notify the owner's [`ChangeHook`] on the first write of a
//! change window. Container fields handed out for editing are wrapped too.

mod containers;

use serde_json::Value;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::form::{FieldValue, Form};
use crate::schema::{FieldType, FormError, FormResult};

pub use containers::{TrackedDict, TrackedList};

/// Receives "this record changed" notifications from trackers.
///
/// Calling `mark_modified` must make the owner's next flush check treat the
/// record as changed.
pub trait ChangeHook: Send + Sync {
    fn mark_modified(&self, column: &str);
}

/// Tracker state for one loaded column value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// No writes since the last successful flush
    Clean,
    /// Owner already notified for the current change window
    Dirty,
}

/// Notification half of a tracker, lent to container handles.
pub(crate) struct Signal<'a> {
    state: &'a mut TrackState,
    hook: &'a dyn ChangeHook,
    column: &'a str,
}

impl Signal<'_> {
    fn fire(&mut self) {
        if *self.state == TrackState::Clean {
            self.hook.mark_modified(self.column);
            *self.state = TrackState::Dirty;
        }
    }
}

/// A form whose in-place edits are reported to its owning record.
///
/// Holds nothing but the form, the column it was loaded from, the owner's
/// hook and the clean/dirty flag; write-back serializes the wrapped form.
pub struct TrackedForm {
    form: Form,
    column: String,
    hook: Arc<dyn ChangeHook>,
    state: TrackState,
}

impl TrackedForm {
    /// Wraps a freshly loaded (clean) form.
    pub fn new(form: Form, column: impl Into<String>, hook: Arc<dyn ChangeHook>) -> Self {
        Self {
            form,
            column: column.into(),
            hook,
            state: TrackState::Clean,
        }
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn into_inner(self) -> Form {
        self.form
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Validates and assigns one field, then notifies the owner.
    pub fn set(&mut self, name: &str, raw: Value) -> FormResult<()> {
        self.form.set(name, raw)?;
        self.signal().fire();
        Ok(())
    }

    /// Clears an optional field (or restores its default), then notifies the owner.
    pub fn clear(&mut self, name: &str) -> FormResult<()> {
        self.form.clear(name)?;
        self.signal().fire();
        Ok(())
    }

    /// Edit handle for a dict field; writes through it notify the owner.
    pub fn dict_mut(&mut self, name: &str) -> FormResult<TrackedDict<'_>> {
        let Self {
            form,
            column,
            hook,
            state,
        } = self;
        let (field, slot) = form.field_slot(name)?;
        let FieldType::Dict { key, value } = &field.field_type else {
            return Err(FormError::validation(name, "is not a dict field"));
        };
        let Some(FieldValue::Dict(entries)) = slot else {
            return Err(FormError::validation(name, "is not set"));
        };
        let signal = Signal {
            state,
            hook: &**hook,
            column: column.as_str(),
        };
        Ok(TrackedDict::new(field, key, value, entries, signal))
    }

    /// Edit handle for a list field; writes through it notify the owner.
    pub fn list_mut(&mut self, name: &str) -> FormResult<TrackedList<'_>> {
        let Self {
            form,
            column,
            hook,
            state,
        } = self;
        let (field, slot) = form.field_slot(name)?;
        let FieldType::List { item } = &field.field_type else {
            return Err(FormError::validation(name, "is not a list field"));
        };
        let Some(FieldValue::List(items)) = slot else {
            return Err(FormError::validation(name, "is not set"));
        };
        let signal = Signal {
            state,
            hook: &**hook,
            column: column.as_str(),
        };
        Ok(TrackedList::new(field, item, items, signal))
    }

    /// Starts a new change window after the owner flushed successfully.
    pub fn mark_clean(&mut self) {
        self.state = TrackState::Clean;
    }

    /// Joins a change window the owner already opened (whole-column assignment).
    pub(crate) fn mark_dirty(&mut self) {
        self.state = TrackState::Dirty;
    }

    fn signal(&mut self) -> Signal<'_> {
        Signal {
            state: &mut self.state,
            hook: &*self.hook,
            column: &self.column,
        }
    }
}

impl Deref for TrackedForm {
    type Target = Form;

    fn deref(&self) -> &Form {
        &self.form
    }
}

impl AsRef<Form> for TrackedForm {
    fn as_ref(&self) -> &Form {
        &self.form
    }
}

impl PartialEq for TrackedForm {
    fn eq(&self, other: &Self) -> bool {
        self.form == other.form
    }
}

impl PartialEq<Form> for TrackedForm {
    fn eq(&self, other: &Form) -> bool {
        self.form == *other
    }
}

impl fmt::Debug for TrackedForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedForm")
            .field("form", &self.form)
            .field("column", &self.column)
            .field("state", &self.state)
            .finish()
    }
}
