//! Owning records and their change state

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;
use uuid::Uuid;

use super::mapper::Mapper;
use super::store::Row;
use crate::column::{ColumnValue, StoredValue};
use crate::form::Form;
use crate::schema::FormResult;
use crate::tracker::{ChangeHook, TrackedForm};

/// Modified-column bookkeeping shared by a record and its trackers.
#[derive(Debug, Default)]
pub struct RecordState {
    modified: Mutex<BTreeSet<String>>,
}

impl RecordState {
    pub fn is_modified(&self) -> bool {
        !self.columns().is_empty()
    }

    pub fn modified_columns(&self) -> Vec<String> {
        self.columns().iter().cloned().collect()
    }

    pub(crate) fn reset(&self) {
        self.columns().clear();
    }

    fn columns(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.modified.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChangeHook for RecordState {
    fn mark_modified(&self, column: &str) {
        trace!(column, "column modified");
        self.columns().insert(column.to_string());
    }
}

/// A persisted entity holding bound form columns.
#[derive(Debug)]
pub struct Record {
    id: String,
    mapper: Arc<Mapper>,
    values: BTreeMap<String, ColumnValue>,
    state: Arc<RecordState>,
}

impl Record {
    /// Creates a record with a generated id.
    pub fn new(mapper: &Arc<Mapper>) -> Self {
        Self::with_id(mapper, Uuid::new_v4().simple().to_string())
    }

    pub fn with_id(mapper: &Arc<Mapper>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mapper: Arc::clone(mapper),
            values: BTreeMap::new(),
            state: Arc::new(RecordState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mapper(&self) -> &Arc<Mapper> {
        &self.mapper
    }

    /// Assigns a whole column. Always marks the column modified.
    pub fn set(&mut self, column: &str, form: Form) -> FormResult<()> {
        let binding = self.mapper.binding(column)?;
        binding.accept(&form)?;

        let mut value = binding.present(form, &self.hook());
        value.mark_dirty();
        self.values.insert(column.to_string(), value);
        self.state.mark_modified(column);
        Ok(())
    }

    /// Validates raw data through the column's adapter, then assigns it.
    pub fn set_raw(&mut self, column: &str, raw: &Value) -> FormResult<()> {
        let form = self.mapper.binding(column)?.coerce(raw)?;
        self.set(column, form)
    }

    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.values.get(column)
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut ColumnValue> {
        self.values.get_mut(column)
    }

    pub fn form(&self, column: &str) -> Option<&Form> {
        self.get(column).map(ColumnValue::form)
    }

    /// Tracked handle for a mutable column.
    pub fn tracked_mut(&mut self, column: &str) -> Option<&mut TrackedForm> {
        self.get_mut(column).and_then(ColumnValue::as_tracked_mut)
    }

    pub fn is_modified(&self) -> bool {
        self.state.is_modified()
    }

    pub fn modified_columns(&self) -> Vec<String> {
        self.state.modified_columns()
    }

    /// Serializes every bound column into a stored row.
    pub(crate) fn to_row(&self) -> FormResult<Row> {
        self.mapper
            .bindings()
            .map(|binding| {
                let form = self.form(binding.column());
                Ok((binding.column().to_string(), binding.process_bind(form)?))
            })
            .collect()
    }

    /// Materializes a record from a stored row, validating every bound column.
    pub(crate) fn load(mapper: &Arc<Mapper>, id: &str, row: &Row) -> FormResult<Self> {
        let mut record = Self::with_id(mapper, id);
        let hook = record.hook();
        for binding in mapper.bindings() {
            let stored = row.get(binding.column()).unwrap_or(&StoredValue::Null);
            if let Some(form) = binding.process_result(stored)? {
                record
                    .values
                    .insert(binding.column().to_string(), binding.present(form, &hook));
            }
        }
        trace!(mapper = mapper.name(), id, "record loaded");
        Ok(record)
    }

    /// Closes the current change window after a successful flush.
    pub(crate) fn mark_clean(&mut self) {
        self.state.reset();
        self.values.values_mut().for_each(ColumnValue::mark_clean);
    }

    fn hook(&self) -> Arc<dyn ChangeHook> {
        self.state.clone()
    }
}
