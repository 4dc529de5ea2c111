//! Unit of work
//!
//! The session owns an identity map of records and decides what a flush
//! writes:
//! - pending records (added, never flushed) are always written
//! - persistent records are written only when modified
//!
//! A flush serializes every row before writing any; one failing column
//! leaves the store and every record's change state untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::mapper::Mapper;
use super::record::Record;
use super::store::{MemoryStore, Row};
use crate::schema::{FormError, FormResult};

/// Identity of a record within a session
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    mapper: String,
    id: String,
}

impl RecordKey {
    pub fn new(mapper: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            mapper: mapper.into(),
            id: id.into(),
        }
    }

    pub fn mapper(&self) -> &str {
        &self.mapper
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Lifecycle of a record within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Added but never flushed
    Pending,
    /// Present in the store
    Persistent,
}

#[derive(Debug)]
struct Entry {
    record: Record,
    status: EntryStatus,
}

/// Identity map plus flush/commit over a [`MemoryStore`].
#[derive(Debug, Default)]
pub struct Session {
    store: MemoryStore,
    identity: BTreeMap<RecordKey, Entry>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            store,
            identity: BTreeMap::new(),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Writes a row straight to the store, bypassing every binding.
    pub fn execute_insert(&mut self, table: &str, id: &str, row: Row) {
        self.store.upsert(table, id, row);
    }

    /// Adds a new record to the unit of work.
    pub fn add(&mut self, record: Record) -> FormResult<RecordKey> {
        let key = RecordKey::new(record.mapper().name(), record.id());
        if self.identity.contains_key(&key) {
            return Err(FormError::configuration(format!(
                "record '{}' of '{}' is already in the session",
                key.id, key.mapper
            )));
        }
        self.identity.insert(
            key.clone(),
            Entry {
                record,
                status: EntryStatus::Pending,
            },
        );
        Ok(key)
    }

    pub fn record(&self, key: &RecordKey) -> Option<&Record> {
        self.identity.get(key).map(|entry| &entry.record)
    }

    pub fn record_mut(&mut self, key: &RecordKey) -> Option<&mut Record> {
        self.identity.get_mut(key).map(|entry| &mut entry.record)
    }

    pub fn status(&self, key: &RecordKey) -> Option<EntryStatus> {
        self.identity.get(key).map(|entry| entry.status)
    }

    /// True for records added since the last flush.
    pub fn is_new(&self, key: &RecordKey) -> bool {
        self.status(key) == Some(EntryStatus::Pending)
    }

    /// True for persistent records with changes waiting for the next flush.
    pub fn is_dirty(&self, key: &RecordKey) -> bool {
        self.identity
            .get(key)
            .map_or(false, |entry| {
                entry.status == EntryStatus::Persistent && entry.record.is_modified()
            })
    }

    pub fn new_keys(&self) -> Vec<&RecordKey> {
        self.keys_where(|entry| entry.status == EntryStatus::Pending)
    }

    pub fn dirty_keys(&self) -> Vec<&RecordKey> {
        self.keys_where(|entry| {
            entry.status == EntryStatus::Persistent && entry.record.is_modified()
        })
    }

    fn keys_where(&self, pred: impl Fn(&Entry) -> bool) -> Vec<&RecordKey> {
        self.identity
            .iter()
            .filter(|(_, entry)| pred(entry))
            .map(|(key, _)| key)
            .collect()
    }

    /// Loads a record, from the identity map when already present.
    ///
    /// Returns `Ok(None)` when no row exists. Invalid stored data fails the
    /// load with the same error an in-memory assignment would raise.
    pub fn get(&mut self, mapper: &Arc<Mapper>, id: &str) -> FormResult<Option<&mut Record>> {
        let key = RecordKey::new(mapper.name(), id);
        if !self.identity.contains_key(&key) {
            let Some(row) = self.store.get(mapper.table(), id) else {
                return Ok(None);
            };
            let record = Record::load(mapper, id, row)?;
            self.identity.insert(
                key.clone(),
                Entry {
                    record,
                    status: EntryStatus::Persistent,
                },
            );
        }
        Ok(self.identity.get_mut(&key).map(|entry| &mut entry.record))
    }

    /// Writes pending and modified records. Returns the number of rows written.
    pub fn flush(&mut self) -> FormResult<usize> {
        let mut rows = Vec::new();
        for (key, entry) in &self.identity {
            if entry.status == EntryStatus::Pending || entry.record.is_modified() {
                rows.push((key.clone(), entry.record.to_row()?));
            }
        }

        for (key, row) in &rows {
            if let Some(entry) = self.identity.get_mut(key) {
                self.store.upsert(entry.record.mapper().table(), key.id(), row.clone());
                entry.record.mark_clean();
                entry.status = EntryStatus::Persistent;
            }
        }

        debug!(rows = rows.len(), "session flushed");
        Ok(rows.len())
    }

    /// Flushes, then reloads every record from the store.
    pub fn commit(&mut self) -> FormResult<()> {
        self.flush()?;
        let keys: Vec<RecordKey> = self.identity.keys().cloned().collect();
        for key in &keys {
            self.refresh(key)?;
        }
        Ok(())
    }

    /// Replaces a persistent record with a fresh load of its stored row.
    pub fn refresh(&mut self, key: &RecordKey) -> FormResult<()> {
        let Some(entry) = self.identity.get_mut(key) else {
            return Ok(());
        };
        if entry.status == EntryStatus::Pending {
            return Ok(());
        }
        let mapper = Arc::clone(entry.record.mapper());
        let row = self.store.get(mapper.table(), key.id()).ok_or_else(|| {
            FormError::configuration(format!(
                "record '{}' of '{}' has no stored row",
                key.id(),
                key.mapper()
            ))
        })?;
        entry.record = Record::load(&mapper, key.id(), row)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{bind, StoredValue};
    use crate::schema::{FieldDef, Schema};
    use serde_json::json;

    fn mapper(mutable: bool) -> Arc<Mapper> {
        let schema = Schema::builder("AForm")
            .field(FieldDef::integer("a"))
            .build()
            .unwrap();
        Arc::new(
            Mapper::new("JsonTest", "json_tests")
                .with_binding(bind("data", schema, mutable).unwrap())
                .unwrap(),
        )
    }

    fn stored(session: &Session, id: &str) -> StoredValue {
        session.store().get("json_tests", id).unwrap()["data"].clone()
    }

    #[test]
    fn test_flush_writes_pending_once() {
        let mapper = mapper(false);
        let mut session = Session::new();
        let mut record = Record::with_id(&mapper, "r1");
        record.set_raw("data", &json!({"a": 1})).unwrap();
        let key = session.add(record).unwrap();

        assert!(session.is_new(&key));
        assert_eq!(session.new_keys(), vec![&key]);
        assert_eq!(session.flush().unwrap(), 1);
        assert_eq!(session.status(&key), Some(EntryStatus::Persistent));
        assert_eq!(stored(&session, "r1"), StoredValue::Json(json!({"a": 1})));

        // Nothing changed since.
        assert_eq!(session.flush().unwrap(), 0);
    }

    #[test]
    fn test_flush_is_atomic() {
        let mapper = mapper(false);
        let mut session = Session::new();
        let mut good = Record::with_id(&mapper, "r1");
        good.set_raw("data", &json!({"a": 1})).unwrap();
        session.add(good).unwrap();
        // No value for a non-nullable column.
        let empty = session.add(Record::with_id(&mapper, "r2")).unwrap();

        let err = session.flush().unwrap_err();
        assert_eq!(err.to_string(), "data - missing");
        assert_eq!(session.store().row_count("json_tests"), 0);
        assert!(session.is_new(&empty));
    }

    #[test]
    fn test_get_uses_identity_map() {
        let mapper = mapper(true);
        let mut session = Session::new();
        let mut record = Record::with_id(&mapper, "r1");
        record.set_raw("data", &json!({"a": 1})).unwrap();
        session.add(record).unwrap();
        session.flush().unwrap();

        session
            .get(&mapper, "r1")
            .unwrap()
            .unwrap()
            .tracked_mut("data")
            .unwrap()
            .set("a", json!(2))
            .unwrap();
        // Same instance: the unflushed edit is visible.
        let again = session.get(&mapper, "r1").unwrap().unwrap();
        assert_eq!(again.form("data").unwrap().get("a").and_then(|v| v.as_i64()), Some(2));
        assert!(session.get(&mapper, "absent").unwrap().is_none());
    }

    #[test]
    fn test_in_place_edit_makes_record_dirty() {
        let mapper = mapper(true);
        let mut session = Session::new();
        let mut record = Record::with_id(&mapper, "r1");
        record.set_raw("data", &json!({"a": 1})).unwrap();
        let key = session.add(record).unwrap();
        session.commit().unwrap();
        assert!(!session.is_dirty(&key));

        session
            .record_mut(&key)
            .unwrap()
            .tracked_mut("data")
            .unwrap()
            .set("a", json!(5))
            .unwrap();
        assert!(session.is_dirty(&key));
        assert_eq!(session.dirty_keys(), vec![&key]);

        assert_eq!(session.flush().unwrap(), 1);
        assert!(!session.is_dirty(&key));
        assert_eq!(stored(&session, "r1"), StoredValue::Json(json!({"a": 5})));
    }

    #[test]
    fn test_refresh_discards_unflushed_edits() {
        let mapper = mapper(true);
        let mut session = Session::new();
        let mut record = Record::with_id(&mapper, "r1");
        record.set_raw("data", &json!({"a": 1})).unwrap();
        let key = session.add(record).unwrap();
        session.flush().unwrap();

        session
            .record_mut(&key)
            .unwrap()
            .tracked_mut("data")
            .unwrap()
            .set("a", json!(9))
            .unwrap();
        session.refresh(&key).unwrap();

        let record = session.record(&key).unwrap();
        assert!(!record.is_modified());
        assert_eq!(record.form("data").unwrap().get("a").and_then(|v| v.as_i64()), Some(1));
    }

    #[test]
    fn test_add_twice_rejected() {
        let mapper = mapper(false);
        let mut session = Session::new();
        session.add(Record::with_id(&mapper, "r1")).unwrap();
        let err = session.add(Record::with_id(&mapper, "r1")).unwrap_err();
        assert!(err.is_configuration());
    }
}
