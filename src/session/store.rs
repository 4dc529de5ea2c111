//! In-memory table storage
//!
//! Rows are stored cells keyed by column name. The store knows nothing about
//! forms; whatever is written here bypasses validation.

use std::collections::BTreeMap;

use crate::column::StoredValue;

/// One stored row: column name -> cell
pub type Row = BTreeMap<String, StoredValue>;

/// Tables of rows keyed by record id.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: BTreeMap<String, BTreeMap<String, Row>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a row.
    pub fn upsert(&mut self, table: &str, id: &str, row: Row) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(id.to_string(), row);
    }

    pub fn get(&self, table: &str, id: &str) -> Option<&Row> {
        self.tables.get(table).and_then(|rows| rows.get(id))
    }

    /// Ids of all rows in `table`, sorted
    pub fn ids(&self, table: &str) -> Vec<String> {
        self.tables
            .get(table)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, BTreeMap::len)
    }
}
