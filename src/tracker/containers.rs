//! Tracked edit handles for container-valued fields
//!
//! Each write validates the entry and checks the field's length rules against
//! the length the container would have, and only then mutates the stored
//! value in place and notifies the owner. A rejected write leaves the form
//! untouched.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::Signal;
use crate::form::FieldValue;
use crate::schema::{
    check_length, index_path, make_path, validate_value, FieldDef, FieldType, FormError,
    FormResult, Rules,
};

/// Edit handle for a dict field of a tracked form.
pub struct TrackedDict<'a> {
    field: &'a FieldDef,
    key_type: &'a FieldType,
    value_type: &'a FieldType,
    entries: &'a mut BTreeMap<String, FieldValue>,
    signal: Signal<'a>,
}

impl<'a> TrackedDict<'a> {
    pub(crate) fn new(
        field: &'a FieldDef,
        key_type: &'a FieldType,
        value_type: &'a FieldType,
        entries: &'a mut BTreeMap<String, FieldValue>,
        signal: Signal<'a>,
    ) -> Self {
        Self {
            field,
            key_type,
            value_type,
            entries,
            signal,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validates and inserts an entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, raw: Value) -> FormResult<Option<FieldValue>> {
        let key = key.into();
        let path = make_path(&self.field.name, &key);
        validate_value(self.key_type, &Value::String(key.clone()), &path)?;
        let value = validate_value(self.value_type, &raw, &path)?;

        let new_len = self.entries.len() + usize::from(!self.entries.contains_key(&key));
        let entries = &*self.entries;
        admit(self.field, new_len, || {
            let mut rendered = dict_json(entries);
            rendered.insert(key.clone(), value.to_json());
            Value::Object(rendered)
        })?;

        let previous = self.entries.insert(key, value);
        self.signal.fire();
        Ok(previous)
    }

    /// Removes an entry. Removing an absent key is not a write.
    pub fn remove(&mut self, key: &str) -> FormResult<Option<FieldValue>> {
        if !self.entries.contains_key(key) {
            return Ok(None);
        }
        let entries = &*self.entries;
        admit(self.field, entries.len() - 1, || {
            let mut rendered = dict_json(entries);
            rendered.remove(key);
            Value::Object(rendered)
        })?;

        let previous = self.entries.remove(key);
        self.signal.fire();
        Ok(previous)
    }

    pub fn clear(&mut self) -> FormResult<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        admit(self.field, 0, || Value::Object(Map::new()))?;
        self.entries.clear();
        self.signal.fire();
        Ok(())
    }
}

/// Edit handle for a list field of a tracked form.
pub struct TrackedList<'a> {
    field: &'a FieldDef,
    item_type: &'a FieldType,
    items: &'a mut Vec<FieldValue>,
    signal: Signal<'a>,
}

impl std::fmt::Debug for TrackedList<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedList")
            .field("field", &self.field)
            .field("item_type", &self.item_type)
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}

impl<'a> TrackedList<'a> {
    pub(crate) fn new(
        field: &'a FieldDef,
        item_type: &'a FieldType,
        items: &'a mut Vec<FieldValue>,
        signal: Signal<'a>,
    ) -> Self {
        Self {
            field,
            item_type,
            items,
            signal,
        }
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Validates and appends an item.
    pub fn push(&mut self, raw: Value) -> FormResult<()> {
        let value = validate_value(
            self.item_type,
            &raw,
            &index_path(&self.field.name, self.items.len()),
        )?;
        let items = &*self.items;
        admit(self.field, items.len() + 1, || {
            let mut rendered = list_json(items);
            rendered.push(value.to_json());
            Value::Array(rendered)
        })?;

        self.items.push(value);
        self.signal.fire();
        Ok(())
    }

    /// Validates and replaces the item at `index`.
    pub fn set(&mut self, index: usize, raw: Value) -> FormResult<FieldValue> {
        let path = index_path(&self.field.name, index);
        if index >= self.items.len() {
            return Err(FormError::validation(path, "is out of range"));
        }
        let value = validate_value(self.item_type, &raw, &path)?;

        let previous = std::mem::replace(&mut self.items[index], value);
        self.signal.fire();
        Ok(previous)
    }

    pub fn remove(&mut self, index: usize) -> FormResult<FieldValue> {
        if index >= self.items.len() {
            return Err(FormError::validation(
                index_path(&self.field.name, index),
                "is out of range",
            ));
        }
        let items = &*self.items;
        admit(self.field, items.len() - 1, || {
            let mut rendered = list_json(items);
            rendered.remove(index);
            Value::Array(rendered)
        })?;

        let previous = self.items.remove(index);
        self.signal.fire();
        Ok(previous)
    }

    /// Removes the last item. Popping an empty list is not a write.
    pub fn pop(&mut self) -> FormResult<Option<FieldValue>> {
        match self.items.len() {
            0 => Ok(None),
            len => self.remove(len - 1).map(Some),
        }
    }

    pub fn clear(&mut self) -> FormResult<()> {
        if self.items.is_empty() {
            return Ok(());
        }
        admit(self.field, 0, || Value::Array(Vec::new()))?;
        self.items.clear();
        self.signal.fire();
        Ok(())
    }
}

/// Checks the length a write would leave the container with. The rendered
/// container is only built for the error message.
fn admit(field: &FieldDef, new_len: usize, rendered: impl FnOnce() -> Value) -> FormResult<()> {
    if fits(&field.rules, new_len) {
        return Ok(());
    }
    check_length(&field.rules, new_len, &rendered(), &field.name)
}

fn fits(rules: &Rules, len: usize) -> bool {
    rules.min_length.map_or(true, |min| len >= min) && rules.max_length.map_or(true, |max| len <= max)
}

fn dict_json(entries: &BTreeMap<String, FieldValue>) -> Map<String, Value> {
    entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

fn list_json(items: &[FieldValue]) -> Vec<Value> {
    items.iter().map(FieldValue::to_json).collect()
}
