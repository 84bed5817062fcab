//! Tab entity store.
//!
//! Pure data: a map keyed by [`TabId`] plus the insertion order, so that
//! iteration is deterministic. No validation happens here; the registry is
//! the only writer.

use std::collections::HashMap;

use crate::model::{TabId, TabRecord};

#[derive(Debug, Default, Clone)]
pub struct TabStore {
    records: HashMap<TabId, TabRecord>,
    order: Vec<TabId>,
}

impl TabStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TabId) -> Option<&TabRecord> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: TabId) -> bool {
        self.records.contains_key(&id)
    }

    /// All records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TabRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn get_all(&self) -> Vec<TabRecord> {
        self.iter().cloned().collect()
    }

    /// Inserts or replaces. Replacing keeps the original insertion slot.
    pub fn put(&mut self, record: TabRecord) {
        let id = record.id;
        if self.records.insert(id, record).is_none() {
            self.order.push(id);
        }
    }

    pub fn delete(&mut self, id: TabId) -> Option<TabRecord> {
        let removed = self.records.remove(&id)?;
        self.order.retain(|existing| *existing != id);
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recently inserted record still present.
    pub fn last_id(&self) -> Option<TabId> {
        self.order.last().copied()
    }

    pub fn active_ids(&self) -> impl Iterator<Item = TabId> + '_ {
        self.iter().filter(|record| record.active).map(|record| record.id)
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }
}
