//! Ledger entry arena with a single consumption gate.
//!
//! Every entry may back at most one transaction per run. Single-entry
//! matches and subset-sum matches both go through [`EntryPool::reserve`],
//! which is all-or-nothing.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::error::ReconError;
use crate::model::{EntityKind, LedgerEntry};

/// Index of an entry in the pool arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntryId(usize);

impl EntryId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct EntryPool {
    entries: Vec<LedgerEntry>,
    consumed: Vec<bool>,
    by_entity: BTreeMap<(EntityKind, String), Vec<EntryId>>,
    by_tax_id: BTreeMap<String, Vec<EntryId>>,
}

impl EntryPool {
    pub fn new(entries: Vec<LedgerEntry>) -> Self {
        let mut by_entity: BTreeMap<(EntityKind, String), Vec<EntryId>> = BTreeMap::new();
        let mut by_tax_id: BTreeMap<String, Vec<EntryId>> = BTreeMap::new();

        for (i, entry) in entries.iter().enumerate() {
            let id = EntryId(i);
            by_entity
                .entry((entry.kind, entry.entity_id.clone()))
                .or_default()
                .push(id);
            if let Some(tax_id) = entry.tax_id.as_deref().filter(|t| !t.is_empty()) {
                by_tax_id.entry(tax_id.to_string()).or_default().push(id);
            }
        }

        let consumed = vec![false; entries.len()];
        Self { entries, consumed, by_entity, by_tax_id }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntryId) -> &LedgerEntry {
        &self.entries[id.0]
    }

    pub fn is_consumed(&self, id: EntryId) -> bool {
        self.consumed[id.0]
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Unconsumed entries of one entity, in ledger order.
    pub fn available_for_entity(&self, kind: EntityKind, entity_id: &str) -> Vec<EntryId> {
        self.by_entity
            .get(&(kind, entity_id.to_string()))
            .map(|ids| self.unconsumed(ids))
            .unwrap_or_default()
    }

    /// Unconsumed entries carrying `tax_id`, in ledger order.
    pub fn available_for_tax_id(&self, tax_id: &str) -> Vec<EntryId> {
        self.by_tax_id
            .get(tax_id)
            .map(|ids| self.unconsumed(ids))
            .unwrap_or_default()
    }

    /// Whether any entry, consumed or not, carries `tax_id`.
    pub fn knows_tax_id(&self, tax_id: &str) -> bool {
        self.by_tax_id.contains_key(tax_id)
    }

    fn unconsumed(&self, ids: &[EntryId]) -> Vec<EntryId> {
        ids.iter().copied().filter(|id| !self.consumed[id.0]).collect()
    }

    /// Mark every id consumed, or none of them.
    ///
    /// Fails when an id is already consumed, out of range, or listed twice.
    pub fn reserve(&mut self, ids: &[EntryId]) -> Result<(), ReconError> {
        let mut seen = HashSet::with_capacity(ids.len());
        for &id in ids {
            if id.0 >= self.entries.len() || self.consumed[id.0] || !seen.insert(id) {
                return Err(ReconError::EntryUnavailable(id));
            }
        }
        for &id in ids {
            self.consumed[id.0] = true;
        }
        Ok(())
    }

    pub fn consumed_count(&self) -> usize {
        self.consumed.iter().filter(|c| **c).count()
    }
}
