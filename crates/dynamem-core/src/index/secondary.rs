use std::collections::HashSet;
use std::sync::Arc;

use crate::api::condition::ConditionSet;
use crate::error::ConditionError;
use crate::record::Record;
use crate::storage::ConcurrentOrderedMap;
use crate::storage::select_by_key;
use crate::types::{DEFAULT_INDEX_SLOT, IndexDefinition, ItemPointer};

/// Index sort value to the pointers stored under it.
type IndexBucket = ConcurrentOrderedMap<String, Vec<ItemPointer>>;

/// The (hash, sort) position a record occupies in an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSlot {
    pub hash: String,
    pub sort: String,
}

/// One alternate (hash, [sort]) view over a table's records.
///
/// Buckets hold [`ItemPointer`]s, never record copies. Duplicate-pointer
/// suppression inside a slot happens under the slot's bucket lock.
#[derive(Debug)]
pub struct SecondaryIndex {
    definition: IndexDefinition,
    buckets: ConcurrentOrderedMap<String, Arc<IndexBucket>>,
    prune_empty: bool,
}

impl SecondaryIndex {
    pub fn new(definition: IndexDefinition, prune_empty: bool) -> Self {
        Self {
            definition,
            buckets: ConcurrentOrderedMap::new(),
            prune_empty,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &IndexDefinition {
        &self.definition
    }

    /// Where `record` belongs in this index, or `None` if it lacks the index
    /// hash attribute. Records without the index sort attribute share the
    /// default slot.
    pub fn slot_for(&self, record: &Record) -> Option<IndexSlot> {
        let hash = record.get_str(&self.definition.hash_key)?.into_owned();
        let sort = self
            .definition
            .sort_key
            .as_deref()
            .and_then(|sk| record.get_str(sk))
            .map(|s| s.into_owned())
            .unwrap_or_else(|| DEFAULT_INDEX_SLOT.to_string());
        Some(IndexSlot { hash, sort })
    }

    pub fn index(&self, record: &Record, pointer: &ItemPointer) {
        if let Some(slot) = self.slot_for(record) {
            self.add_to_slot(&slot, pointer);
        }
    }

    /// No-op if the pointer is not indexed.
    pub fn remove(&self, record: &Record, pointer: &ItemPointer) {
        if let Some(slot) = self.slot_for(record) {
            self.remove_from_slot(&slot, pointer);
        }
    }

    /// Move `pointer` from the slot of `previous` to the slot of `current`.
    /// The new entry is written before the old one is dropped.
    pub fn reindex(&self, previous: Option<&Record>, current: &Record, pointer: &ItemPointer) {
        let new_slot = self.slot_for(current);
        if let Some(slot) = &new_slot {
            self.add_to_slot(slot, pointer);
        }
        if let Some(old_slot) = previous.and_then(|r| self.slot_for(r))
            && new_slot.as_ref() != Some(&old_slot)
        {
            self.remove_from_slot(&old_slot, pointer);
        }
    }

    /// Pointers whose slot satisfies the hash and sort conditions,
    /// de-duplicated, in (hash, sort) order. Residual filters are not
    /// applied here; they need the dereferenced record.
    pub fn query(&self, conditions: &ConditionSet<'_>) -> Result<Vec<ItemPointer>, ConditionError> {
        conditions.check_supported()?;

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for bucket in select_by_key(&self.buckets, conditions.hash) {
            for pointers in select_by_key(&*bucket, conditions.sort) {
                for pointer in pointers {
                    if seen.insert(pointer.clone()) {
                        out.push(pointer);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Total number of pointers held.
    pub fn entry_count(&self) -> usize {
        self.buckets
            .values()
            .iter()
            .map(|bucket| bucket.values().iter().map(Vec::len).sum::<usize>())
            .sum()
    }

    fn add_to_slot(&self, slot: &IndexSlot, pointer: &ItemPointer) {
        loop {
            let bucket = self
                .buckets
                .get_or_create(slot.hash.clone(), || Arc::new(IndexBucket::new()));
            bucket.upsert(slot.sort.clone(), Vec::new, |pointers| {
                if !pointers.contains(pointer) {
                    pointers.push(pointer.clone());
                }
            });
            if !self.prune_empty || self.is_live(&slot.hash, &bucket) {
                return;
            }
        }
    }

    fn remove_from_slot(&self, slot: &IndexSlot, pointer: &ItemPointer) {
        let Some(bucket) = self.buckets.get(slot.hash.as_str()) else {
            return;
        };
        let emptied = bucket.update(slot.sort.as_str(), |pointers| {
            pointers.retain(|p| p != pointer);
            pointers.is_empty()
        });
        if self.prune_empty && emptied == Some(true) {
            bucket.remove_if(slot.sort.as_str(), Vec::is_empty);
            if bucket.is_empty() {
                self.buckets.remove_if(slot.hash.as_str(), |b| {
                    Arc::ptr_eq(b, &bucket) && b.is_empty()
                });
            }
        }
    }

    fn is_live(&self, hash: &str, bucket: &Arc<IndexBucket>) -> bool {
        self.buckets
            .get(hash)
            .is_some_and(|live| Arc::ptr_eq(&live, bucket))
    }
}
