use std::sync::Arc;

use crate::api::condition::ConditionSet;
use crate::error::ConditionError;
use crate::record::Record;
use crate::types::ItemPointer;

use super::{ConcurrentOrderedMap, Partition, select_by_key};

/// Hash-key value to [`Partition`]: the primary store of one table.
///
/// Partitions are created on first write. With pruning enabled, a partition
/// is dropped once its last record is removed; the only nested locking in
/// the store is that prune step (set lock, then partition lock), and no path
/// takes them in the other order.
#[derive(Debug)]
pub struct PartitionSet {
    partitions: ConcurrentOrderedMap<String, Arc<Partition>>,
    prune_empty: bool,
}

impl PartitionSet {
    pub fn new(prune_empty: bool) -> Self {
        Self {
            partitions: ConcurrentOrderedMap::new(),
            prune_empty,
        }
    }

    /// Store `record` at `pointer`, returning the record it replaced.
    pub fn put(&self, pointer: &ItemPointer, record: Arc<Record>) -> Option<Arc<Record>> {
        loop {
            let partition = self
                .partitions
                .get_or_create(pointer.hash_key.clone(), || {
                    Arc::new(Partition::new(pointer.hash_key.clone()))
                });
            let previous = partition.replace(pointer.storage_sort_key(), Arc::clone(&record));
            // A concurrent prune may have detached the partition between the
            // lookup and the write; retry against the live one.
            if !self.prune_empty || self.is_live(&pointer.hash_key, &partition) {
                return previous;
            }
        }
    }

    pub fn get(&self, pointer: &ItemPointer) -> Option<Arc<Record>> {
        self.partitions
            .get(pointer.hash_key.as_str())?
            .get(pointer.storage_sort_key())
    }

    /// Every record under one hash key, in ascending sort-key order.
    pub fn get_partition(&self, hash_key: &str) -> Vec<Arc<Record>> {
        self.partitions
            .get(hash_key)
            .map(|p| p.get_all())
            .unwrap_or_default()
    }

    pub fn remove(&self, pointer: &ItemPointer) -> Option<Arc<Record>> {
        let partition = self.partitions.get(pointer.hash_key.as_str())?;
        let removed = partition.remove(pointer.storage_sort_key());
        if self.prune_empty && removed.is_some() && partition.is_empty() {
            self.partitions.remove_if(pointer.hash_key.as_str(), |p| {
                Arc::ptr_eq(p, &partition) && p.is_empty()
            });
        }
        removed
    }

    /// Records matching `conditions`. Equality on the hash key resolves one
    /// partition directly; other hash predicates visit every partition whose
    /// key passes. Results are grouped by partition in hash-key order.
    pub fn query(&self, conditions: &ConditionSet<'_>) -> Result<Vec<Arc<Record>>, ConditionError> {
        conditions.check_supported()?;

        let mut out = Vec::new();
        for partition in select_by_key(&self.partitions, conditions.hash) {
            out.extend(partition.query(conditions)?);
        }
        Ok(out)
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn item_count(&self) -> usize {
        self.partitions.values().iter().map(|p| p.len()).sum()
    }

    fn is_live(&self, hash_key: &str, partition: &Arc<Partition>) -> bool {
        self.partitions
            .get(hash_key)
            .is_some_and(|live| Arc::ptr_eq(&live, partition))
    }
}
