use std::collections::BTreeMap;

use crate::api::condition::ConditionSet;
use crate::error::{Error, SchemaError};
use crate::record::Record;
use crate::types::{IndexDefinition, ItemPointer};

use super::SecondaryIndex;

/// Every secondary index of one table, by name.
///
/// The set is fixed when the table is created, so the map itself needs no
/// lock; each index guards its own buckets.
#[derive(Debug)]
pub struct IndexSet {
    indexes: BTreeMap<String, SecondaryIndex>,
}

impl IndexSet {
    pub fn new(definitions: &[IndexDefinition], prune_empty: bool) -> Self {
        let indexes = definitions
            .iter()
            .map(|def| (def.name.clone(), SecondaryIndex::new(def.clone(), prune_empty)))
            .collect();
        Self { indexes }
    }

    pub fn get(&self, name: &str) -> Result<&SecondaryIndex, Error> {
        self.indexes
            .get(name)
            .ok_or_else(|| SchemaError::UnknownIndex(name.to_string()).into())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SecondaryIndex> {
        self.indexes.values()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn index(&self, record: &Record, pointer: &ItemPointer) {
        for index in self.indexes.values() {
            index.index(record, pointer);
        }
    }

    pub fn remove(&self, record: &Record, pointer: &ItemPointer) {
        for index in self.indexes.values() {
            index.remove(record, pointer);
        }
    }

    pub fn reindex(&self, previous: Option<&Record>, current: &Record, pointer: &ItemPointer) {
        for index in self.indexes.values() {
            index.reindex(previous, current, pointer);
        }
    }

    /// Route a query to the named index.
    pub fn query(&self, name: &str, conditions: &ConditionSet<'_>) -> Result<Vec<ItemPointer>, Error> {
        Ok(self.get(name)?.query(conditions)?)
    }
}
