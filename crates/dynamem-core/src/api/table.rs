//! The table orchestrator: primary storage plus its secondary indexes.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::{Error, QueryError, SchemaError};
use crate::index::IndexSet;
use crate::record::Record;
use crate::storage::PartitionSet;
use crate::types::{IndexDefinition, ItemPointer, TableSchema};

use super::condition::{Condition, ConditionSet};
use super::projection::project;
use super::query::{Page, PageToken, QueryPlan, QueryResult, QueryTarget, paginate};

/// One table. Writes update primary storage first and indexes second;
/// deletes unindex first and remove from primary storage second. Both then
/// re-read storage and repair any index step a concurrent writer raced.
#[derive(Debug)]
pub struct Table {
    schema: TableSchema,
    partitions: PartitionSet,
    indexes: IndexSet,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        let prune = schema.options.prune_empty_buckets;
        Self {
            partitions: PartitionSet::new(prune),
            indexes: IndexSet::new(&schema.indexes, prune),
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Insert or overwrite a record, re-indexing it if an overwrite moved
    /// its indexed attributes.
    pub fn put(&self, record: Record) -> Result<Arc<Record>, Error> {
        let pointer = record.pointer(&self.schema)?;
        Ok(self.put_at(pointer, record))
    }

    /// Put every record in order. Keys are checked for the whole batch
    /// first, so a schema violation anywhere writes nothing.
    pub fn put_many(&self, records: Vec<Record>) -> Result<Vec<Arc<Record>>, Error> {
        let pointers = records
            .iter()
            .map(|record| record.pointer(&self.schema))
            .collect::<Result<Vec<_>, _>>()?;

        let stored: Vec<_> = pointers
            .into_iter()
            .zip(records)
            .map(|(pointer, record)| self.put_at(pointer, record))
            .collect();
        debug!(table = %self.schema.name, items = stored.len(), "put batch");
        Ok(stored)
    }

    fn put_at(&self, pointer: ItemPointer, record: Record) -> Arc<Record> {
        let record = Arc::new(record);

        let previous = self.partitions.put(&pointer, Arc::clone(&record));
        self.indexes.reindex(previous.as_deref(), &record, &pointer);
        self.converge(&pointer, Some(Arc::clone(&record)));

        debug!(
            table = %self.schema.name,
            %pointer,
            replaced = previous.is_some(),
            "put item"
        );
        record
    }

    /// Fetch one record by key. `sort` is ignored on tables without a sort
    /// key and required on tables with one.
    pub fn get(&self, hash: &str, sort: Option<&str>) -> Result<Arc<Record>, Error> {
        let pointer = self.pointer_for(hash, sort)?;
        self.partitions
            .get(&pointer)
            .ok_or_else(|| self.not_found(pointer))
    }

    /// Every record under one hash key, ascending by sort key. Empty if the
    /// hash key has never been written.
    pub fn get_partition(&self, hash: &str) -> Vec<Arc<Record>> {
        self.partitions.get_partition(hash)
    }

    /// Delete the record stored at `record`'s key.
    pub fn delete(&self, record: &Record) -> Result<Arc<Record>, Error> {
        let pointer = record.pointer(&self.schema)?;
        self.delete_pointer(&pointer)
    }

    /// Delete the record stored at each record's key. Keys are checked for
    /// the whole batch first; keys with nothing stored are skipped. Returns
    /// the records removed, in batch order.
    pub fn delete_many(&self, records: &[Record]) -> Result<Vec<Arc<Record>>, Error> {
        let pointers = records
            .iter()
            .map(|record| record.pointer(&self.schema))
            .collect::<Result<Vec<_>, _>>()?;

        let mut removed = Vec::with_capacity(pointers.len());
        for pointer in &pointers {
            match self.delete_pointer(pointer) {
                Ok(record) => removed.push(record),
                Err(Error::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        debug!(table = %self.schema.name, deleted = removed.len(), "delete batch");
        Ok(removed)
    }

    pub fn delete_key(&self, hash: &str, sort: Option<&str>) -> Result<Arc<Record>, Error> {
        let pointer = self.pointer_for(hash, sort)?;
        self.delete_pointer(&pointer)
    }

    pub fn delete_pointer(&self, pointer: &ItemPointer) -> Result<Arc<Record>, Error> {
        let stored = self
            .partitions
            .get(pointer)
            .ok_or_else(|| self.not_found(pointer.clone()))?;
        self.indexes.remove(&stored, pointer);

        let removed = self
            .partitions
            .remove(pointer)
            .ok_or_else(|| self.not_found(pointer.clone()))?;
        if !Arc::ptr_eq(&removed, &stored) {
            self.indexes.remove(&removed, pointer);
        }
        self.converge(pointer, None);

        debug!(table = %self.schema.name, %pointer, "delete item");
        Ok(removed)
    }

    /// Run a query. Without a hash condition this is a full scan of the
    /// target. Zero matches is an empty result, never an error.
    pub fn query(&self, plan: &QueryPlan) -> Result<QueryResult, Error> {
        let target = plan.resolve(&self.schema)?;
        let page = self.execute(plan, &target)?;

        let items: Vec<Arc<Record>> = match target.index {
            Some(def) => {
                let keys = self.index_key_attributes(def);
                page.entries
                    .into_iter()
                    .map(|(_, record)| project(record, &def.projection, &keys))
                    .collect()
            }
            None => page.entries.into_iter().map(|(_, record)| record).collect(),
        };

        Ok(QueryResult {
            items,
            count: page.count,
            next_page_token: page.next_page_token,
        })
    }

    /// A query that must not carry key conditions.
    pub fn scan(&self, plan: &QueryPlan) -> Result<QueryResult, Error> {
        if !plan.is_scan() || plan.sort_condition.is_some() {
            return Err(QueryError::KeyConditionOnScan.into());
        }
        self.query(plan)
    }

    /// Equality lookup through a secondary index, returning full records.
    pub fn get_by_index(
        &self,
        index: &str,
        hash: &str,
        sort: Option<&str>,
    ) -> Result<Vec<Arc<Record>>, Error> {
        let def = self
            .schema
            .index(index)
            .ok_or_else(|| SchemaError::UnknownIndex(index.to_string()))?;

        let mut plan = QueryPlan::on_index(index).hash(Condition::eq(def.hash_key.as_str(), hash));
        if let Some(sort) = sort {
            let sort_key = def.sort_key.as_deref().unwrap_or_default();
            plan = plan.sort(Condition::eq(sort_key, sort));
        }

        let target = plan.resolve(&self.schema)?;
        let page = self.execute(&plan, &target)?;
        Ok(page.entries.into_iter().map(|(_, record)| record).collect())
    }

    /// Delete every item the plan returns. Returns how many were deleted;
    /// items removed concurrently are skipped.
    pub fn delete_matching(&self, plan: &QueryPlan) -> Result<usize, Error> {
        let target = plan.resolve(&self.schema)?;
        let page = self.execute(plan, &target)?;

        let mut deleted = 0;
        for (position, _) in page.entries {
            match self.delete_pointer(&position.pointer) {
                Ok(_) => deleted += 1,
                Err(Error::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        debug!(table = %self.schema.name, deleted, "delete matching");
        Ok(deleted)
    }

    pub fn item_count(&self) -> usize {
        self.partitions.item_count()
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.partition_count()
    }

    pub fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    fn execute(&self, plan: &QueryPlan, target: &QueryTarget<'_>) -> Result<Page, Error> {
        let resume = plan
            .page_token
            .as_deref()
            .map(PageToken::decode)
            .transpose()?;
        let conditions = plan.conditions();
        trace!(table = %self.schema.name, stage = ?plan.stage(), "execute plan");

        let matches = match target.index {
            Some(def) => self.index_matches(def, target, &conditions)?,
            None => self.primary_matches(target, &conditions)?,
        };

        paginate(matches, plan.descending, plan.limit, resume.as_ref())
    }

    fn primary_matches(
        &self,
        target: &QueryTarget<'_>,
        conditions: &ConditionSet<'_>,
    ) -> Result<Vec<(PageToken, Arc<Record>)>, Error> {
        trace!(
            table = %self.schema.name,
            path = if conditions.hash.is_some() { "partition" } else { "full-scan" },
            "resolve query"
        );

        self.partitions
            .query(conditions)?
            .into_iter()
            .map(|record| -> Result<_, Error> {
                let pointer = record.pointer(&self.schema)?;
                Ok((target.position(&record, pointer), record))
            })
            .collect()
    }

    /// Index hits dereferenced through primary storage. Entries whose
    /// record is gone or no longer sits in a matching slot are dropped.
    fn index_matches(
        &self,
        def: &IndexDefinition,
        target: &QueryTarget<'_>,
        conditions: &ConditionSet<'_>,
    ) -> Result<Vec<(PageToken, Arc<Record>)>, Error> {
        trace!(
            table = %self.schema.name,
            index = %def.name,
            path = if conditions.hash.is_some() { "index-lookup" } else { "index-scan" },
            "resolve query"
        );

        let pointers = self.indexes.query(&def.name, conditions)?;
        let index = self.indexes.get(&def.name)?;
        let mut out = Vec::new();
        for pointer in pointers {
            let Some(record) = self.partitions.get(&pointer) else {
                warn!(
                    table = %self.schema.name,
                    index = %def.name,
                    %pointer,
                    "index entry points at a missing record"
                );
                continue;
            };

            let in_slot = match index.slot_for(&record) {
                Some(slot) => {
                    key_passes(conditions.hash, &slot.hash)?
                        && key_passes(conditions.sort, &slot.sort)?
                }
                None => false,
            };
            if !in_slot {
                warn!(
                    table = %self.schema.name,
                    index = %def.name,
                    %pointer,
                    "index entry is stale"
                );
                continue;
            }

            if conditions.filters_match(&record)? {
                out.push((target.position(&record, pointer), record));
            }
        }
        Ok(out)
    }

    /// Bring the indexes in line with whatever is stored at `pointer` now.
    /// `indexed` is the record this caller last indexed there, if any.
    ///
    /// Concurrent writes to one key interleave their index steps; each
    /// writer loops until the record it last indexed is the stored one, so
    /// the last writer to finish leaves the indexes matching storage.
    fn converge(&self, pointer: &ItemPointer, mut indexed: Option<Arc<Record>>) {
        loop {
            let current = self.partitions.get(pointer);
            match (&current, &indexed) {
                (Some(c), Some(i)) if Arc::ptr_eq(c, i) => return,
                (None, None) => return,
                (Some(c), i) => self.indexes.reindex(i.as_deref(), c, pointer),
                (None, Some(i)) => self.indexes.remove(i, pointer),
            }
            trace!(table = %self.schema.name, %pointer, "re-converging indexes");
            indexed = current;
        }
    }

    fn index_key_attributes<'a>(&'a self, def: &'a IndexDefinition) -> Vec<&'a str> {
        let mut keys = self.schema.key_attributes();
        keys.push(&def.hash_key);
        if let Some(sk) = &def.sort_key {
            keys.push(sk);
        }
        keys
    }

    fn pointer_for(&self, hash: &str, sort: Option<&str>) -> Result<ItemPointer, Error> {
        let sort = match &self.schema.sort_key {
            Some(sk) => Some(
                sort.ok_or_else(|| SchemaError::MissingKeyAttribute(sk.clone()))?
                    .to_string(),
            ),
            None => None,
        };
        Ok(ItemPointer::new(hash, sort))
    }

    fn not_found(&self, pointer: ItemPointer) -> Error {
        Error::NotFound {
            table: self.schema.name.clone(),
            pointer,
        }
    }
}

fn key_passes(cond: Option<&Condition>, value: &str) -> Result<bool, Error> {
    match cond {
        Some(cond) => Ok(cond.passes(Some(value))?),
        None => Ok(true),
    }
}
