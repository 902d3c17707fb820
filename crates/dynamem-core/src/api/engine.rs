use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, SchemaError};
use crate::record::Record;
use crate::storage::ConcurrentOrderedMap;
use crate::types::{IndexDefinition, TableSchema};

use super::builders::{TableBuilder, validate_schema};
use super::query::{QueryPlan, QueryResult};
use super::table::Table;

#[derive(Debug, Default)]
struct EngineInner {
    tables: ConcurrentOrderedMap<String, Arc<Table>>,
}

/// The engine handle: a registry of independent tables.
///
/// `Engine` is cheaply clonable (`Arc`-based) and `Send + Sync`. Each
/// `Engine::new()` is a separate registry; clones share one.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a table schema registered on `execute()`.
    pub fn table_builder(&self, name: &str) -> TableBuilder<'_> {
        TableBuilder::new(self, name.to_string())
    }

    /// Register a new empty table.
    pub fn create_table(&self, schema: TableSchema) -> Result<Arc<Table>, Error> {
        validate_schema(&schema)?;
        let name = schema.name.clone();

        let mut created = false;
        let table = self.inner.tables.get_or_create(name.clone(), || {
            created = true;
            Arc::new(Table::new(schema))
        });
        if !created {
            return Err(SchemaError::DuplicateTable(name).into());
        }

        debug!(
            table = %name,
            indexes = table.schema().indexes.len(),
            "created table"
        );
        Ok(table)
    }

    /// Drop a table and everything in it.
    pub fn drop_table(&self, name: &str) -> Result<(), Error> {
        self.inner
            .tables
            .remove(name)
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))?;
        debug!(table = %name, "dropped table");
        Ok(())
    }

    /// List all table names, sorted.
    pub fn list_tables(&self) -> Vec<String> {
        self.inner.tables.keys()
    }

    pub fn describe_table(&self, name: &str) -> Result<TableSchema, Error> {
        Ok(self.table(name)?.schema().clone())
    }

    pub fn list_indexes(&self, table: &str) -> Result<Vec<IndexDefinition>, Error> {
        Ok(self.table(table)?.schema().indexes.clone())
    }

    /// Describe a specific secondary index by name.
    pub fn describe_index(&self, table: &str, index: &str) -> Result<IndexDefinition, Error> {
        self.table(table)?
            .schema()
            .index(index)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownIndex(index.to_string()).into())
    }

    pub fn table(&self, name: &str) -> Result<Arc<Table>, Error> {
        self.inner
            .tables
            .get(name)
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()).into())
    }

    pub fn put(&self, table: &str, record: Record) -> Result<Arc<Record>, Error> {
        self.table(table)?.put(record)
    }

    /// Put a batch of records; see [`Table::put_many`].
    pub fn put_many(&self, table: &str, records: Vec<Record>) -> Result<Vec<Arc<Record>>, Error> {
        self.table(table)?.put_many(records)
    }

    /// Put a flat JSON object.
    pub fn put_json(&self, table: &str, document: serde_json::Value) -> Result<Arc<Record>, Error> {
        let table = self.table(table)?;
        table.put(Record::from_json(document)?)
    }

    pub fn get(&self, table: &str, hash: &str, sort: Option<&str>) -> Result<Arc<Record>, Error> {
        self.table(table)?.get(hash, sort)
    }

    pub fn get_partition(&self, table: &str, hash: &str) -> Result<Vec<Arc<Record>>, Error> {
        Ok(self.table(table)?.get_partition(hash))
    }

    pub fn get_by_index(
        &self,
        table: &str,
        index: &str,
        hash: &str,
        sort: Option<&str>,
    ) -> Result<Vec<Arc<Record>>, Error> {
        self.table(table)?.get_by_index(index, hash, sort)
    }

    pub fn delete(&self, table: &str, record: &Record) -> Result<Arc<Record>, Error> {
        self.table(table)?.delete(record)
    }

    pub fn delete_many(&self, table: &str, records: &[Record]) -> Result<Vec<Arc<Record>>, Error> {
        self.table(table)?.delete_many(records)
    }

    pub fn delete_key(
        &self,
        table: &str,
        hash: &str,
        sort: Option<&str>,
    ) -> Result<Arc<Record>, Error> {
        self.table(table)?.delete_key(hash, sort)
    }

    pub fn query(&self, table: &str, plan: &QueryPlan) -> Result<QueryResult, Error> {
        self.table(table)?.query(plan)
    }

    pub fn scan(&self, table: &str, plan: &QueryPlan) -> Result<QueryResult, Error> {
        self.table(table)?.scan(plan)
    }

    pub fn delete_matching(&self, table: &str, plan: &QueryPlan) -> Result<usize, Error> {
        self.table(table)?.delete_matching(plan)
    }
}
