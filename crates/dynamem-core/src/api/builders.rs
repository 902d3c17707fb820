use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Error, SchemaError};
use crate::types::{IndexDefinition, TableOptions, TableSchema};

use super::engine::Engine;
use super::table::Table;

// ---------------------------------------------------------------------------
// TableBuilder
// ---------------------------------------------------------------------------

/// Builder for creating a new table.
pub struct TableBuilder<'a> {
    engine: &'a Engine,
    name: String,
    hash_key: Option<String>,
    sort_key: Option<String>,
    indexes: Vec<IndexDefinition>,
    options: TableOptions,
}

impl<'a> TableBuilder<'a> {
    pub(crate) fn new(engine: &'a Engine, name: String) -> Self {
        Self {
            engine,
            name,
            hash_key: None,
            sort_key: None,
            indexes: Vec::new(),
            options: TableOptions::default(),
        }
    }

    /// Set the hash key attribute.
    pub fn hash_key(mut self, name: &str) -> Self {
        self.hash_key = Some(name.to_string());
        self
    }

    /// Set the (optional) sort key attribute.
    pub fn sort_key(mut self, name: &str) -> Self {
        self.sort_key = Some(name.to_string());
        self
    }

    /// Declare a secondary index.
    pub fn index(mut self, definition: IndexDefinition) -> Self {
        self.indexes.push(definition);
        self
    }

    pub fn options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate and return the schema without registering it.
    pub fn build(self) -> Result<TableSchema, Error> {
        let hash_key = self.hash_key.ok_or_else(|| SchemaError::InvalidSchema {
            table: self.name.clone(),
            reason: "hash key is required".to_string(),
        })?;
        let schema = TableSchema {
            name: self.name,
            hash_key,
            sort_key: self.sort_key,
            indexes: self.indexes,
            options: self.options,
        };
        validate_schema(&schema)?;
        Ok(schema)
    }

    /// Execute the table creation.
    pub fn execute(self) -> Result<Arc<Table>, Error> {
        let engine = self.engine;
        engine.create_table(self.build()?)
    }
}

/// Structural checks every table schema must pass before registration.
pub(crate) fn validate_schema(schema: &TableSchema) -> Result<(), Error> {
    let invalid = |reason: String| SchemaError::InvalidSchema {
        table: schema.name.clone(),
        reason,
    };

    if schema.name.is_empty() {
        return Err(invalid("table name must not be empty".to_string()).into());
    }
    if schema.hash_key.is_empty() {
        return Err(invalid("hash key must not be empty".to_string()).into());
    }
    if let Some(sk) = &schema.sort_key
        && (sk.is_empty() || *sk == schema.hash_key)
    {
        return Err(invalid(format!("invalid sort key '{sk}'")).into());
    }

    let mut names = HashSet::new();
    for index in &schema.indexes {
        if index.name.is_empty() {
            return Err(invalid("index name must not be empty".to_string()).into());
        }
        if !names.insert(index.name.as_str()) {
            return Err(invalid(format!("duplicate index '{}'", index.name)).into());
        }
        if index.hash_key.is_empty() {
            return Err(invalid(format!("index '{}' has no hash key", index.name)).into());
        }
    }
    Ok(())
}
