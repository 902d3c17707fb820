//! Core types: table schemas, index definitions, and item pointers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Slot used inside an index bucket when a record has no index sort value.
pub const DEFAULT_INDEX_SLOT: &str = "default";

/// Schema definition for a table. Immutable once the table is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub hash_key: String,
    pub sort_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDefinition>,
    #[serde(default)]
    pub options: TableOptions,
}

impl TableSchema {
    /// Attribute names that make up the primary key.
    pub fn key_attributes(&self) -> Vec<&str> {
        let mut keys = vec![self.hash_key.as_str()];
        if let Some(sk) = &self.sort_key {
            keys.push(sk.as_str());
        }
        keys
    }

    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|idx| idx.name == name)
    }
}

/// Which attributes a secondary index may answer with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Projection {
    /// Every attribute of the record.
    #[default]
    All,
    /// Table and index key attributes only.
    KeysOnly,
    /// Key attributes plus the listed attributes.
    Include(Vec<String>),
}

/// A secondary index definition: an alternate (hash, [sort]) view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub hash_key: String,
    pub sort_key: Option<String>,
    #[serde(default)]
    pub projection: Projection,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, hash_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash_key: hash_key.into(),
            sort_key: None,
            projection: Projection::All,
        }
    }

    pub fn sort_key(mut self, name: impl Into<String>) -> Self {
        self.sort_key = Some(name.into());
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }
}

/// Per-table tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Drop a partition or index bucket once its last entry is removed.
    pub prune_empty_buckets: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            prune_empty_buckets: true,
        }
    }
}

/// The primary-storage address of a record.
///
/// Secondary indexes store these instead of record copies, so every index
/// lookup is two hops: index slot to pointer, pointer to partition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemPointer {
    pub hash_key: String,
    pub sort_key: Option<String>,
}

impl ItemPointer {
    pub fn new(hash_key: impl Into<String>, sort_key: Option<String>) -> Self {
        Self {
            hash_key: hash_key.into(),
            sort_key,
        }
    }

    /// Key of the record inside its partition. Tables without a sort key
    /// store their single item under the hash key itself.
    pub fn storage_sort_key(&self) -> &str {
        self.sort_key.as_deref().unwrap_or(&self.hash_key)
    }
}

impl fmt::Display for ItemPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sort_key {
            Some(sk) => write!(f, "({}, {})", self.hash_key, sk),
            None => write!(f, "({})", self.hash_key),
        }
    }
}
