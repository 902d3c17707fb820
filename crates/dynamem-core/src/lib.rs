//! # dynamem
//!
//! An in-process, DynamoDB-style key-value engine.
//!
//! Records live in hash-key partitions ordered by sort key. Secondary
//! indexes hold pointers back into primary storage and are maintained on
//! every put and delete. Every partition and index bucket has its own
//! reader/writer lock, so work on independent keys proceeds in parallel.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dynamem_core::api::{Condition, Engine, QueryPlan};
//! use dynamem_core::types::IndexDefinition;
//! use serde_json::json;
//!
//! let engine = Engine::new();
//!
//! // Create a table
//! engine
//!     .table_builder("things")
//!     .hash_key("Id")
//!     .sort_key("Type")
//!     .index(IndexDefinition::new("by-owner", "OwnerId").sort_key("Type"))
//!     .execute()
//!     .unwrap();
//!
//! // Insert an item
//! engine
//!     .put_json("things", json!({"Id": "A", "Type": "x", "OwnerId": "o1"}))
//!     .unwrap();
//!
//! // Get it back
//! let item = engine.get("things", "A", Some("x")).unwrap();
//! assert_eq!(item.get_str("OwnerId").unwrap(), "o1");
//!
//! // Query a partition, newest sort key first
//! let result = engine
//!     .query("things", &QueryPlan::new().hash(Condition::eq("Id", "A")).descending())
//!     .unwrap();
//! assert_eq!(result.count, 1);
//! ```

pub mod api;
pub mod error;
pub mod index;
pub mod record;
pub mod storage;
pub mod types;
