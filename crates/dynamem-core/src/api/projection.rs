//! Projection: trim index query results to the attributes an index exposes.
//!
//! Key attributes (table keys and index keys) are always included, whatever
//! the projection says.

use std::sync::Arc;

use crate::record::Record;
use crate::types::Projection;

/// Keep only `attrs` plus `key_attrs`. Attributes missing from the record
/// are skipped rather than materialized as null.
pub fn apply_projection(record: &Record, attrs: &[String], key_attrs: &[&str]) -> Record {
    let mut result = Record::new();

    for &key in key_attrs {
        if let Some(v) = record.get(key) {
            result.insert(key, v.clone());
        }
    }

    for attr in attrs {
        if let Some(v) = record.get(attr) {
            result.insert(attr.as_str(), v.clone());
        }
    }

    result
}

/// Apply an index projection to a shared record. `All` hands back the same
/// allocation.
pub fn project(record: Arc<Record>, projection: &Projection, key_attrs: &[&str]) -> Arc<Record> {
    match projection {
        Projection::All => record,
        Projection::KeysOnly => Arc::new(apply_projection(&record, &[], key_attrs)),
        Projection::Include(attrs) => Arc::new(apply_projection(&record, attrs, key_attrs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Record {
        Record::from_json(json!({
            "Id": "a",
            "Type": "x",
            "OwnerId": "o1",
            "name": "Alice",
            "age": 30
        }))
        .unwrap()
    }

    #[test]
    fn test_all_returns_same_allocation() {
        let record = Arc::new(doc());
        let out = project(Arc::clone(&record), &Projection::All, &["Id"]);
        assert!(Arc::ptr_eq(&record, &out));
    }

    #[test]
    fn test_keys_only() {
        let out = project(Arc::new(doc()), &Projection::KeysOnly, &["Id", "Type", "OwnerId"]);
        assert_eq!(
            out.to_json(),
            json!({"Id": "a", "Type": "x", "OwnerId": "o1"})
        );
    }

    #[test]
    fn test_include_adds_listed_attributes() {
        let projection = Projection::Include(vec!["name".to_string()]);
        let out = project(Arc::new(doc()), &projection, &["Id"]);
        assert_eq!(out.to_json(), json!({"Id": "a", "name": "Alice"}));
    }

    #[test]
    fn test_missing_attributes_skipped() {
        let out = apply_projection(&doc(), &["nope".to_string()], &["Id", "Missing"]);
        assert_eq!(out.to_json(), json!({"Id": "a"}));
    }
}
