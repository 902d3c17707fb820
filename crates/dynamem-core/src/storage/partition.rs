use std::sync::Arc;

use crate::api::condition::ConditionSet;
use crate::error::ConditionError;
use crate::record::Record;

use super::{ConcurrentOrderedMap, select_by_key};

/// Every record sharing one hash-key value, ordered by sort key.
#[derive(Debug)]
pub struct Partition {
    hash_key: String,
    items: ConcurrentOrderedMap<String, Arc<Record>>,
}

impl Partition {
    pub fn new(hash_key: impl Into<String>) -> Self {
        Self {
            hash_key: hash_key.into(),
            items: ConcurrentOrderedMap::new(),
        }
    }

    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    /// Insert or overwrite, returning the stored record.
    pub fn put(&self, sort_key: impl Into<String>, record: Arc<Record>) -> Arc<Record> {
        self.replace(sort_key, Arc::clone(&record));
        record
    }

    /// Insert or overwrite, returning the record that was replaced.
    pub fn replace(&self, sort_key: impl Into<String>, record: Arc<Record>) -> Option<Arc<Record>> {
        self.items.put(sort_key.into(), record)
    }

    pub fn get(&self, sort_key: &str) -> Option<Arc<Record>> {
        self.items.get(sort_key)
    }

    /// All records in ascending sort-key order.
    pub fn get_all(&self) -> Vec<Arc<Record>> {
        self.items.values()
    }

    pub fn remove(&self, sort_key: &str) -> Option<Arc<Record>> {
        self.items.remove(sort_key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Records matching the hash, sort, and residual conditions, in
    /// ascending sort-key order.
    pub fn query(&self, conditions: &ConditionSet<'_>) -> Result<Vec<Arc<Record>>, ConditionError> {
        conditions.check_supported()?;

        if let Some(hash) = conditions.hash
            && !hash.passes(Some(&self.hash_key))?
        {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        for record in select_by_key(&self.items, conditions.sort) {
            if conditions.filters_match(&record)? {
                out.push(record);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::condition::Condition;

    fn record(id: &str, ty: &str, n: i64) -> Arc<Record> {
        Arc::new(Record::new().with("Id", id).with("Type", ty).with("N", n))
    }

    fn sample() -> Partition {
        let p = Partition::new("A");
        for (ty, n) in [("z", 3), ("x", 1), ("y", 2)] {
            p.put(ty, record("A", ty, n));
        }
        p
    }

    fn types(records: &[Arc<Record>]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.get_str("Type").unwrap().into_owned())
            .collect()
    }

    #[test]
    fn test_put_get_overwrite() {
        let p = sample();
        assert_eq!(p.len(), 3);
        assert_eq!(p.get("x").unwrap().get_str("N").unwrap(), "1");

        let previous = p.replace("x", record("A", "x", 10));
        assert_eq!(previous.unwrap().get_str("N").unwrap(), "1");
        assert_eq!(p.get("x").unwrap().get_str("N").unwrap(), "10");
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn test_get_all_ordered() {
        assert_eq!(types(&sample().get_all()), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_remove() {
        let p = sample();
        assert!(p.remove("y").is_some());
        assert!(p.remove("y").is_none());
        assert!(p.get("y").is_none());
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_query_hash_mismatch_is_empty() {
        let hash = Condition::eq("Id", "B");
        let conds = ConditionSet {
            hash: Some(&hash),
            ..Default::default()
        };
        assert!(sample().query(&conds).unwrap().is_empty());
    }

    #[test]
    fn test_query_sort_equality() {
        let sort = Condition::eq("Type", "y");
        let conds = ConditionSet {
            sort: Some(&sort),
            ..Default::default()
        };
        assert_eq!(types(&sample().query(&conds).unwrap()), vec!["y"]);

        let sort = Condition::eq("Type", "missing");
        let conds = ConditionSet {
            sort: Some(&sort),
            ..Default::default()
        };
        assert!(sample().query(&conds).unwrap().is_empty());
    }

    #[test]
    fn test_query_sort_range() {
        let sort = Condition::gt("Type", "x");
        let conds = ConditionSet {
            sort: Some(&sort),
            ..Default::default()
        };
        assert_eq!(types(&sample().query(&conds).unwrap()), vec!["y", "z"]);
    }

    #[test]
    fn test_query_with_filters() {
        let filters = [Condition::ge("N", 2)];
        let conds = ConditionSet {
            filters: &filters,
            ..Default::default()
        };
        assert_eq!(types(&sample().query(&conds).unwrap()), vec!["y", "z"]);
    }

    #[test]
    fn test_query_rejects_reserved_operator() {
        let filters = [Condition::contains("Type", "x")];
        let conds = ConditionSet {
            filters: &filters,
            ..Default::default()
        };
        assert!(matches!(
            sample().query(&conds),
            Err(ConditionError::NotImplemented(_))
        ));
    }
}
