//! Primary storage: concurrent ordered maps, partitions, and the partition set.

pub mod ordered_map;
pub mod partition;
pub mod partition_set;

use std::ops::Bound;

use crate::api::condition::{Condition, KeyLookup};

pub use ordered_map::ConcurrentOrderedMap;
pub use partition::Partition;
pub use partition_set::PartitionSet;

/// Select the values whose key satisfies `cond` (all values when `None`).
///
/// Equality is a point lookup and ordinal ranges are a contiguous scan;
/// anything else visits every key. The caller must have rejected reserved
/// operators, so evaluation here cannot fail.
pub(crate) fn select_by_key<V: Clone>(
    map: &ConcurrentOrderedMap<String, V>,
    cond: Option<&Condition>,
) -> Vec<V> {
    let Some(cond) = cond else {
        return map.values();
    };
    let mut out = Vec::new();
    let mut visit = |key: &String, value: &V| {
        if matches!(cond.passes(Some(key)), Ok(true)) {
            out.push(value.clone());
        }
    };
    match cond.key_lookup() {
        KeyLookup::Exact(key) => {
            map.for_each_in::<str, _, _>((Bound::Included(key), Bound::Included(key)), &mut visit)
        }
        KeyLookup::Range(lo, hi) => {
            map.for_each_in::<str, _, _>((as_str_bound(&lo), as_str_bound(&hi)), &mut visit)
        }
        KeyLookup::Empty => {}
        KeyLookup::Scan => map.for_each(&mut visit),
    }
    out
}

fn as_str_bound(bound: &Bound<String>) -> Bound<&str> {
    match bound {
        Bound::Included(s) => Bound::Included(s.as_str()),
        Bound::Excluded(s) => Bound::Excluded(s.as_str()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConcurrentOrderedMap<String, u32> {
        let map = ConcurrentOrderedMap::new();
        for (i, k) in ["10", "9", "a", "ab", "b"].iter().enumerate() {
            map.put(k.to_string(), i as u32);
        }
        map
    }

    #[test]
    fn test_select_all() {
        assert_eq!(select_by_key(&sample(), None).len(), 5);
    }

    #[test]
    fn test_select_exact() {
        assert_eq!(select_by_key(&sample(), Some(&Condition::eq("k", "a"))), vec![2]);
        assert!(select_by_key(&sample(), Some(&Condition::eq("k", "zz"))).is_empty());
    }

    #[test]
    fn test_select_prefix_range() {
        let vals = select_by_key(&sample(), Some(&Condition::begins_with("k", "a")));
        assert_eq!(vals, vec![2, 3]);
    }

    #[test]
    fn test_select_numeric_scan() {
        // "10" > 9 numerically even though it sorts first ordinally; the
        // non-integer keys compare ordinally and all sort after "9".
        let vals = select_by_key(&sample(), Some(&Condition::gt("k", 9)));
        assert_eq!(vals, vec![0, 2, 3, 4]);

        let vals = select_by_key(&sample(), Some(&Condition::lt("k", 10)));
        assert_eq!(vals, vec![1]);
    }
}
