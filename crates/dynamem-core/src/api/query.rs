//! Query plans, key-condition validation, ordering, and pagination.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, QueryError, SchemaError};
use crate::record::Record;
use crate::types::{IndexDefinition, ItemPointer, TableSchema};

use super::condition::{Condition, ConditionSet};

/// One query or scan request.
///
/// Resolution branches once on the target (index or primary storage) and
/// once on whether a hash condition is present; without one the request is
/// a full scan of the target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub index: Option<String>,
    pub hash_condition: Option<Condition>,
    pub sort_condition: Option<Condition>,
    #[serde(default)]
    pub filters: Vec<Condition>,
    #[serde(default)]
    pub descending: bool,
    /// Maximum items per page; `0` means unlimited.
    #[serde(default)]
    pub limit: usize,
    pub page_token: Option<String>,
}

/// How far a plan has been seeded. Key conditions must arrive in order:
/// a sort condition is only meaningful once the hash key is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueryStage {
    Unseeded,
    HashSeeded,
    SortSeeded,
    Filtered,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// A query against a secondary index instead of primary storage.
    pub fn on_index(name: impl Into<String>) -> Self {
        Self::new().index(name)
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index = Some(name.into());
        self
    }

    pub fn hash(mut self, condition: Condition) -> Self {
        self.hash_condition = Some(condition);
        self
    }

    pub fn sort(mut self, condition: Condition) -> Self {
        self.sort_condition = Some(condition);
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.filters.push(condition);
        self
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = n;
        self
    }

    pub fn page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }

    pub fn stage(&self) -> QueryStage {
        if !self.filters.is_empty() {
            QueryStage::Filtered
        } else if self.sort_condition.is_some() {
            QueryStage::SortSeeded
        } else if self.hash_condition.is_some() {
            QueryStage::HashSeeded
        } else {
            QueryStage::Unseeded
        }
    }

    pub fn is_scan(&self) -> bool {
        self.hash_condition.is_none()
    }

    pub(crate) fn conditions(&self) -> ConditionSet<'_> {
        ConditionSet {
            hash: self.hash_condition.as_ref(),
            sort: self.sort_condition.as_ref(),
            filters: &self.filters,
        }
    }

    /// Check the plan against `schema` and resolve the key attributes it
    /// runs against.
    pub(crate) fn resolve<'s>(&self, schema: &'s TableSchema) -> Result<QueryTarget<'s>, Error> {
        let target = match &self.index {
            Some(name) => {
                let def = schema
                    .index(name)
                    .ok_or_else(|| SchemaError::UnknownIndex(name.clone()))?;
                QueryTarget {
                    index: Some(def),
                    hash_key: &def.hash_key,
                    sort_key: def.sort_key.as_deref(),
                    order_key: schema.sort_key.as_deref(),
                }
            }
            None => QueryTarget {
                index: None,
                hash_key: &schema.hash_key,
                sort_key: schema.sort_key.as_deref(),
                order_key: schema.sort_key.as_deref(),
            },
        };

        if let Some(hash) = &self.hash_condition
            && hash.attribute != target.hash_key
        {
            return Err(QueryError::NonKeyAttribute {
                attribute: hash.attribute.clone(),
                role: "hash",
                expected: target.hash_key.to_string(),
            }
            .into());
        }

        if let Some(sort) = &self.sort_condition {
            if self.hash_condition.is_none() {
                return Err(QueryError::SortWithoutHash.into());
            }
            let Some(sort_key) = target.sort_key else {
                return Err(match target.index {
                    Some(def) => QueryError::IndexSortKeyNotSupported(def.name.clone()),
                    None => QueryError::SortKeyNotSupported,
                }
                .into());
            };
            if sort.attribute != sort_key {
                return Err(QueryError::NonKeyAttribute {
                    attribute: sort.attribute.clone(),
                    role: "sort",
                    expected: sort_key.to_string(),
                }
                .into());
            }
        }

        self.conditions().check_supported()?;
        Ok(target)
    }
}

/// The storage a plan resolved to, with the key attributes its conditions
/// are validated against and the attribute results are ordered by.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueryTarget<'s> {
    pub index: Option<&'s IndexDefinition>,
    pub hash_key: &'s str,
    pub sort_key: Option<&'s str>,
    /// Always the table's sort key, index queries included.
    pub order_key: Option<&'s str>,
}

impl QueryTarget<'_> {
    /// Ordering key of one result: the table sort value (empty when the
    /// table has none or the record lacks it), ties broken by pointer.
    pub fn position(&self, record: &Record, pointer: ItemPointer) -> PageToken {
        let sort_value = self
            .order_key
            .and_then(|sk| record.get_str(sk))
            .map(|s| s.into_owned())
            .unwrap_or_default();
        PageToken {
            sort_value,
            pointer,
        }
    }
}

/// Resume point of a paginated query: the position of the last item
/// returned. Tokens are only meaningful for the plan that produced them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageToken {
    pub sort_value: String,
    pub pointer: ItemPointer,
}

impl PageToken {
    pub fn encode(&self) -> Result<String, Error> {
        serde_json::to_string(self)
            .map_err(|e| QueryError::InvalidPageToken(e.to_string()).into())
    }

    pub fn decode(token: &str) -> Result<Self, Error> {
        serde_json::from_str(token).map_err(|e| QueryError::InvalidPageToken(e.to_string()).into())
    }
}

/// Result of a query or scan.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub items: Vec<Arc<Record>>,
    /// Matches before pagination and limit.
    pub count: usize,
    /// Present when more matches follow this page.
    pub next_page_token: Option<String>,
}

/// One ordered, paginated page with each item's position kept alongside.
#[derive(Debug, Default)]
pub(crate) struct Page {
    pub entries: Vec<(PageToken, Arc<Record>)>,
    pub count: usize,
    pub next_page_token: Option<String>,
}

/// Order matches by position (reversed when descending), skip past
/// `resume`, and cut to `limit`.
pub(crate) fn paginate(
    mut entries: Vec<(PageToken, Arc<Record>)>,
    descending: bool,
    limit: usize,
    resume: Option<&PageToken>,
) -> Result<Page, Error> {
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    if descending {
        entries.reverse();
    }

    let count = entries.len();
    let start = match resume {
        Some(token) if descending => entries.partition_point(|(pos, _)| pos >= token),
        Some(token) => entries.partition_point(|(pos, _)| pos <= token),
        None => 0,
    };
    let end = if limit > 0 {
        start.saturating_add(limit).min(count)
    } else {
        count
    };

    let next_page_token = if end < count && end > start {
        Some(entries[end - 1].0.encode()?)
    } else {
        None
    };

    entries.truncate(end);
    entries.drain(..start);
    Ok(Page {
        entries,
        count,
        next_page_token,
    })
}
