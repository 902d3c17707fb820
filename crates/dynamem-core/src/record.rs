//! Schema-free records: attribute-name to tagged scalar mappings.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, SchemaError};
use crate::types::{ItemPointer, TableSchema};

/// A single scalar attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    String(String),
    Integer(i64),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Boolean(bool),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// The string form conditions are evaluated against. `Null` has none.
    pub fn as_condition_str(&self) -> Option<Cow<'_, str>> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::String(s) => Some(Cow::Borrowed(s.as_str())),
            AttributeValue::Integer(n) | AttributeValue::Timestamp(n) => {
                Some(Cow::Owned(n.to_string()))
            }
            AttributeValue::Boolean(b) => Some(Cow::Owned(b.to_string())),
        }
    }

    fn from_json(name: &str, val: Value) -> Result<Self, Error> {
        match val {
            Value::Null => Ok(AttributeValue::Null),
            Value::Bool(b) => Ok(AttributeValue::Boolean(b)),
            Value::String(s) => Ok(AttributeValue::String(s)),
            Value::Number(n) => n.as_i64().map(AttributeValue::Integer).ok_or_else(|| {
                SchemaError::UnsupportedValue {
                    name: name.to_string(),
                    kind: "non-integer number",
                }
                .into()
            }),
            Value::Array(_) => Err(SchemaError::UnsupportedValue {
                name: name.to_string(),
                kind: "array",
            }
            .into()),
            Value::Object(_) => Err(SchemaError::UnsupportedValue {
                name: name.to_string(),
                kind: "object",
            }
            .into()),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            AttributeValue::Null => Value::Null,
            AttributeValue::String(s) => Value::String(s.clone()),
            AttributeValue::Integer(n) | AttributeValue::Timestamp(n) => Value::from(*n),
            AttributeValue::Boolean(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_condition_str() {
            Some(s) => f.write_str(&s),
            None => f.write_str("null"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Integer(n)
    }
}

impl From<i32> for AttributeValue {
    fn from(n: i32) -> Self {
        AttributeValue::Integer(n.into())
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

/// One stored item. Records handed out by the engine are shared behind
/// `Arc` and never mutated; a Put replaces the stored record wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Record {
    attributes: BTreeMap<String, AttributeValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.attributes.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Condition-ready string form of an attribute; `None` when the
    /// attribute is absent or null.
    pub fn get_str(&self, name: &str) -> Option<Cow<'_, str>> {
        self.attributes.get(name).and_then(|v| v.as_condition_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Derive the primary-storage pointer for this record.
    pub fn pointer(&self, schema: &TableSchema) -> Result<ItemPointer, Error> {
        let hash = self
            .get_str(&schema.hash_key)
            .ok_or_else(|| SchemaError::MissingKeyAttribute(schema.hash_key.clone()))?;
        let sort = match &schema.sort_key {
            Some(sk) => Some(
                self.get_str(sk)
                    .ok_or_else(|| SchemaError::MissingKeyAttribute(sk.clone()))?
                    .into_owned(),
            ),
            None => None,
        };
        Ok(ItemPointer::new(hash.into_owned(), sort))
    }

    /// Build a record from a flat JSON object.
    pub fn from_json(doc: Value) -> Result<Self, Error> {
        let Value::Object(obj) = doc else {
            return Err(SchemaError::NotAnObject.into());
        };
        let mut attributes = BTreeMap::new();
        for (name, val) in obj {
            let attr = AttributeValue::from_json(&name, val)?;
            attributes.insert(name, attr);
        }
        Ok(Self { attributes })
    }

    pub fn to_json(&self) -> Value {
        let obj: Map<String, Value> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Value::Object(obj)
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TableOptions;
    use serde_json::json;

    fn schema(sort: Option<&str>) -> TableSchema {
        TableSchema {
            name: "t".into(),
            hash_key: "Id".into(),
            sort_key: sort.map(String::from),
            indexes: Vec::new(),
            options: TableOptions::default(),
        }
    }

    #[test]
    fn test_condition_str_rendering() {
        assert_eq!(AttributeValue::from("x").as_condition_str().unwrap(), "x");
        assert_eq!(AttributeValue::from(42).as_condition_str().unwrap(), "42");
        assert_eq!(
            AttributeValue::Timestamp(1_700_000_000_000)
                .as_condition_str()
                .unwrap(),
            "1700000000000"
        );
        assert_eq!(AttributeValue::from(true).as_condition_str().unwrap(), "true");
        assert!(AttributeValue::Null.as_condition_str().is_none());
    }

    #[test]
    fn test_pointer_with_sort_key() {
        let r = Record::new().with("Id", "A").with("Type", "x");
        let p = r.pointer(&schema(Some("Type"))).unwrap();
        assert_eq!(p, ItemPointer::new("A", Some("x".into())));
    }

    #[test]
    fn test_pointer_integer_key() {
        let r = Record::new().with("Id", 7).with("Type", 3);
        let p = r.pointer(&schema(Some("Type"))).unwrap();
        assert_eq!(p, ItemPointer::new("7", Some("3".into())));
    }

    #[test]
    fn test_pointer_missing_hash() {
        let r = Record::new().with("Type", "x");
        let err = r.pointer(&schema(Some("Type"))).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema(SchemaError::MissingKeyAttribute(ref a)) if a == "Id"
        ));
    }

    #[test]
    fn test_pointer_null_hash_counts_as_missing() {
        let r = Record::new().with("Id", AttributeValue::Null);
        assert!(r.pointer(&schema(None)).is_err());
    }

    #[test]
    fn test_pointer_missing_declared_sort() {
        let r = Record::new().with("Id", "A");
        let err = r.pointer(&schema(Some("Type"))).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema(SchemaError::MissingKeyAttribute(ref a)) if a == "Type"
        ));
    }

    #[test]
    fn test_from_json() {
        let r = Record::from_json(json!({
            "Id": "A",
            "Count": 3,
            "Active": true,
            "Note": null
        }))
        .unwrap();
        assert_eq!(r.get("Id"), Some(&AttributeValue::from("A")));
        assert_eq!(r.get("Count"), Some(&AttributeValue::Integer(3)));
        assert_eq!(r.get("Active"), Some(&AttributeValue::Boolean(true)));
        assert_eq!(r.get("Note"), Some(&AttributeValue::Null));
        assert_eq!(r.to_json(), json!({"Id": "A", "Count": 3, "Active": true, "Note": null}));
    }

    #[test]
    fn test_from_json_rejects_nested() {
        let err = Record::from_json(json!({"Id": "A", "tags": ["a"]})).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema(SchemaError::UnsupportedValue { kind: "array", .. })
        ));

        let err = Record::from_json(json!({"Id": "A", "score": 1.5})).unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::UnsupportedValue { .. })));

        assert!(Record::from_json(json!("A")).is_err());
    }

    #[test]
    fn test_from_iterator() {
        let r: Record = [("Id", "A"), ("Type", "x")].into_iter().collect();
        assert_eq!(r.len(), 2);
        assert_eq!(r.get_str("Type").unwrap(), "x");
    }
}
