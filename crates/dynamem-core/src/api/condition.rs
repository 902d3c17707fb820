//! Single-attribute predicates and their evaluation.
//!
//! Every attribute is compared in its string form (see
//! [`AttributeValue::as_condition_str`]). Ordering operators compare
//! numerically when both sides parse as integers and ordinally otherwise.

use std::cmp::Ordering;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::error::ConditionError;
use crate::record::{AttributeValue, Record};

/// Operator tag of a [`Predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Equal,
    NotEqual,
    BeginsWith,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Between,
    In,
    IsNull,
    IsNotNull,
    Contains,
    NotContains,
}

/// The test applied to one attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    Equal(String),
    NotEqual(String),
    BeginsWith(String),
    GreaterThan(String),
    LessThan(String),
    GreaterOrEqual(String),
    LessOrEqual(String),
    /// Exclusive on both ends.
    Between(String, String),
    In(Vec<String>),
    IsNull,
    IsNotNull,
    /// Reserved; evaluation fails with `NotImplemented`.
    Contains(String),
    /// Reserved; evaluation fails with `NotImplemented`.
    NotContains(String),
}

impl Predicate {
    pub fn operator(&self) -> Operator {
        match self {
            Predicate::Equal(_) => Operator::Equal,
            Predicate::NotEqual(_) => Operator::NotEqual,
            Predicate::BeginsWith(_) => Operator::BeginsWith,
            Predicate::GreaterThan(_) => Operator::GreaterThan,
            Predicate::LessThan(_) => Operator::LessThan,
            Predicate::GreaterOrEqual(_) => Operator::GreaterOrEqual,
            Predicate::LessOrEqual(_) => Operator::LessOrEqual,
            Predicate::Between(_, _) => Operator::Between,
            Predicate::In(_) => Operator::In,
            Predicate::IsNull => Operator::IsNull,
            Predicate::IsNotNull => Operator::IsNotNull,
            Predicate::Contains(_) => Operator::Contains,
            Predicate::NotContains(_) => Operator::NotContains,
        }
    }

    /// Fails for the reserved operators.
    pub fn check_supported(&self) -> Result<(), ConditionError> {
        match self {
            Predicate::Contains(_) | Predicate::NotContains(_) => {
                Err(ConditionError::NotImplemented(self.operator()))
            }
            _ => Ok(()),
        }
    }

    /// Evaluate against a value; `None` means the attribute is absent or null.
    pub fn passes(&self, value: Option<&str>) -> Result<bool, ConditionError> {
        let Some(value) = value else {
            self.check_supported()?;
            // An absent value only satisfies the null check and inequality.
            return Ok(matches!(self, Predicate::IsNull | Predicate::NotEqual(_)));
        };

        Ok(match self {
            Predicate::Equal(v) => value == v,
            Predicate::NotEqual(v) => value != v,
            Predicate::BeginsWith(prefix) => value.starts_with(prefix.as_str()),
            Predicate::GreaterThan(v) => compare(value, v) == Ordering::Greater,
            Predicate::LessThan(v) => compare(value, v) == Ordering::Less,
            Predicate::GreaterOrEqual(v) => compare(value, v) != Ordering::Less,
            Predicate::LessOrEqual(v) => compare(value, v) != Ordering::Greater,
            Predicate::Between(lo, hi) => {
                compare(value, lo) == Ordering::Greater && compare(value, hi) == Ordering::Less
            }
            Predicate::In(values) => values.iter().any(|v| v == value),
            Predicate::IsNull => false,
            Predicate::IsNotNull => true,
            Predicate::Contains(_) | Predicate::NotContains(_) => {
                return Err(ConditionError::NotImplemented(self.operator()));
            }
        })
    }
}

/// A predicate bound to one named attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub predicate: Predicate,
}

fn render(value: impl Into<AttributeValue>) -> String {
    value.into().to_string()
}

impl Condition {
    pub fn new(attribute: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            attribute: attribute.into(),
            predicate,
        }
    }

    pub fn eq(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Predicate::Equal(render(value)))
    }

    pub fn ne(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Predicate::NotEqual(render(value)))
    }

    pub fn begins_with(attribute: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::new(attribute, Predicate::BeginsWith(prefix.into()))
    }

    pub fn gt(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Predicate::GreaterThan(render(value)))
    }

    pub fn lt(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Predicate::LessThan(render(value)))
    }

    pub fn ge(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Predicate::GreaterOrEqual(render(value)))
    }

    pub fn le(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Predicate::LessOrEqual(render(value)))
    }

    /// `low < attr < high`.
    pub fn between(
        attribute: impl Into<String>,
        low: impl Into<AttributeValue>,
        high: impl Into<AttributeValue>,
    ) -> Self {
        Self::new(attribute, Predicate::Between(render(low), render(high)))
    }

    pub fn is_in<I, V>(attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        Self::new(
            attribute,
            Predicate::In(values.into_iter().map(render).collect()),
        )
    }

    pub fn is_null(attribute: impl Into<String>) -> Self {
        Self::new(attribute, Predicate::IsNull)
    }

    pub fn is_not_null(attribute: impl Into<String>) -> Self {
        Self::new(attribute, Predicate::IsNotNull)
    }

    pub fn contains(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Predicate::Contains(render(value)))
    }

    pub fn not_contains(attribute: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self::new(attribute, Predicate::NotContains(render(value)))
    }

    pub fn operator(&self) -> Operator {
        self.predicate.operator()
    }

    pub fn passes(&self, value: Option<&str>) -> Result<bool, ConditionError> {
        self.predicate.passes(value)
    }

    /// Evaluate against the condition's attribute on `record`.
    pub fn matches(&self, record: &Record) -> Result<bool, ConditionError> {
        self.passes(record.get_str(&self.attribute).as_deref())
    }

    /// How an ordered map keyed by this attribute can narrow its candidates.
    ///
    /// Ranges are only produced where every comparison the predicate makes is
    /// ordinal, so key order and predicate order agree. Candidates inside the
    /// range must still be checked with [`passes`](Self::passes).
    pub(crate) fn key_lookup(&self) -> KeyLookup<'_> {
        match &self.predicate {
            Predicate::Equal(v) => KeyLookup::Exact(v),
            Predicate::BeginsWith(prefix) => match prefix_successor(prefix) {
                Some(end) => KeyLookup::Range(Bound::Included(prefix.clone()), Bound::Excluded(end)),
                None => KeyLookup::Range(Bound::Included(prefix.clone()), Bound::Unbounded),
            },
            Predicate::GreaterThan(v) if !is_integer(v) => {
                KeyLookup::Range(Bound::Excluded(v.clone()), Bound::Unbounded)
            }
            Predicate::GreaterOrEqual(v) if !is_integer(v) => {
                KeyLookup::Range(Bound::Included(v.clone()), Bound::Unbounded)
            }
            Predicate::LessThan(v) if !is_integer(v) => {
                KeyLookup::Range(Bound::Unbounded, Bound::Excluded(v.clone()))
            }
            Predicate::LessOrEqual(v) if !is_integer(v) => {
                KeyLookup::Range(Bound::Unbounded, Bound::Included(v.clone()))
            }
            Predicate::Between(lo, hi) if !is_integer(lo) && !is_integer(hi) => {
                if lo < hi {
                    KeyLookup::Range(Bound::Excluded(lo.clone()), Bound::Excluded(hi.clone()))
                } else {
                    KeyLookup::Empty
                }
            }
            _ => KeyLookup::Scan,
        }
    }
}

/// The key and residual conditions one storage level evaluates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionSet<'a> {
    pub hash: Option<&'a Condition>,
    pub sort: Option<&'a Condition>,
    pub filters: &'a [Condition],
}

impl ConditionSet<'_> {
    /// Fails if any condition uses a reserved operator.
    pub fn check_supported(&self) -> Result<(), ConditionError> {
        for cond in self.hash.into_iter().chain(self.sort).chain(self.filters) {
            cond.predicate.check_supported()?;
        }
        Ok(())
    }

    /// Logical AND of every residual filter.
    pub fn filters_match(&self, record: &Record) -> Result<bool, ConditionError> {
        for cond in self.filters {
            if !cond.matches(record)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Candidate selection strategy over an ordered map of string keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KeyLookup<'a> {
    Exact(&'a str),
    Range(Bound<String>, Bound<String>),
    Empty,
    Scan,
}

fn is_integer(s: &str) -> bool {
    s.parse::<i64>().is_ok()
}

/// Numeric when both sides are integers, ordinal otherwise.
pub fn compare(value: &str, operand: &str) -> Ordering {
    match (value.parse::<i64>(), operand.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => value.cmp(operand),
    }
}

/// Smallest string greater than every string starting with `prefix`.
fn prefix_successor(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    while let Some(last) = chars.pop() {
        let mut next = last as u32 + 1;
        // Skip the surrogate gap.
        if (0xD800..=0xDFFF).contains(&next) {
            next = 0xE000;
        }
        if let Some(c) = char::from_u32(next) {
            chars.push(c);
            return Some(chars.into_iter().collect());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passes(c: &Condition, v: &str) -> bool {
        c.passes(Some(v)).unwrap()
    }

    // -----------------------------------------------------------------------
    // Equality
    // -----------------------------------------------------------------------

    #[test]
    fn test_equal_and_not_equal() {
        let c = Condition::eq("a", "x");
        assert!(passes(&c, "x"));
        assert!(!passes(&c, "y"));

        let c = Condition::ne("a", "x");
        assert!(passes(&c, "y"));
        assert!(!passes(&c, "x"));
    }

    #[test]
    fn test_equal_is_string_equality() {
        let c = Condition::eq("a", 5);
        assert!(passes(&c, "5"));
        assert!(!passes(&c, "05"));
    }

    #[test]
    fn test_begins_with() {
        let c = Condition::begins_with("a", "ab");
        assert!(passes(&c, "abc"));
        assert!(passes(&c, "ab"));
        assert!(!passes(&c, "a"));
        assert!(!passes(&c, "bab"));
    }

    // -----------------------------------------------------------------------
    // Ordering
    // -----------------------------------------------------------------------

    #[test]
    fn test_numeric_comparison_when_both_integers() {
        let c = Condition::gt("a", 9);
        assert!(passes(&c, "10"));
        assert!(!passes(&c, "9"));

        let c = Condition::lt("a", 10);
        assert!(passes(&c, "9"));
        assert!(!passes(&c, "10"));

        let c = Condition::ge("a", 10);
        assert!(passes(&c, "10"));
        assert!(!passes(&c, "9"));

        let c = Condition::le("a", -1);
        assert!(passes(&c, "-5"));
        assert!(!passes(&c, "0"));
    }

    #[test]
    fn test_ordinal_comparison_otherwise() {
        let c = Condition::gt("a", "b");
        assert!(passes(&c, "c"));
        assert!(!passes(&c, "a"));
        // Mixed: "10" vs "9x" compares ordinally.
        let c = Condition::lt("a", "9x");
        assert!(passes(&c, "10"));
    }

    // -----------------------------------------------------------------------
    // Between
    // -----------------------------------------------------------------------

    #[test]
    fn test_between_is_exclusive_numeric() {
        let c = Condition::between("a", 5, 10);
        for v in ["6", "7", "8", "9"] {
            assert!(passes(&c, v), "{v} should match");
        }
        for v in ["5", "10", "4", "11"] {
            assert!(!passes(&c, v), "{v} should not match");
        }
    }

    #[test]
    fn test_between_is_exclusive_string() {
        let c = Condition::between("a", "b", "d");
        assert!(passes(&c, "c"));
        assert!(passes(&c, "ba"));
        assert!(!passes(&c, "b"));
        assert!(!passes(&c, "d"));
    }

    // -----------------------------------------------------------------------
    // Set membership and null checks
    // -----------------------------------------------------------------------

    #[test]
    fn test_in() {
        let c = Condition::is_in("a", ["x", "y"]);
        assert!(passes(&c, "x"));
        assert!(!passes(&c, "z"));

        let c = Condition::is_in("a", [1, 2]);
        assert!(passes(&c, "2"));
    }

    #[test]
    fn test_null_checks() {
        assert!(Condition::is_null("a").passes(None).unwrap());
        assert!(!Condition::is_null("a").passes(Some("x")).unwrap());
        assert!(Condition::is_not_null("a").passes(Some("x")).unwrap());
        assert!(!Condition::is_not_null("a").passes(None).unwrap());
    }

    #[test]
    fn test_absent_value() {
        assert!(!Condition::eq("a", "x").passes(None).unwrap());
        assert!(Condition::ne("a", "x").passes(None).unwrap());
        assert!(!Condition::begins_with("a", "x").passes(None).unwrap());
        assert!(!Condition::lt("a", "x").passes(None).unwrap());
        assert!(!Condition::between("a", 1, 3).passes(None).unwrap());
        assert!(!Condition::is_in("a", ["x"]).passes(None).unwrap());
    }

    #[test]
    fn test_contains_not_implemented() {
        let err = Condition::contains("a", "x").passes(Some("xyz")).unwrap_err();
        assert!(matches!(err, ConditionError::NotImplemented(Operator::Contains)));

        let err = Condition::not_contains("a", "x").passes(None).unwrap_err();
        assert!(matches!(err, ConditionError::NotImplemented(Operator::NotContains)));
    }

    #[test]
    fn test_matches_record() {
        let r = Record::new().with("Age", 30).with("Name", "Alice");
        assert!(Condition::gt("Age", 20).matches(&r).unwrap());
        assert!(Condition::begins_with("Name", "Al").matches(&r).unwrap());
        assert!(Condition::is_null("Email").matches(&r).unwrap());
    }

    // -----------------------------------------------------------------------
    // Key lookup planning
    // -----------------------------------------------------------------------

    #[test]
    fn test_key_lookup_exact() {
        let c = Condition::eq("a", "x");
        assert_eq!(c.key_lookup(), KeyLookup::Exact("x"));
    }

    #[test]
    fn test_key_lookup_prefix_range() {
        let c = Condition::begins_with("a", "ab");
        assert_eq!(
            c.key_lookup(),
            KeyLookup::Range(Bound::Included("ab".into()), Bound::Excluded("ac".into()))
        );
    }

    #[test]
    fn test_key_lookup_integer_operand_scans() {
        assert_eq!(Condition::gt("a", 5).key_lookup(), KeyLookup::Scan);
        assert_eq!(Condition::between("a", 1, "z").key_lookup(), KeyLookup::Scan);
        assert_eq!(Condition::ne("a", "x").key_lookup(), KeyLookup::Scan);
    }

    #[test]
    fn test_key_lookup_string_ranges() {
        assert_eq!(
            Condition::lt("a", "m").key_lookup(),
            KeyLookup::Range(Bound::Unbounded, Bound::Excluded("m".into()))
        );
        assert_eq!(
            Condition::between("a", "b", "d").key_lookup(),
            KeyLookup::Range(Bound::Excluded("b".into()), Bound::Excluded("d".into()))
        );
        assert_eq!(Condition::between("a", "d", "b").key_lookup(), KeyLookup::Empty);
        assert_eq!(Condition::between("a", "b", "b").key_lookup(), KeyLookup::Empty);
    }

    #[test]
    fn test_prefix_successor() {
        assert_eq!(prefix_successor("ab").as_deref(), Some("ac"));
        assert_eq!(prefix_successor("").as_deref(), None);
        assert_eq!(
            prefix_successor("a\u{10FFFF}").as_deref(),
            Some("b")
        );
    }

    #[test]
    fn test_condition_serde_roundtrip() {
        let c = Condition::between("Age", 5, 10);
        let json = serde_json::to_string(&c).unwrap();
        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
