//! # Collection Queries
//!
//! In-memory filter/search/sort/paginate pipeline over a loaded collection.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  records ──► where ──► search ──► order_by ──► offset/limit ──► result │
//! │              (all       (any of    (stable,     (applied                │
//! │              equal)     fields)    ci strings)  last)                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stages always run in this order, whatever order the builder methods
//! were called in.

use serde_json::Value;
use std::cmp::Ordering;

use super::Record;

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// A composable query over one collection.
///
/// ## Example
/// ```rust
/// use serde_json::json;
/// use till_store::document::{Query, SortOrder};
///
/// let query = Query::new()
///     .filter("category_id", json!(3))
///     .search("cola", ["name", "code"])
///     .order_by("name", SortOrder::Asc)
///     .offset(5)
///     .limit(5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    filters: Vec<(String, Value)>,
    search: Option<(String, Vec<String>)>,
    order_by: Option<(String, SortOrder)>,
    offset: usize,
    limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    /// Keeps records whose `field` equals `value`. Repeated calls AND together.
    pub fn filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push((field.into(), value));
        self
    }

    /// Keeps records where any of `fields` contains `term` (case-insensitive).
    /// A blank term disables the stage.
    pub fn search<I, S>(mut self, term: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let term = term.into().trim().to_lowercase();
        if term.is_empty() {
            self.search = None;
        } else {
            self.search = Some((term, fields.into_iter().map(Into::into).collect()));
        }
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Runs the pipeline.
    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        let mut matched: Vec<Record> = records
            .into_iter()
            .filter(|record| self.matches(record))
            .collect();

        if let Some((field, order)) = &self.order_by {
            matched.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let page = matched.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }

    /// Whether a record passes the `where` and `search` stages.
    pub fn matches(&self, record: &Record) -> bool {
        let filtered = self.filters.iter().all(|(field, expected)| {
            record
                .get(field)
                .map_or(false, |actual| values_match(actual, expected))
        });

        filtered
            && self.search.as_ref().map_or(true, |(term, fields)| {
                fields
                    .iter()
                    .any(|field| record.get(field).map_or(false, |value| contains_term(value, term)))
            })
    }
}

/// Equality used by `where` clauses and `update`/`delete` matching.
///
/// Numbers compare by value (`1 == 1.0`); everything else must be equal.
pub fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

/// Case-insensitive substring test. `term` must already be lowercase.
fn contains_term(value: &Value, term: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase().contains(term),
        Value::Number(n) => n.to_string().contains(term),
        _ => false,
    }
}

/// Total order over JSON values for sorting.
///
/// Missing/null sort first, then booleans, numbers, strings (case-insensitive)
/// and finally arrays/objects, which compare equal among themselves.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.to_lowercase().cmp(&y.to_lowercase()),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()
    }

    fn ids(records: &[Record]) -> Vec<i64> {
        records.iter().filter_map(|r| r.get("id").and_then(Value::as_i64)).collect()
    }

    fn catalog() -> Vec<Record> {
        records(vec![
            json!({ "id": 1, "name": "water", "code": "H2O", "category_id": 1 }),
            json!({ "id": 2, "name": "Cola", "code": "COLA-330", "category_id": 1 }),
            json!({ "id": 3, "name": "chips", "code": "CHP", "category_id": 2 }),
            json!({ "id": 4, "name": "Cola Zero", "code": "COLA-0", "category_id": 1 }),
        ])
    }

    #[test]
    fn test_numbers_match_across_representations() {
        assert!(values_match(&json!(1), &json!(1.0)));
        assert!(!values_match(&json!(1), &json!("1")));
        assert!(values_match(&json!("a"), &json!("a")));
    }

    #[test]
    fn test_pipeline_order_is_fixed() {
        // limit/offset are applied after sorting regardless of builder order
        let query = Query::new()
            .limit(1)
            .offset(1)
            .order_by("name", SortOrder::Asc)
            .filter("category_id", json!(1.0));
        let result = query.apply(catalog());
        assert_eq!(ids(&result), vec![4]);
    }

    #[test]
    fn test_search_is_case_insensitive_over_fields() {
        let query = Query::new().search("cola", ["code"]);
        assert_eq!(ids(&query.apply(catalog())), vec![2, 4]);

        let none = Query::new().search("  ", ["name"]);
        assert_eq!(none.apply(catalog()).len(), 4);
    }

    #[test]
    fn test_sort_is_case_insensitive_and_stable() {
        let result = Query::new().order_by("name", SortOrder::Asc).apply(catalog());
        assert_eq!(ids(&result), vec![3, 2, 4, 1]);

        let desc = Query::new().order_by("id", SortOrder::Desc).apply(catalog());
        assert_eq!(ids(&desc), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_missing_field_never_matches_filter() {
        let result = Query::new().filter("brand_id", json!(1)).apply(catalog());
        assert!(result.is_empty());
    }
}
