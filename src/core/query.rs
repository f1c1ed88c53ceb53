//! List query parameters: filtering, sorting and windowing
//!
//! The list endpoint understands four query parameters; every other key in
//! the query string is left for hooks.
//!
//! ```text
//! GET /api/v1/TestModel?filter={"user": "user1"}
//! GET /api/v1/TestModel?filter={"_id>=": 1}&sort=_id:desc&skip=0&limit=10
//! ```

use crate::core::error::ValidationError;
use crate::core::record::Record;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

pub const FILTER_PARAM: &str = "filter";
pub const SORT_PARAM: &str = "sort";
pub const SKIP_PARAM: &str = "skip";
pub const LIMIT_PARAM: &str = "limit";

/// Comparison applied by a filter condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl Comparison {
    /// Split a filter key such as `amount>=` into field and comparison
    fn split_key(key: &str) -> (&str, Comparison) {
        for (suffix, op) in [
            (">=", Comparison::Gte),
            ("<=", Comparison::Lte),
            (">", Comparison::Gt),
            ("<", Comparison::Lt),
        ] {
            if let Some(field) = key.strip_suffix(suffix) {
                return (field, op);
            }
        }
        (key, Comparison::Eq)
    }
}

/// One `field <op> value` constraint
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Comparison,
    pub value: Value,
}

impl Condition {
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            op: Comparison::Eq,
            value,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let Some(actual) = record.get(&self.field) else {
            return false;
        };
        let ord = || compare_values(actual, &self.value);
        match self.op {
            Comparison::Eq => actual == &self.value,
            Comparison::Gt => ord() == Some(Ordering::Greater),
            Comparison::Lt => ord() == Some(Ordering::Less),
            Comparison::Gte => matches!(ord(), Some(Ordering::Greater | Ordering::Equal)),
            Comparison::Lte => matches!(ord(), Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    /// Parse `field`, `field:asc` or `field:desc`
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let (field, direction) = match raw.split_once(':') {
            None => (raw, SortDirection::Asc),
            Some((field, "asc")) => (field, SortDirection::Asc),
            Some((field, "desc")) => (field, SortDirection::Desc),
            Some((_, other)) => {
                return Err(ValidationError::FieldError {
                    field: SORT_PARAM.to_string(),
                    message: format!("unknown sort direction '{}'", other),
                });
            }
        };
        if field.is_empty() {
            return Err(ValidationError::FieldError {
                field: SORT_PARAM.to_string(),
                message: "missing sort field".to_string(),
            });
        }
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// A parsed list query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub conditions: Vec<Condition>,
    pub sort: Option<SortKey>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Build a query from raw query-string parameters
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, ValidationError> {
        let mut query = Self::new();

        if let Some(raw) = params.get(FILTER_PARAM) {
            let value: Value =
                serde_json::from_str(raw).map_err(|e| ValidationError::InvalidJson {
                    message: format!("filter: {}", e),
                })?;
            query.conditions = Self::parse_filter(&value)?;
        }
        if let Some(raw) = params.get(SORT_PARAM) {
            query.sort = Some(SortKey::parse(raw)?);
        }
        if let Some(raw) = params.get(SKIP_PARAM) {
            query.skip = parse_count(SKIP_PARAM, raw)?;
        }
        if let Some(raw) = params.get(LIMIT_PARAM) {
            query.limit = Some(parse_count(LIMIT_PARAM, raw)?);
        }

        Ok(query)
    }

    /// Turn a filter object into conditions
    ///
    /// # Format
    /// - Exact match: `{"field": "value"}`
    /// - Comparison: `{"field>": 1, "field<": 9, "field>=": 1, "field<=": 9}`
    pub fn parse_filter(filter: &Value) -> Result<Vec<Condition>, ValidationError> {
        let obj = filter.as_object().ok_or_else(|| ValidationError::FieldError {
            field: FILTER_PARAM.to_string(),
            message: "filter must be a JSON object".to_string(),
        })?;

        Ok(obj
            .iter()
            .map(|(key, value)| {
                let (field, op) = Comparison::split_key(key);
                Condition {
                    field: field.to_string(),
                    op,
                    value: value.clone(),
                }
            })
            .collect())
    }

    /// Drop conditions and sort keys on fields rejected by `keep`
    ///
    /// Returns the names of the dropped fields.
    pub fn retain_fields(&mut self, keep: impl Fn(&str) -> bool) -> Vec<String> {
        let mut dropped = Vec::new();
        self.conditions.retain(|c| {
            let ok = keep(&c.field);
            if !ok {
                dropped.push(c.field.clone());
            }
            ok
        });
        if let Some(sort) = &self.sort {
            if !keep(&sort.field) {
                dropped.push(sort.field.clone());
                self.sort = None;
            }
        }
        dropped
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }

    /// Filter, sort and window a set of records in memory
    pub fn apply(&self, records: impl IntoIterator<Item = Record>) -> Vec<Record> {
        let mut out: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();

        if let Some(sort) = &self.sort {
            // Records missing the field sort last in either direction
            out.sort_by(|a, b| match (a.get(&sort.field), b.get(&sort.field)) {
                (Some(x), Some(y)) => {
                    let ord = compare_values(x, y).unwrap_or(Ordering::Equal);
                    match sort.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            });
        }

        let window = out.into_iter().skip(self.skip);
        match self.limit {
            Some(limit) => window.take(limit).collect(),
            None => window.collect(),
        }
    }
}

fn parse_count(param: &str, raw: &str) -> Result<usize, ValidationError> {
    raw.parse::<usize>().map_err(|_| ValidationError::FieldError {
        field: param.to_string(),
        message: format!("expected a non-negative integer, got '{}'", raw),
    })
}

/// Order two JSON scalars of the same kind
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
