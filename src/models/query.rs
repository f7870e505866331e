//! Query-related data models.
//!
//! This module defines bound parameters, generated statements and the
//! result shapes returned by data operations.

use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// One result row: column name to normalized value, in column order.
pub type Row = Map<String, JsonValue>;

/// Equality conditions, AND-ed together. Keys are column names.
pub type Conditions = Map<String, JsonValue>;

/// A parameter value for parameterized queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Arrays and objects, bound as JSON where the driver supports it
    Json(JsonValue),
    /// Naive timestamp, bound natively by drivers with strict temporal types
    Timestamp(NaiveDateTime),
}

impl QueryParam {
    /// Check if this parameter is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Json(_) => "json",
            Self::Timestamp(_) => "timestamp",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&JsonValue> for QueryParam {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => Self::String(s.clone()),
            other => Self::Json(other.clone()),
        }
    }
}

impl From<JsonValue> for QueryParam {
    fn from(value: JsonValue) -> Self {
        Self::from(&value)
    }
}

impl From<&str> for QueryParam {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// A generated statement together with its bound parameters.
///
/// `params` is in placeholder order; each entry keeps its logical name so
/// SET and WHERE bindings of the same column stay distinct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundQuery {
    pub sql: String,
    pub params: Vec<(String, QueryParam)>,
}

impl BoundQuery {
    /// A statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Logical parameter names, for logging. Values are never logged.
    pub fn param_names(&self) -> Vec<&str> {
        self.params.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Look up a parameter by its logical name.
    pub fn param(&self, name: &str) -> Option<&QueryParam> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn values(&self) -> impl Iterator<Item = &QueryParam> {
        self.params.iter().map(|(_, value)| value)
    }
}

/// Declared column types of one table, keyed by lower-cased column name.
///
/// Only fetched for engines whose parameters must match the column type
/// (see `SqlDialect::needs_column_types`); empty everywhere else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnTypes(HashMap<String, String>);

impl ColumnTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: &str, data_type: impl Into<String>) {
        self.0.insert(column.to_lowercase(), data_type.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(&column.to_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a declared type stores dates or datetimes.
    pub fn is_temporal(data_type: &str) -> bool {
        let lower = data_type.to_ascii_lowercase();
        lower == "date" || lower.contains("timestamp") || lower.contains("datetime")
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ColumnTypes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut types = Self::new();
        for (column, data_type) in iter {
            types.insert(column.as_ref(), data_type);
        }
        types
    }
}

/// One page of rows plus the totals used to navigate.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult {
    pub data: Vec<Row>,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub total_records: u64,
}

impl PaginatedResult {
    /// Number of pages needed for `total_records` rows.
    pub fn page_count(total_records: u64, page_size: u64) -> u64 {
        if page_size == 0 {
            return 0;
        }
        total_records.div_ceil(page_size)
    }
}

/// A batch entry that failed, with the error that stopped it.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FailedRecord {
    pub index: usize,
    pub input: JsonValue,
    pub error: String,
}

/// Aggregate outcome of a batch operation.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub failed_records: Vec<FailedRecord>,
    /// Only reported by update and delete batches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_affected_rows: Option<u64>,
}

impl BatchResult {
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, index: usize, input: JsonValue, error: impl ToString) {
        self.failure_count += 1;
        self.failed_records.push(FailedRecord {
            index,
            input,
            error: error.to_string(),
        });
    }

    pub fn add_affected(&mut self, rows: u64) {
        *self.total_affected_rows.get_or_insert(0) += rows;
    }
}
