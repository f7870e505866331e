//! Row decoding for the sqlx-backed engines.
//!
//! Each column is first classified by its declared type name
//! ([`categorize_type`]), then read through [`cell`] as the matching Rust type.
//! A column whose driver type refuses the expected Rust type falls back to text.
//!
//! Temporal values (dates, datetimes, timestamps) always leave this module as
//! the canonical `YYYY-MM-DD HH:MM:SS` string; date-only values get midnight.

use crate::dialect::{DATETIME_FORMAT, parse_datetime_literal};
use crate::models::{DatabaseType, Row as JsonRow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, ColumnIndex, Decode, Row, Type, TypeInfo};

const TIME_FORMAT: &str = "%H:%M:%S";

/// Layouts accepted for datetime text besides the canonical ones.
const DATETIME_TEXT_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Logical category of a declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Binary,
    Json,
    Date,
    DateTime,
    Time,
    Text,
}

/// Classify a declared type name. Unknown names are text.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    use TypeCategory::*;

    let lower = type_name.to_ascii_lowercase();
    match lower.as_str() {
        n if n.contains("timestamp") || n.contains("datetime") => DateTime,
        "date" => Date,
        "time" | "timetz" => Time,
        // SQLite NUMERIC affinity stores reals
        "numeric" if db == DatabaseType::SQLite => Float,
        n if n.contains("decimal") || n.contains("numeric") => Decimal,
        "interval" | "point" => Text,
        n if n.contains("int") || n.contains("serial") => Integer,
        "bool" | "boolean" => Boolean,
        n if n.contains("float") || n.contains("double") || n == "real" => Float,
        "json" | "jsonb" => Json,
        n if n.contains("blob") || n.contains("binary") || n == "bytea" => Binary,
        _ => Text,
    }
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

pub fn format_date(value: NaiveDate) -> String {
    format_datetime(value.and_time(NaiveTime::MIN))
}

/// Canonical form of datetime text stored in a temporal column.
///
/// Text that does not look like a datetime is returned unchanged.
pub fn normalize_temporal_text(text: &str) -> String {
    if let Some(parsed) = parse_datetime_literal(text) {
        return format_datetime(parsed);
    }
    DATETIME_TEXT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .map(format_datetime)
        .unwrap_or_else(|| text.to_string())
}

/// Binary data is always returned base64-encoded.
pub fn encode_binary(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    JsonValue::String(STANDARD.encode(bytes))
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn json_or_null<T>(value: Option<T>, to_json: impl FnOnce(T) -> JsonValue) -> JsonValue {
    value.map(to_json).unwrap_or(JsonValue::Null)
}

/// Column `idx` read as `T`. `Err` means the driver type does not map onto `T`.
fn cell<'r, R, T>(row: &'r R, idx: usize) -> Result<Option<T>, sqlx::Error>
where
    R: Row,
    usize: ColumnIndex<R>,
    T: Decode<'r, R::Database> + Type<R::Database>,
{
    row.try_get::<Option<T>, _>(idx)
}

fn bool_cell<'r, R>(row: &'r R, idx: usize) -> JsonValue
where
    R: Row,
    usize: ColumnIndex<R>,
    bool: Decode<'r, R::Database> + Type<R::Database>,
{
    json_or_null(cell::<R, bool>(row, idx).ok().flatten(), JsonValue::Bool)
}

fn binary_cell<'r, R>(row: &'r R, idx: usize) -> JsonValue
where
    R: Row,
    usize: ColumnIndex<R>,
    Vec<u8>: Decode<'r, R::Database> + Type<R::Database>,
{
    json_or_null(cell::<R, Vec<u8>>(row, idx).ok().flatten(), |v| {
        encode_binary(&v)
    })
}

/// `None` when neither float width decodes.
fn float_cell<'r, R>(row: &'r R, idx: usize) -> Option<JsonValue>
where
    R: Row,
    usize: ColumnIndex<R>,
    f64: Decode<'r, R::Database> + Type<R::Database>,
    f32: Decode<'r, R::Database> + Type<R::Database>,
{
    match cell::<R, f64>(row, idx) {
        Ok(v) => Some(json_or_null(v, float_value)),
        Err(_) => cell::<R, f32>(row, idx)
            .ok()
            .map(|v| json_or_null(v, |f| float_value(f64::from(f)))),
    }
}

fn decimal_cell<'r, R>(row: &'r R, idx: usize) -> JsonValue
where
    R: Row,
    usize: ColumnIndex<R>,
    RawDecimal: Decode<'r, R::Database> + Type<R::Database>,
{
    match cell::<R, RawDecimal>(row, idx) {
        Ok(v) => json_or_null(v, |d| JsonValue::String(d.0)),
        Err(e) => {
            tracing::error!(column = idx, error = %e, "Failed to decode DECIMAL");
            JsonValue::Null
        }
    }
}

/// Native datetime first, then zoned, `None` if the driver offers neither.
fn datetime_cell<'r, R>(row: &'r R, idx: usize) -> Option<JsonValue>
where
    R: Row,
    usize: ColumnIndex<R>,
    NaiveDateTime: Decode<'r, R::Database> + Type<R::Database>,
    DateTime<Utc>: Decode<'r, R::Database> + Type<R::Database>,
{
    let canonical = |dt: NaiveDateTime| JsonValue::String(format_datetime(dt));
    if let Ok(v) = cell::<R, NaiveDateTime>(row, idx) {
        return Some(json_or_null(v, canonical));
    }
    cell::<R, DateTime<Utc>>(row, idx)
        .ok()
        .map(|v| json_or_null(v, |dt| canonical(dt.naive_utc())))
}

/// Exact DECIMAL/NUMERIC text as the server renders it.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_ascii_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        <&str as Decode<sqlx::MySql>>::decode(value).map(|s| RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        ty.name().eq_ignore_ascii_case("numeric")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        <&str as Decode<sqlx::Postgres>>::decode(value).map(|s| RawDecimal(s.to_string()))
    }
}

/// Convert a driver row into a column-ordered JSON map.
pub trait RowToJson {
    fn to_json_row(&self) -> JsonRow;
}

fn collect_row<R: Row>(
    row: &R,
    db: DatabaseType,
    decode: fn(&R, usize, TypeCategory) -> JsonValue,
) -> JsonRow {
    row.columns()
        .iter()
        .map(|col| {
            let category = categorize_type(col.type_info().name(), db);
            (col.name().to_string(), decode(row, col.ordinal(), category))
        })
        .collect()
}

impl RowToJson for MySqlRow {
    fn to_json_row(&self) -> JsonRow {
        collect_row(self, DatabaseType::MySQL, mysql::decode_column)
    }
}

impl RowToJson for PgRow {
    fn to_json_row(&self) -> JsonRow {
        collect_row(self, DatabaseType::PostgreSQL, postgres::decode_column)
    }
}

impl RowToJson for SqliteRow {
    fn to_json_row(&self) -> JsonRow {
        collect_row(self, DatabaseType::SQLite, sqlite::decode_column)
    }
}

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Decimal => decimal_cell(row, idx),
            // Signed and unsigned integers are separate driver types
            TypeCategory::Integer => match cell::<_, i64>(row, idx) {
                Ok(v) => json_or_null(v, JsonValue::from),
                Err(_) => json_or_null(cell::<_, u64>(row, idx).ok().flatten(), JsonValue::from),
            },
            TypeCategory::Boolean => bool_cell(row, idx),
            TypeCategory::Float => float_cell(row, idx).unwrap_or(JsonValue::Null),
            TypeCategory::Binary => binary_cell(row, idx),
            TypeCategory::Json => cell::<_, JsonValue>(row, idx)
                .ok()
                .flatten()
                .unwrap_or(JsonValue::Null),
            TypeCategory::Date => match cell::<_, NaiveDate>(row, idx) {
                Ok(v) => json_or_null(v, |d| JsonValue::String(format_date(d))),
                Err(_) => text(row, idx),
            },
            TypeCategory::DateTime => datetime_cell(row, idx).unwrap_or_else(|| text(row, idx)),
            TypeCategory::Time => match cell::<_, NaiveTime>(row, idx) {
                Ok(v) => json_or_null(v, |t| JsonValue::String(t.format(TIME_FORMAT).to_string())),
                Err(_) => text(row, idx),
            },
            TypeCategory::Text => text(row, idx),
        }
    }

    /// Binary-collated text arrives as bytes.
    fn text(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = cell::<_, String>(row, idx) {
            return json_or_null(v, JsonValue::String);
        }
        json_or_null(cell::<_, Vec<u8>>(row, idx).ok().flatten(), |bytes| {
            match String::from_utf8(bytes) {
                Ok(s) => JsonValue::String(s),
                Err(e) => encode_binary(e.as_bytes()),
            }
        })
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Decimal => decimal_cell(row, idx),
            TypeCategory::Integer => integer(row, idx),
            TypeCategory::Boolean => bool_cell(row, idx),
            TypeCategory::Float => float_cell(row, idx).unwrap_or(JsonValue::Null),
            TypeCategory::Binary => binary_cell(row, idx),
            TypeCategory::Json => cell::<_, JsonValue>(row, idx)
                .ok()
                .flatten()
                .unwrap_or(JsonValue::Null),
            TypeCategory::Date => json_or_null(
                cell::<_, NaiveDate>(row, idx).ok().flatten(),
                |d| JsonValue::String(format_date(d)),
            ),
            TypeCategory::DateTime => datetime_cell(row, idx).unwrap_or(JsonValue::Null),
            TypeCategory::Time => json_or_null(
                cell::<_, NaiveTime>(row, idx).ok().flatten(),
                |t| JsonValue::String(t.format(TIME_FORMAT).to_string()),
            ),
            TypeCategory::Text => json_or_null(
                cell::<_, String>(row, idx).ok().flatten(),
                JsonValue::String,
            ),
        }
    }

    /// Postgres integer types only decode into their exact width.
    fn integer(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(v) = cell::<_, i64>(row, idx) {
            return json_or_null(v, JsonValue::from);
        }
        if let Ok(v) = cell::<_, i32>(row, idx) {
            return json_or_null(v, JsonValue::from);
        }
        json_or_null(cell::<_, i16>(row, idx).ok().flatten(), JsonValue::from)
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            // Declared INTEGER columns may still hold text or reals
            TypeCategory::Integer => match cell::<_, i64>(row, idx) {
                Ok(v) => json_or_null(v, JsonValue::from),
                Err(_) => float_cell(row, idx).unwrap_or_else(|| text(row, idx)),
            },
            TypeCategory::Boolean => bool_cell(row, idx),
            TypeCategory::Float | TypeCategory::Decimal => {
                float_cell(row, idx).unwrap_or_else(|| text(row, idx))
            }
            TypeCategory::Binary => binary_cell(row, idx),
            TypeCategory::Date | TypeCategory::DateTime => temporal(row, idx),
            _ => text(row, idx),
        }
    }

    /// No temporal storage class: values are text or unix epochs.
    fn temporal(row: &SqliteRow, idx: usize) -> JsonValue {
        if let Ok(v) = cell::<_, String>(row, idx) {
            return json_or_null(v, |s| JsonValue::String(normalize_temporal_text(&s)));
        }
        json_or_null(cell::<_, NaiveDateTime>(row, idx).ok().flatten(), |dt| {
            JsonValue::String(format_datetime(dt))
        })
    }

    /// Dynamic typing: try each storage class in turn.
    fn text(row: &SqliteRow, idx: usize) -> JsonValue {
        if let Ok(v) = cell::<_, String>(row, idx) {
            return json_or_null(v, JsonValue::String);
        }
        if let Ok(Some(v)) = cell::<_, i64>(row, idx) {
            return JsonValue::from(v);
        }
        if let Ok(Some(v)) = cell::<_, f64>(row, idx) {
            return float_value(v);
        }
        binary_cell(row, idx)
    }
}
