//! Schema-related data models.
//!
//! This module defines the column definitions and alter operations used as
//! DDL input, and the normalized column description returned by
//! `describeTable`.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Declared length of a column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ColumnLength {
    /// e.g. `VARCHAR(255)`
    Size(u32),
    /// e.g. `DECIMAL(10,2)`, written as `[10, 2]`
    Precision(u32, u32),
}

impl std::fmt::Display for ColumnLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Size(n) => write!(f, "({n})"),
            Self::Precision(p, s) => write!(f, "({p},{s})"),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Keeps an explicit `null` as `Some(Null)` so it can render as `DEFAULT NULL`.
fn explicit_value<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

/// Column definition used by create and alter statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// Declared SQL type, e.g. "VARCHAR", "INTEGER", "NUMBER"
    #[serde(rename = "type")]
    pub data_type: String,
    /// Length as a number (255) or a precision/scale pair ([10, 2])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<ColumnLength>,
    /// Whether NULL is allowed (default: true)
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Inline PRIMARY KEY constraint (default: false)
    #[serde(default)]
    pub primary_key: bool,
    /// Default value. Strings are quoted, numbers and booleans are emitted as-is, null renders DEFAULT NULL
    #[serde(
        default,
        deserialize_with = "explicit_value",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<JsonValue>")]
    pub default: Option<JsonValue>,
    /// Column comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ColumnDefinition {
    /// Create a nullable column without length, default or comment.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            length: None,
            nullable: true,
            primary_key: false,
            default: None,
            comment: None,
        }
    }

    pub fn with_length(mut self, length: ColumnLength) -> Self {
        self.length = Some(length);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn with_default(mut self, value: JsonValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Declared type with its length suffix, e.g. `VARCHAR(50)`.
    pub fn type_with_length(&self) -> String {
        match self.length {
            Some(length) => format!("{}{}", self.data_type, length),
            None => self.data_type.clone(),
        }
    }
}

/// One step of an `ALTER TABLE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum AlterOperation {
    AddColumn {
        #[serde(flatten)]
        column: ColumnDefinition,
    },
    DropColumn {
        name: String,
    },
    ModifyColumn {
        #[serde(flatten)]
        column: ColumnDefinition,
    },
    RenameColumn {
        old_name: String,
        new_name: String,
        /// Required by engines that restate the type on rename (MySQL CHANGE COLUMN)
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        data_type: Option<String>,
    },
}

impl AlterOperation {
    /// Tag name, as used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddColumn { .. } => "add_column",
            Self::DropColumn { .. } => "drop_column",
            Self::ModifyColumn { .. } => "modify_column",
            Self::RenameColumn { .. } => "rename_column",
        }
    }
}

/// Normalized description of one column.
///
/// Engine-specific extras (`key`, `extra`, `char_length`, `primary_key`, ...)
/// are flattened next to the common fields.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub default: JsonValue,
    #[serde(flatten)]
    pub extras: Map<String, JsonValue>,
}
