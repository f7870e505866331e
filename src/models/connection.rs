//! Connection-related data models.
//!
//! This module defines the engine enum, the connection descriptor consumed
//! from configuration or the `addConnection` tool, and the summaries
//! returned to callers.

use crate::config::PoolOptions;
use crate::error::{DbError, DbResult};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Supported database engines.
///
/// Deserializes through [`DatabaseType::parse`], so every accepted engine
/// name (aliases and any casing) works in configuration and tool input alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// Includes MariaDB
    MySQL,
    Oracle,
    PostgreSQL,
    SQLite,
    SqlServer,
}

impl DatabaseType {
    pub const ALL: [DatabaseType; 5] = [
        Self::MySQL,
        Self::Oracle,
        Self::PostgreSQL,
        Self::SQLite,
        Self::SqlServer,
    ];

    /// Parse an engine name as written in configuration (`mysql`, `oracle`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySQL),
            "oracle" => Some(Self::Oracle),
            "postgresql" | "postgres" => Some(Self::PostgreSQL),
            "sqlite" => Some(Self::SQLite),
            "sqlserver" | "mssql" => Some(Self::SqlServer),
            _ => None,
        }
    }

    /// Configuration name of the engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySQL => "mysql",
            Self::Oracle => "oracle",
            Self::PostgreSQL => "postgresql",
            Self::SQLite => "sqlite",
            Self::SqlServer => "sqlserver",
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySQL => "MySQL",
            Self::Oracle => "Oracle",
            Self::PostgreSQL => "PostgreSQL",
            Self::SQLite => "SQLite",
            Self::SqlServer => "SQL Server",
        }
    }

    /// Get the default port for this database type.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::MySQL => Some(3306),
            Self::Oracle => Some(1521),
            Self::PostgreSQL => Some(5432),
            Self::SQLite => None,
            Self::SqlServer => Some(1433),
        }
    }

    /// File-based engines only need a database path.
    pub fn is_file_based(&self) -> bool {
        matches!(self, Self::SQLite)
    }
}

impl<'de> Deserialize<'de> for DatabaseType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        const NAMES: &[&str] = &["mysql", "oracle", "postgresql", "sqlite", "sqlserver"];
        let name = String::deserialize(deserializer)?;
        Self::parse(&name).ok_or_else(|| serde::de::Error::unknown_variant(&name, NAMES))
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A named set of connection parameters.
///
/// SQLite only needs `database` (the file path); every other engine needs
/// host, port, username, password and database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub db_type: DatabaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Contains sensitive data - never log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub database: String,
    /// Missing means disabled.
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub pool_options: PoolOptions,
}

const REMOTE_REQUIRED_FIELDS: [&str; 5] = ["host", "port", "username", "password", "database"];

impl ConnectionDescriptor {
    /// Build and validate a descriptor from one entry of the connections file.
    ///
    /// `index` is only used to point at the offending entry in error messages.
    pub fn from_value(index: usize, value: &JsonValue) -> DbResult<Self> {
        let obj = value.as_object().ok_or_else(|| {
            DbError::validation(format!("connection #{index} must be a JSON object"))
        })?;

        let name = obj
            .get("name")
            .and_then(JsonValue::as_str)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                DbError::validation(format!("connection #{index} is missing a non-empty 'name'"))
            })?;

        let type_name = obj.get("type").and_then(JsonValue::as_str).ok_or_else(|| {
            DbError::validation(format!("connection '{name}' is missing 'type'"))
        })?;
        let db_type = DatabaseType::parse(type_name)
            .ok_or_else(|| DbError::unsupported_engine_type(type_name))?;

        if !db_type.is_file_based() {
            for field in REMOTE_REQUIRED_FIELDS {
                let missing = match obj.get(field) {
                    None | Some(JsonValue::Null) => true,
                    Some(JsonValue::String(s)) => s.is_empty() && field != "password",
                    Some(_) => false,
                };
                if missing {
                    return Err(DbError::validation(format!(
                        "connection '{name}' ({db_type}) requires '{field}'"
                    )));
                }
            }
        } else if obj
            .get("database")
            .and_then(JsonValue::as_str)
            .is_none_or(str::is_empty)
        {
            return Err(DbError::validation(format!(
                "connection '{name}' (SQLite) requires 'database' (the file path)"
            )));
        }

        if let Some(port) = obj.get("port").filter(|p| !p.is_null()) {
            match port.as_u64() {
                Some(p) if (1..=65535).contains(&p) => {}
                _ => {
                    return Err(DbError::validation(format!(
                        "connection '{name}' has invalid port {port}; expected an integer in 1..=65535"
                    )));
                }
            }
        }

        if let Some(enabled) = obj.get("enabled") {
            if !enabled.is_boolean() {
                return Err(DbError::validation(format!(
                    "connection '{name}' has non-boolean 'enabled' value {enabled}"
                )));
            }
        }

        let mut descriptor: ConnectionDescriptor = serde_json::from_value(value.clone())
            .map_err(|e| DbError::validation(format!("connection '{name}': {e}")))?;
        descriptor.db_type = db_type;
        descriptor.pool_options.validate().map_err(|e| {
            DbError::validation(format!("connection '{name}': {e}"))
        })?;

        Ok(descriptor)
    }

    /// Validate a descriptor built in code (e.g. from the `addConnection` tool).
    pub fn validate(&self) -> DbResult<()> {
        let value = serde_json::to_value(self)
            .map_err(|e| DbError::unexpected(format!("failed to encode descriptor: {e}")))?;
        Self::from_value(0, &value).map(|_| ())
    }

    /// Copy of this descriptor that is safe to hand back to callers.
    pub fn redacted(&self) -> Self {
        Self {
            password: self.password.as_ref().map(|_| "****".to_string()),
            ..self.clone()
        }
    }
}

/// One live connection as reported by `listConnections`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ConnectionSummary {
    /// Connection name used by every other tool
    pub name: String,
    /// Engine type: "mysql", "oracle", "postgresql", "sqlite" or "sqlserver"
    pub db_type: DatabaseType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mysql_entry() -> JsonValue {
        json!({
            "name": "sales",
            "type": "mysql",
            "host": "db.local",
            "port": 3306,
            "username": "app",
            "password": "secret",
            "database": "sales",
            "enabled": true
        })
    }

    #[test]
    fn test_database_type_parse() {
        assert_eq!(DatabaseType::parse("MySQL"), Some(DatabaseType::MySQL));
        assert_eq!(DatabaseType::parse("postgresql"), Some(DatabaseType::PostgreSQL));
        assert_eq!(DatabaseType::parse("sqlserver"), Some(DatabaseType::SqlServer));
        assert_eq!(DatabaseType::parse("db2"), None);
    }

    #[test]
    fn test_database_type_serde_names() {
        for engine in DatabaseType::ALL {
            let encoded = serde_json::to_value(engine).unwrap();
            assert_eq!(encoded, json!(engine.as_str()));
        }
    }

    #[test]
    fn test_engine_aliases_deserialize() {
        for (alias, engine) in [
            ("mssql", DatabaseType::SqlServer),
            ("postgres", DatabaseType::PostgreSQL),
            ("MariaDB", DatabaseType::MySQL),
            ("SQLite", DatabaseType::SQLite),
        ] {
            let decoded: DatabaseType = serde_json::from_value(json!(alias)).unwrap();
            assert_eq!(decoded, engine);

            let mut entry = mysql_entry();
            entry["type"] = json!(alias);
            entry["database"] = json!("/tmp/x.db");
            let descriptor = ConnectionDescriptor::from_value(0, &entry).unwrap();
            assert_eq!(descriptor.db_type, engine);
        }
        assert!(serde_json::from_value::<DatabaseType>(json!("db2")).is_err());
    }

    #[test]
    fn test_descriptor_from_value() {
        let descriptor = ConnectionDescriptor::from_value(0, &mysql_entry()).unwrap();
        assert_eq!(descriptor.name, "sales");
        assert_eq!(descriptor.db_type, DatabaseType::MySQL);
        assert_eq!(descriptor.port, Some(3306));
        assert!(descriptor.enabled);
    }

    #[test]
    fn test_descriptor_missing_host_rejected() {
        let mut entry = mysql_entry();
        entry.as_object_mut().unwrap().remove("host");
        let err = ConnectionDescriptor::from_value(0, &entry).unwrap_err();
        assert!(matches!(err, DbError::Validation { .. }));
        assert!(err.to_string().contains("host"));
    }

    #[test]
    fn test_descriptor_port_out_of_range() {
        let mut entry = mysql_entry();
        entry["port"] = json!(70000);
        let err = ConnectionDescriptor::from_value(0, &entry).unwrap_err();
        assert!(err.to_string().contains("port"));

        entry["port"] = json!(0);
        assert!(ConnectionDescriptor::from_value(0, &entry).is_err());
    }

    #[test]
    fn test_descriptor_enabled_must_be_bool() {
        let mut entry = mysql_entry();
        entry["enabled"] = json!("yes");
        let err = ConnectionDescriptor::from_value(0, &entry).unwrap_err();
        assert!(err.to_string().contains("enabled"));
    }

    #[test]
    fn test_descriptor_unknown_engine() {
        let mut entry = mysql_entry();
        entry["type"] = json!("db2");
        let err = ConnectionDescriptor::from_value(0, &entry).unwrap_err();
        assert!(matches!(err, DbError::UnsupportedEngineType { .. }));
    }

    #[test]
    fn test_sqlite_descriptor_only_needs_path() {
        let entry = json!({"name": "local", "type": "sqlite", "database": "/tmp/x.db"});
        let descriptor = ConnectionDescriptor::from_value(0, &entry).unwrap();
        assert_eq!(descriptor.db_type, DatabaseType::SQLite);
        assert!(!descriptor.enabled);
        assert!(descriptor.host.is_none());
    }

    #[test]
    fn test_descriptor_pool_fields_flattened() {
        let mut entry = mysql_entry();
        entry["pool_size"] = json!(5);
        entry["pool_recycle"] = json!(600);
        let descriptor = ConnectionDescriptor::from_value(0, &entry).unwrap();
        assert_eq!(descriptor.pool_options.pool_size, Some(5));
        assert_eq!(descriptor.pool_options.pool_recycle, Some(600));
        assert_eq!(descriptor.pool_options.max_overflow, None);
    }

    #[test]
    fn test_redacted_hides_password() {
        let descriptor = ConnectionDescriptor::from_value(0, &mysql_entry()).unwrap();
        let redacted = descriptor.redacted();
        assert_eq!(redacted.password.as_deref(), Some("****"));
        assert_eq!(redacted.host, descriptor.host);
    }
}
