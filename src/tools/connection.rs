//! Connection management tools.
//!
//! This module implements the live-connection tools (`addConnection`,
//! `removeConnection`, `listConnections`) and the configured-connection tools
//! backed by the connections file.

use crate::catalog::ConnectionCatalog;
use crate::config::PoolOptions;
use crate::error::{DbError, DbResult};
use crate::facade::DatabaseFacade;
use crate::models::{ConnectionDescriptor, ConnectionSummary, DatabaseType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Input for the addConnection tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddConnectionInput {
    /// Unique connection name used by every other tool
    pub name: String,
    /// Engine type: mysql, oracle, postgresql, sqlite or sqlserver
    #[serde(rename = "type")]
    pub db_type: String,
    /// Server host. Not used for SQLite.
    #[serde(default)]
    pub host: Option<String>,
    /// Server port. Defaults to the engine's standard port.
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Database (schema/service) name, or the file path for SQLite
    pub database: String,
    /// Steady-state pool size (default 10)
    #[serde(default)]
    pub pool_size: Option<u32>,
    /// Extra connections above pool_size (default 20)
    #[serde(default)]
    pub max_overflow: Option<u32>,
    /// Seconds to wait for a free connection (default 30)
    #[serde(default)]
    pub pool_timeout: Option<u64>,
    /// Maximum connection age in seconds (default 3600)
    #[serde(default)]
    pub pool_recycle: Option<u64>,
    /// Also store the connection in the configuration file when it succeeds
    #[serde(default)]
    pub save_to_config: bool,
}

impl AddConnectionInput {
    fn into_descriptor(self) -> DbResult<ConnectionDescriptor> {
        let db_type = DatabaseType::parse(&self.db_type)
            .ok_or_else(|| DbError::unsupported_engine_type(&self.db_type))?;
        let port = self.port.or_else(|| db_type.default_port());
        let descriptor = ConnectionDescriptor {
            name: self.name.trim().to_string(),
            db_type,
            host: self.host,
            port,
            username: self.username,
            password: self.password,
            database: self.database,
            enabled: true,
            pool_options: PoolOptions {
                pool_size: self.pool_size,
                max_overflow: self.max_overflow,
                pool_timeout: self.pool_timeout,
                pool_recycle: self.pool_recycle,
            },
        };
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// Output from the addConnection tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AddConnectionOutput {
    pub success: bool,
    /// Whether the connection was written to the configuration file
    pub saved_to_config: bool,
    pub message: String,
}

/// Input for the removeConnection tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveConnectionInput {
    /// Connection name from listConnections
    pub name: String,
    /// Also delete the connection from the configuration file
    #[serde(default)]
    pub remove_from_config: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RemoveConnectionOutput {
    pub success: bool,
    pub removed_from_config: bool,
    pub message: String,
}

/// Output for the listConnections tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListConnectionsOutput {
    /// Live database connections
    pub connections: Vec<ConnectionSummary>,
    /// Number of connections
    pub count: usize,
}

/// A connection from the configuration file, password omitted.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ConfiguredConnection {
    pub name: String,
    pub db_type: DatabaseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub database: String,
    pub enabled: bool,
    /// Whether a live connection with this name exists right now
    pub connected: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListConfiguredConnectionsOutput {
    pub connections: Vec<ConfiguredConnection>,
    pub count: usize,
    /// Path of the configuration file
    pub config_path: String,
}

/// Input for the enable/disableConfiguredConnection tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ConfiguredConnectionInput {
    /// Connection name from listConfiguredConnections
    pub name: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SetEnabledOutput {
    pub name: String,
    pub enabled: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ReloadConfigurationsOutput {
    /// Connection name to whether it connected
    pub results: BTreeMap<String, bool>,
    pub connected: usize,
    pub failed: usize,
}

pub struct ConnectionToolHandler {
    facade: Arc<DatabaseFacade>,
    catalog: Arc<ConnectionCatalog>,
}

impl ConnectionToolHandler {
    pub fn new(facade: Arc<DatabaseFacade>, catalog: Arc<ConnectionCatalog>) -> Self {
        Self { facade, catalog }
    }

    pub async fn add_connection(&self, input: AddConnectionInput) -> DbResult<AddConnectionOutput> {
        let save = input.save_to_config;
        let descriptor = input.into_descriptor()?;
        let name = descriptor.name.clone();

        if !self.facade.add_connection(&descriptor).await {
            return Ok(AddConnectionOutput {
                success: false,
                saved_to_config: false,
                message: format!(
                    "Failed to connect '{name}' ({}); see server logs for the driver error",
                    descriptor.db_type
                ),
            });
        }

        let mut message = format!("Connection '{name}' added");
        let mut saved_to_config = false;
        if save {
            match self.catalog.add(descriptor).await {
                Ok(()) => {
                    saved_to_config = true;
                    message.push_str(" and saved to configuration");
                }
                Err(e) => {
                    warn!(connection = %name, error = %e, "Connection not saved to configuration");
                    message.push_str(&format!(", but not saved to configuration: {e}"));
                }
            }
        }

        info!(connection = %name, saved_to_config = saved_to_config, "Connection added");
        Ok(AddConnectionOutput {
            success: true,
            saved_to_config,
            message,
        })
    }

    pub async fn remove_connection(
        &self,
        input: RemoveConnectionInput,
    ) -> DbResult<RemoveConnectionOutput> {
        let name = input.name.trim();
        if !self.facade.remove_connection(name).await {
            return Err(DbError::connection_not_found(name));
        }

        let removed_from_config = if input.remove_from_config {
            self.catalog.remove(name).await?
        } else {
            false
        };

        Ok(RemoveConnectionOutput {
            success: true,
            removed_from_config,
            message: format!("Connection '{name}' removed"),
        })
    }

    pub async fn list_connections(&self) -> ListConnectionsOutput {
        let connections = self.facade.registry().summaries().await;
        ListConnectionsOutput {
            count: connections.len(),
            connections,
        }
    }

    pub async fn list_configured_connections(&self) -> ListConfiguredConnectionsOutput {
        let live = self.facade.list_connections().await;
        let connections: Vec<ConfiguredConnection> = self
            .catalog
            .list()
            .await
            .into_iter()
            .map(|d| ConfiguredConnection {
                connected: live.contains_key(&d.name),
                name: d.name,
                db_type: d.db_type,
                host: d.host,
                port: d.port,
                username: d.username,
                database: d.database,
                enabled: d.enabled,
            })
            .collect();

        ListConfiguredConnectionsOutput {
            count: connections.len(),
            connections,
            config_path: self.catalog.path().display().to_string(),
        }
    }

    pub async fn set_enabled(
        &self,
        input: ConfiguredConnectionInput,
        enabled: bool,
    ) -> DbResult<SetEnabledOutput> {
        let name = input.name.trim().to_string();
        self.catalog.set_enabled(&name, enabled).await?;
        let state = if enabled { "enabled" } else { "disabled" };
        Ok(SetEnabledOutput {
            message: format!("Configured connection '{name}' {state}; run reloadConfigurations to apply"),
            name,
            enabled,
        })
    }

    /// Re-read the configuration file and connect every enabled entry.
    pub async fn reload_configurations(&self) -> DbResult<ReloadConfigurationsOutput> {
        let enabled = self.catalog.reload().await?;
        let results = self
            .facade
            .registry()
            .initialize_from_descriptors(&enabled)
            .await;
        let connected = results.values().filter(|ok| **ok).count();
        Ok(ReloadConfigurationsOutput {
            failed: results.len() - connected,
            connected,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConnectionRegistry, QueryExecutor};

    async fn handler(dir: &tempfile::TempDir) -> ConnectionToolHandler {
        let facade = Arc::new(DatabaseFacade::new(
            ConnectionRegistry::new(),
            QueryExecutor::new(),
        ));
        let catalog = Arc::new(
            ConnectionCatalog::load(dir.path().join("db.json"))
                .await
                .unwrap(),
        );
        ConnectionToolHandler::new(facade, catalog)
    }

    fn sqlite_input(dir: &tempfile::TempDir, name: &str, save: bool) -> AddConnectionInput {
        AddConnectionInput {
            name: name.to_string(),
            db_type: "sqlite".to_string(),
            host: None,
            port: None,
            username: None,
            password: None,
            database: dir.path().join(format!("{name}.db")).display().to_string(),
            pool_size: None,
            max_overflow: None,
            pool_timeout: None,
            pool_recycle: None,
            save_to_config: save,
        }
    }

    #[test]
    fn test_into_descriptor_fills_default_port() {
        let input = AddConnectionInput {
            name: "pg".to_string(),
            db_type: "postgres".to_string(),
            host: Some("localhost".to_string()),
            port: None,
            username: Some("app".to_string()),
            password: Some("pw".to_string()),
            database: "app".to_string(),
            pool_size: None,
            max_overflow: None,
            pool_timeout: None,
            pool_recycle: None,
            save_to_config: false,
        };
        let descriptor = input.into_descriptor().unwrap();
        assert_eq!(descriptor.db_type, DatabaseType::PostgreSQL);
        assert_eq!(descriptor.port, Some(5432));
        assert!(descriptor.enabled);
    }

    #[test]
    fn test_into_descriptor_rejects_unknown_engine() {
        let dir = tempfile::tempdir().unwrap();
        let mut input = sqlite_input(&dir, "x", false);
        input.db_type = "db2".to_string();
        assert!(matches!(
            input.into_descriptor(),
            Err(DbError::UnsupportedEngineType { .. })
        ));
    }

    #[tokio::test]
    async fn test_add_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(&dir).await;

        let output = handler
            .add_connection(sqlite_input(&dir, "local", true))
            .await
            .unwrap();
        assert!(output.success);
        assert!(output.saved_to_config);

        let listed = handler.list_configured_connections().await;
        assert_eq!(listed.count, 1);
        assert!(listed.connections[0].connected);
        assert_eq!(handler.list_connections().await.count, 1);

        let removed = handler
            .remove_connection(RemoveConnectionInput {
                name: "local".to_string(),
                remove_from_config: true,
            })
            .await
            .unwrap();
        assert!(removed.removed_from_config);
        assert_eq!(handler.list_configured_connections().await.count, 0);
    }

    #[tokio::test]
    async fn test_failed_connection_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(&dir).await;
        let mut input = sqlite_input(&dir, "broken", true);
        input.database = dir.path().join("no/such/dir/x.db").display().to_string();

        let output = handler.add_connection(input).await.unwrap();
        assert!(!output.success);
        assert!(!output.saved_to_config);
        assert_eq!(handler.list_configured_connections().await.count, 0);
    }

    #[tokio::test]
    async fn test_enable_then_reload_connects() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(&dir).await;
        let mut descriptor = sqlite_input(&dir, "later", false).into_descriptor().unwrap();
        descriptor.enabled = false;
        handler.catalog.add(descriptor).await.unwrap();

        let reloaded = handler.reload_configurations().await.unwrap();
        assert!(reloaded.results.is_empty());

        handler
            .set_enabled(
                ConfiguredConnectionInput {
                    name: "later".to_string(),
                },
                true,
            )
            .await
            .unwrap();
        let reloaded = handler.reload_configurations().await.unwrap();
        assert_eq!(reloaded.results.get("later"), Some(&true));
        assert_eq!(reloaded.connected, 1);
    }
}
