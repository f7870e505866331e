//! Live connection registry.
//!
//! The registry owns every open pool together with the dialect adapter that
//! generates SQL for it, keyed by connection name. It is the only mutable
//! state shared between tool calls; all access goes through one `RwLock`.

use crate::db::executor::QueryExecutor;
use crate::db::pool::DbPool;
use crate::dialect::{Dialect, SqlDialect};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionDescriptor, ConnectionSummary, DatabaseType};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Debug, Default)]
struct RegistryState {
    handles: HashMap<String, DbPool>,
    adapters: HashMap<String, Dialect>,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open, test and register a connection, replacing any entry with the same name.
    pub async fn try_add(&self, descriptor: &ConnectionDescriptor) -> DbResult<()> {
        let name = &descriptor.name;
        let db_type = descriptor.db_type;
        let dialect = Dialect::for_engine(db_type);

        let connection_string = dialect.connection_string(
            descriptor.host.as_deref().unwrap_or_default(),
            descriptor
                .port
                .or(db_type.default_port())
                .unwrap_or_default(),
            descriptor.username.as_deref().unwrap_or_default(),
            descriptor.password.as_deref().unwrap_or_default(),
            &descriptor.database,
        )?;

        info!(connection = %name, db_type = %db_type, "Connecting to database");

        // Create the pool outside the lock; connecting can take a while
        let pool = DbPool::connect(db_type, &connection_string, &descriptor.pool_options).await?;

        if let Err(e) = QueryExecutor::new()
            .fetch(&pool, dialect.test_query(), &[])
            .await
        {
            pool.close().await;
            return Err(e);
        }

        let replaced = {
            let mut state = self.state.write().await;
            state.adapters.insert(name.clone(), dialect);
            state.handles.insert(name.clone(), pool)
        }; // Lock released here

        if let Some(old) = replaced {
            info!(connection = %name, "Replacing existing connection");
            old.close().await;
        }

        info!(connection = %name, "Connected successfully");
        Ok(())
    }

    /// Like [`ConnectionRegistry::try_add`], reporting failure as `false`.
    pub async fn add(&self, descriptor: &ConnectionDescriptor) -> bool {
        match self.try_add(descriptor).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    connection = %descriptor.name,
                    db_type = %descriptor.db_type,
                    error = %e,
                    "Failed to add connection"
                );
                false
            }
        }
    }

    /// Close and forget a connection. Returns false if the name is unknown.
    pub async fn remove(&self, name: &str) -> bool {
        let removed = {
            let mut state = self.state.write().await;
            state.adapters.remove(name);
            state.handles.remove(name)
        };

        match removed {
            Some(pool) => {
                pool.close().await;
                info!(connection = %name, "Connection removed");
                true
            }
            None => {
                warn!(connection = %name, "Cannot remove unknown connection");
                false
            }
        }
    }

    /// Connect every enabled descriptor. One failure does not stop the others.
    pub async fn initialize_from_descriptors(
        &self,
        descriptors: &[ConnectionDescriptor],
    ) -> BTreeMap<String, bool> {
        let mut outcome = BTreeMap::new();
        for descriptor in descriptors.iter().filter(|d| d.enabled) {
            let ok = self.add(descriptor).await;
            outcome.insert(descriptor.name.clone(), ok);
        }
        info!(
            attempted = outcome.len(),
            connected = outcome.values().filter(|ok| **ok).count(),
            "Initialized connections"
        );
        outcome
    }

    pub async fn get(&self, name: &str) -> Option<DbPool> {
        self.state.read().await.handles.get(name).cloned()
    }

    pub async fn get_adapter(&self, name: &str) -> Option<Dialect> {
        self.state.read().await.adapters.get(name).copied()
    }

    /// Pool and adapter for a connection name.
    pub async fn resolve(&self, name: &str) -> DbResult<(DbPool, Dialect)> {
        let state = self.state.read().await;
        let pool = state
            .handles
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::connection_not_found(name))?;
        let dialect = state
            .adapters
            .get(name)
            .copied()
            .ok_or_else(|| DbError::adapter_not_found(name))?;
        Ok((pool, dialect))
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.state.read().await.handles.contains_key(name)
    }

    /// Connection name to engine type.
    pub async fn list_all(&self) -> BTreeMap<String, DatabaseType> {
        let state = self.state.read().await;
        state
            .handles
            .iter()
            .map(|(name, pool)| (name.clone(), pool.db_type()))
            .collect()
    }

    pub async fn summaries(&self) -> Vec<ConnectionSummary> {
        self.list_all()
            .await
            .into_iter()
            .map(|(name, db_type)| ConnectionSummary { name, db_type })
            .collect()
    }

    /// Close every connection and clear the registry.
    pub async fn dispose_all(&self) {
        let drained: Vec<(String, DbPool)> = {
            let mut state = self.state.write().await;
            state.adapters.clear();
            state.handles.drain().collect()
        };
        for (name, pool) in drained {
            info!(connection = %name, "Closing connection");
            pool.close().await;
        }
        info!("All connections closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;

    fn sqlite_descriptor(name: &str, path: &std::path::Path) -> ConnectionDescriptor {
        ConnectionDescriptor {
            name: name.to_string(),
            db_type: DatabaseType::SQLite,
            host: None,
            port: None,
            username: None,
            password: None,
            database: path.display().to_string(),
            enabled: true,
            pool_options: PoolOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_registry_starts_empty() {
        let registry = ConnectionRegistry::new();
        assert!(registry.list_all().await.is_empty());
        assert!(registry.get("nope").await.is_none());
        assert!(registry.get_adapter("nope").await.is_none());
        assert!(matches!(
            registry.resolve("nope").await,
            Err(DbError::ConnectionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_add_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ConnectionRegistry::new();
        let descriptor = sqlite_descriptor("local", &dir.path().join("a.db"));

        assert!(registry.add(&descriptor).await);
        assert_eq!(
            registry.list_all().await.get("local"),
            Some(&DatabaseType::SQLite)
        );
        assert_eq!(
            registry.get_adapter("local").await.map(|d| d.engine()),
            Some(DatabaseType::SQLite)
        );

        assert!(registry.remove("local").await);
        assert!(!registry.remove("local").await);
        assert!(!registry.contains("local").await);
    }

    #[tokio::test]
    async fn test_duplicate_name_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ConnectionRegistry::new();
        assert!(registry.add(&sqlite_descriptor("db", &dir.path().join("one.db"))).await);
        assert!(registry.add(&sqlite_descriptor("db", &dir.path().join("two.db"))).await);
        assert_eq!(registry.list_all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_skips_disabled_and_survives_failures() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ConnectionRegistry::new();

        let good = sqlite_descriptor("good", &dir.path().join("good.db"));
        let mut disabled = sqlite_descriptor("off", &dir.path().join("off.db"));
        disabled.enabled = false;
        let broken = sqlite_descriptor("broken", &dir.path().join("missing/dir/x.db"));

        let outcome = registry
            .initialize_from_descriptors(&[broken, disabled, good])
            .await;
        assert_eq!(outcome.get("good"), Some(&true));
        assert_eq!(outcome.get("broken"), Some(&false));
        assert!(!outcome.contains_key("off"));

        registry.dispose_all().await;
        assert!(registry.list_all().await.is_empty());
    }
}
