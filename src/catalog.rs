//! The connections file.
//!
//! [`ConnectionCatalog`] owns the JSON document `{"connections": [...]}` that
//! lists configured connection descriptors. It validates entries on load and
//! on every add, and rewrites the file (pretty-printed) after each change.

use crate::error::{DbError, DbResult};
use crate::models::ConnectionDescriptor;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Serialize)]
struct CatalogFile<'a> {
    connections: &'a [ConnectionDescriptor],
}

#[derive(Debug)]
pub struct ConnectionCatalog {
    path: PathBuf,
    descriptors: RwLock<Vec<ConnectionDescriptor>>,
}

impl ConnectionCatalog {
    /// Load the catalog from `path`. A missing file is an empty catalog.
    pub async fn load(path: impl Into<PathBuf>) -> DbResult<Self> {
        let path = path.into();
        let descriptors = read_descriptors(&path).await?;
        info!(
            path = %path.display(),
            connections = descriptors.len(),
            "Loaded connection configuration"
        );
        Ok(Self {
            path,
            descriptors: RwLock::new(descriptors),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every configured descriptor, passwords masked.
    pub async fn list(&self) -> Vec<ConnectionDescriptor> {
        self.descriptors
            .read()
            .await
            .iter()
            .map(ConnectionDescriptor::redacted)
            .collect()
    }

    pub async fn get(&self, name: &str) -> Option<ConnectionDescriptor> {
        self.descriptors
            .read()
            .await
            .iter()
            .find(|d| d.name == name)
            .cloned()
    }

    /// Descriptors with `enabled: true`, unredacted.
    pub async fn enabled(&self) -> Vec<ConnectionDescriptor> {
        self.descriptors
            .read()
            .await
            .iter()
            .filter(|d| d.enabled)
            .cloned()
            .collect()
    }

    /// Validate and persist a new descriptor. Names must be unique.
    pub async fn add(&self, descriptor: ConnectionDescriptor) -> DbResult<()> {
        descriptor.validate()?;
        let mut descriptors = self.descriptors.write().await;
        if descriptors.iter().any(|d| d.name == descriptor.name) {
            return Err(DbError::validation(format!(
                "a configured connection named '{}' already exists",
                descriptor.name
            )));
        }
        descriptors.push(descriptor);
        self.save(&descriptors).await
    }

    /// Drop a descriptor. Returns false if no descriptor has that name.
    pub async fn remove(&self, name: &str) -> DbResult<bool> {
        let mut descriptors = self.descriptors.write().await;
        let before = descriptors.len();
        descriptors.retain(|d| d.name != name);
        if descriptors.len() == before {
            return Ok(false);
        }
        self.save(&descriptors).await?;
        Ok(true)
    }

    pub async fn set_enabled(&self, name: &str, enabled: bool) -> DbResult<()> {
        let mut descriptors = self.descriptors.write().await;
        let descriptor = descriptors
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| {
                DbError::validation(format!("no configured connection named '{name}'"))
            })?;
        descriptor.enabled = enabled;
        self.save(&descriptors).await?;
        info!(connection = %name, enabled = enabled, "Updated configured connection");
        Ok(())
    }

    /// Re-read the file, replacing the in-memory list. Returns the enabled descriptors.
    pub async fn reload(&self) -> DbResult<Vec<ConnectionDescriptor>> {
        let fresh = read_descriptors(&self.path).await?;
        let enabled = fresh.iter().filter(|d| d.enabled).cloned().collect();
        *self.descriptors.write().await = fresh;
        info!(path = %self.path.display(), "Reloaded connection configuration");
        Ok(enabled)
    }

    async fn save(&self, descriptors: &[ConnectionDescriptor]) -> DbResult<()> {
        let text = serde_json::to_string_pretty(&CatalogFile {
            connections: descriptors,
        })
        .map_err(|e| DbError::unexpected(format!("failed to encode connections: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create directory for", &self.path, e))?;
        }
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| io_error("write", &self.path, e))
    }
}

/// Parse the connections file. Invalid entries are skipped with a warning.
async fn read_descriptors(path: &Path) -> DbResult<Vec<ConnectionDescriptor>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error("read", path, e)),
    };

    let document: JsonValue = serde_json::from_str(&text).map_err(|e| {
        DbError::validation(format!("{} is not valid JSON: {e}", path.display()))
    })?;
    let entries = match document.get("connections") {
        None | Some(JsonValue::Null) => return Ok(Vec::new()),
        Some(JsonValue::Array(entries)) => entries,
        Some(_) => {
            return Err(DbError::validation(format!(
                "'connections' in {} must be an array",
                path.display()
            )));
        }
    };

    let mut descriptors: Vec<ConnectionDescriptor> = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match ConnectionDescriptor::from_value(index, entry) {
            Ok(d) if descriptors.iter().any(|existing| existing.name == d.name) => {
                warn!(connection = %d.name, "Skipping duplicate configured connection");
            }
            Ok(d) => descriptors.push(d),
            Err(e) => warn!(index = index, error = %e, "Skipping invalid configured connection"),
        }
    }
    Ok(descriptors)
}

fn io_error(action: &str, path: &Path, error: std::io::Error) -> DbError {
    DbError::unexpected(format!("failed to {action} {}: {error}", path.display()))
}
