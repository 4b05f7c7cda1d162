//! Configuration collaborator
//!
//! Connection parameters and data-source privileges live in a remote
//! key/value configuration service. Values are JSON blobs addressed by
//! `(namespace, topic, tenant, key)`:
//!
//! ```text
//! /system/base/mongo/common       -> shared connection defaults
//! /system/base/mongo/<data source> -> per data-source overrides
//! /system/base/mongo/privileges   -> {"<system id>": ["<data source>", ...]}
//! ```
//!
//! The service itself is external; [`Configuration`] is the seam the engine
//! talks to and [`MemoryConfiguration`] is the in-process implementation.

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub mod memory;

pub use memory::MemoryConfiguration;

/// Root node every configuration path hangs off
pub const ROOT: &str = "/system";

/// Address of a single configuration value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigPath {
    pub namespace: String,
    pub topic: String,
    /// Optional tenant segment, skipped when empty
    pub tenant: String,
    pub key: String,
}

impl ConfigPath {
    pub fn new(namespace: &str, topic: &str, tenant: &str, key: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            topic: topic.to_string(),
            tenant: tenant.to_string(),
            key: key.to_string(),
        }
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tenant.is_empty() {
            write!(f, "{}/{}/{}/{}", ROOT, self.namespace, self.topic, self.key)
        } else {
            write!(
                f,
                "{}/{}/{}/{}/{}",
                ROOT, self.namespace, self.topic, self.tenant, self.key
            )
        }
    }
}

/// Receives raw values whenever a watched path changes.
///
/// `data` maps the rendered path to the new raw string value.
pub trait ChangeListener: Send + Sync {
    fn changed(&self, data: HashMap<String, String>);
}

/// Key/value access to the configuration service
#[async_trait]
pub trait Configuration: Send + Sync {
    /// Fetch the raw value stored at `path`
    async fn string(&self, path: &ConfigPath) -> AppResult<String>;

    /// Subscribe `listener` to changes of `paths`.
    ///
    /// Implementations deliver the current values of the paths that exist
    /// right away, then every later change.
    async fn watch(&self, paths: &[ConfigPath], listener: Arc<dyn ChangeListener>)
        -> AppResult<()>;

    /// Fetch the value at `path` decoded as JSON
    async fn value(&self, path: &ConfigPath) -> AppResult<serde_json::Value> {
        let raw = self.string(path).await?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::Configuration(format!("Value at {} is not valid JSON: {}", path, e))
        })
    }
}

/// Fetch the value at `path` and decode it straight into `T`
pub async fn clazz<T: DeserializeOwned>(cfg: &dyn Configuration, path: &ConfigPath) -> AppResult<T> {
    let value = cfg.value(path).await?;
    serde_json::from_value(value)
        .map_err(|e| AppError::Configuration(format!("Failed to decode {}: {}", path, e)))
}
