use super::{ChangeListener, ConfigPath, Configuration};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

struct Watcher {
    paths: Vec<String>,
    listener: Arc<dyn ChangeListener>,
}

/// In-process configuration store
///
/// Holds raw values keyed by rendered path and pushes changes to watchers.
/// Used as the configuration service when the application config seeds the
/// values itself, and in tests.
#[derive(Default)]
pub struct MemoryConfiguration {
    entries: RwLock<HashMap<String, String>>,
    watchers: Mutex<Vec<Watcher>>,
}

impl MemoryConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from raw `path -> value` pairs
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: RwLock::new(entries),
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Create a store from structured values.
    ///
    /// Strings are stored as-is, anything else is stored as its JSON text.
    pub fn from_values(values: &HashMap<String, serde_json::Value>) -> Self {
        Self::from_entries(values.iter().map(|(path, value)| {
            let raw = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (path.clone(), raw)
        }))
    }

    /// Store `value` at `path` and notify the watchers of that path
    pub fn set(&self, path: impl Into<String>, value: impl Into<String>) -> AppResult<()> {
        let path = path.into();
        let value = value.into();

        self.entries.write()?.insert(path.clone(), value.clone());

        let listeners: Vec<Arc<dyn ChangeListener>> = self
            .watchers
            .lock()?
            .iter()
            .filter(|w| w.paths.contains(&path))
            .map(|w| w.listener.clone())
            .collect();

        for listener in listeners {
            listener.changed(HashMap::from([(path.clone(), value.clone())]));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Configuration for MemoryConfiguration {
    async fn string(&self, path: &ConfigPath) -> AppResult<String> {
        let key = path.to_string();
        self.entries
            .read()?
            .get(&key)
            .cloned()
            .ok_or_else(|| AppError::Configuration(format!("No value configured at {}", key)))
    }

    async fn watch(
        &self,
        paths: &[ConfigPath],
        listener: Arc<dyn ChangeListener>,
    ) -> AppResult<()> {
        let paths: Vec<String> = paths.iter().map(|p| p.to_string()).collect();

        let current: HashMap<String, String> = {
            let entries = self.entries.read()?;
            paths
                .iter()
                .filter_map(|p| entries.get(p).map(|v| (p.clone(), v.clone())))
                .collect()
        };

        self.watchers.lock()?.push(Watcher {
            paths,
            listener: listener.clone(),
        });

        if !current.is_empty() {
            listener.changed(current);
        }
        Ok(())
    }
}
