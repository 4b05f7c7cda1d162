use crate::configuration::ChangeListener;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{info, warn};

/// Data sources each system may open, pushed by the configuration service
///
/// A change payload is a JSON object `{"<system id>": ["<data source>", ...]}`.
/// Each system named in a payload has its entry replaced as a whole; systems
/// not named keep theirs. Concurrent notifications are last-writer-wins.
#[derive(Debug, Default)]
pub struct PrivilegeTable {
    privileges: RwLock<HashMap<String, Vec<String>>>,
}

impl PrivilegeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data sources granted to `system_id`, empty when none
    pub fn privileges(&self, system_id: &str) -> Vec<String> {
        self.privileges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(system_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn permits(&self, system_id: &str, data_source: &str) -> bool {
        self.privileges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(system_id)
            .is_some_and(|list| list.iter().any(|ds| ds == data_source))
    }

    /// Apply one raw change payload, returning how many systems it touched
    pub fn apply(&self, raw: &str) -> Result<usize, serde_json::Error> {
        let update: HashMap<String, Vec<String>> = serde_json::from_str(raw)?;
        let touched = update.len();
        let mut privileges = self
            .privileges
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for (system_id, data_sources) in update {
            privileges.insert(system_id, data_sources);
        }
        Ok(touched)
    }
}

impl ChangeListener for PrivilegeTable {
    fn changed(&self, data: HashMap<String, String>) {
        for (path, raw) in data {
            match self.apply(&raw) {
                Ok(touched) => info!("Refreshed data source privileges of {} system(s) from {}", touched, path),
                Err(e) => warn!("Ignoring malformed privilege payload at {}: {}", path, e),
            }
        }
    }
}
