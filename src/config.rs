use crate::search::FieldMapping;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").unwrap();
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Id of this business system; default data source and privilege subject
    pub system_id: String,
    /// Data source served over HTTP, empty for the system's default
    #[serde(default)]
    pub data_source: String,
    /// Seed of the in-memory configuration store, keyed by path
    #[serde(default)]
    pub configuration: HashMap<String, serde_json::Value>,
    /// Field mapping of every collection exposed over HTTP
    #[serde(default)]
    pub collections: HashMap<String, FieldMapping>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from YAML file
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, String> {
        let path = config_path.as_ref();

        if !path.exists() {
            return Err(format!("Configuration file not found: {}", path.display()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        Self::load_from_str(&content)
            .map_err(|e| format!("Failed to load config file {}: {}", path.display(), e))
    }

    /// Parse configuration from YAML text
    pub fn load_from_str(content: &str) -> Result<Self, String> {
        let expanded_content = Self::expand_env_vars(content)?;

        let app_config: AppConfig =
            serde_yaml::from_str(&expanded_content).map_err(|e| e.to_string())?;

        if app_config.system_id.is_empty() {
            return Err("Configuration must name a system_id".to_string());
        }

        Ok(app_config)
    }

    /// Local MongoDB, system "1000", no collections exposed
    pub fn default_config() -> Self {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            system_id: "1000".to_string(),
            data_source: String::new(),
            configuration: HashMap::from([
                (
                    "/system/base/mongo/common".to_string(),
                    serde_json::json!({"uri": "mongodb://localhost:27017/", "timeOut": 5000}),
                ),
                (
                    "/system/base/mongo/1000".to_string(),
                    serde_json::json!({"database": "test"}),
                ),
            ]),
            collections: HashMap::new(),
        }
    }

    /// Expand environment variables in format ${VAR_NAME} or ${VAR_NAME:-default}
    fn expand_env_vars(content: &str) -> Result<String, String> {
        let mut missing = None;
        let expanded = ENV_VAR.replace_all(content, |caps: &Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(val) => val,
                Err(_) => match caps.get(2) {
                    Some(default) => default.as_str().to_string(),
                    None => {
                        missing.get_or_insert_with(|| var_name.to_string());
                        String::new()
                    }
                },
            }
        });

        match missing {
            Some(var_name) => Err(format!(
                "Environment variable {} not found and no default provided",
                var_name
            )),
            None => Ok(expanded.into_owned()),
        }
    }

    /// Names of the collections exposed over HTTP, sorted
    pub fn collection_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.collections.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}
