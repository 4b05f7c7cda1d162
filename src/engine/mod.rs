//! MongoDB connection factory
//!
//! [`MongoEngine`] turns a data-source id into a live database handle:
//!
//! ```text
//! data source id
//!     ↓  privilege check (PrivilegeTable, pushed by the configuration service)
//!     ↓  /system/base/mongo/common  +  /system/base/mongo/<id>  → MongoConfig
//!     ↓  pool options, connect, ping primary under the configured timeout
//! mongodb::Database
//! ```
//!
//! Nothing is cached: every call reads the configuration again.

use crate::configuration::{clazz, ConfigPath, Configuration};
use crate::error::{AppError, AppResult};
use mongodb::bson::doc;
use mongodb::options::{ReadPreference, SelectionCriteria};
use mongodb::{Client, Database};
use std::sync::Arc;
use tracing::{error, info};

pub mod config;
pub mod privilege;

pub use config::MongoConfig;
pub use privilege::PrivilegeTable;

pub const NAMESPACE: &str = "base";
pub const TOPIC: &str = "mongo";
pub const COMMON_KEY: &str = "common";
pub const PRIVILEGES_KEY: &str = "privileges";

pub struct MongoEngine {
    system_id: String,
    cfg: Arc<dyn Configuration>,
    privileges: Arc<PrivilegeTable>,
}

impl MongoEngine {
    /// Create the engine for `system_id` and subscribe to privilege updates
    pub async fn new(cfg: Arc<dyn Configuration>, system_id: impl Into<String>) -> AppResult<Self> {
        let system_id = system_id.into();
        info!("Loading Mongo engine for system [{}]", system_id);

        let privileges = Arc::new(PrivilegeTable::new());
        cfg.watch(&[Self::path(PRIVILEGES_KEY)], privileges.clone())
            .await?;

        Ok(Self {
            system_id,
            cfg,
            privileges,
        })
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    fn path(key: &str) -> ConfigPath {
        ConfigPath::new(NAMESPACE, TOPIC, "", key)
    }

    /// Map a requested data-source id to the one to load.
    ///
    /// Empty or own id selects the system's default data source; any other id
    /// must be granted to this system.
    pub fn resolve_data_source<'a>(&'a self, ds_id: &'a str) -> AppResult<&'a str> {
        if ds_id.is_empty() || ds_id == self.system_id {
            return Ok(&self.system_id);
        }

        info!(
            "Data source privileges of system [{}]: {}",
            self.system_id,
            self.privileges.privileges(&self.system_id).join(",")
        );
        if !self.privileges.permits(&self.system_id, ds_id) {
            return Err(AppError::Unauthorized {
                system_id: self.system_id.clone(),
                data_source: ds_id.to_string(),
            });
        }
        Ok(ds_id)
    }

    /// Resolve the connection parameters of `ds_id`
    pub async fn config(&self, ds_id: &str) -> AppResult<MongoConfig> {
        let ds_id = self.resolve_data_source(ds_id)?;

        let config = self.read_from_configuration(ds_id).await.map_err(|e| {
            AppError::Configuration(format!(
                "Data source [{}] is not configured or could not be read: {}",
                ds_id, e
            ))
        })?;

        if config.uri.is_empty() {
            return Err(AppError::Configuration(format!(
                "Data source [{}] has no connection URI",
                ds_id
            )));
        }
        Ok(config)
    }

    /// Open a pooled connection to `ds_id` and check the primary is reachable
    pub async fn connection(&self, ds_id: &str) -> AppResult<Database> {
        let config = self.config(ds_id).await?;
        config.validate().map_err(AppError::Configuration)?;

        let options = config.client_options().await?;
        let database_name = if config.database.is_empty() {
            options.default_database.clone().unwrap_or_default()
        } else {
            config.database.clone()
        };
        if database_name.is_empty() {
            return Err(AppError::Configuration(format!(
                "No database configured for {}",
                config.redacted_uri()
            )));
        }

        let client = Client::with_options(options)?;
        let database = client.database(&database_name);

        let timeout = config.timeout();
        match tokio::time::timeout(timeout, async { Self::ping(&database).await }).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(AppError::Timeout(format!(
                    "Ping of {} did not complete within {:?}",
                    config.redacted_uri(),
                    timeout
                )))
            }
        }

        info!(
            "Connected to database [{}] at {}",
            database_name,
            config.redacted_uri()
        );
        Ok(database)
    }

    /// Check the primary of `database`'s deployment answers
    pub async fn ping(database: &Database) -> AppResult<()> {
        database
            .run_command(doc! { "ping": 1 })
            .selection_criteria(SelectionCriteria::ReadPreference(ReadPreference::Primary))
            .await?;
        Ok(())
    }

    async fn read_from_configuration(&self, ds_id: &str) -> AppResult<MongoConfig> {
        let mut merged = self.read_common_properties().await?;

        let path = Self::path(ds_id);
        info!("Reading data source config from {}", path);
        let overrides: Properties = clazz(self.cfg.as_ref(), &path).await.map_err(|e| {
            error!("Failed to read config of data source [{}]: {}", ds_id, e);
            e
        })?;

        merge(&mut merged, overrides);
        Ok(serde_json::from_value(serde_json::Value::Object(merged))?)
    }

    async fn read_common_properties(&self) -> AppResult<Properties> {
        let path = Self::path(COMMON_KEY);
        info!("Reading common data source config from {}", path);
        clazz(self.cfg.as_ref(), &path).await.map_err(|e| {
            error!("Failed to read common data source config: {}", e);
            e
        })
    }
}

/// Raw connection properties, a JSON object
type Properties = serde_json::Map<String, serde_json::Value>;

/// Copy every top-level key of `overrides` onto `base`
fn merge(base: &mut Properties, overrides: Properties) {
    for (key, value) in overrides {
        base.insert(key, value);
    }
}
