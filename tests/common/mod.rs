use mongo_datasource::configuration::MemoryConfiguration;
use mongo_datasource::engine::MongoEngine;
use mongodb::Database;
use std::sync::Arc;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mongo::Mongo;

pub const SYSTEM_ID: &str = "1000";

pub struct TestMongo {
    pub uri: String,
    // Dropping the handle stops the container
    _container: ContainerAsync<Mongo>,
}

/// Start a throwaway MongoDB in Docker
pub async fn start_mongo() -> TestMongo {
    let container = Mongo::default()
        .start()
        .await
        .expect("MongoDB container should start");
    let host = container.get_host().await.expect("container host");
    let port = container
        .get_host_port_ipv4(27017)
        .await
        .expect("mapped MongoDB port");

    TestMongo {
        uri: format!("mongodb://{}:{}/", host, port),
        _container: container,
    }
}

/// Configuration store with the default data source of [`SYSTEM_ID`] on `uri`
pub fn store_for(uri: &str, database: &str) -> Arc<MemoryConfiguration> {
    Arc::new(MemoryConfiguration::from_entries([
        (
            "/system/base/mongo/common".to_string(),
            format!(
                r#"{{"uri":"{}","maxPoolSize":10,"minPoolSize":1,"maxConnecting":2,"maxConnIdleTime":60000,"timeOut":10000}}"#,
                uri
            ),
        ),
        (
            format!("/system/base/mongo/{}", SYSTEM_ID),
            format!(r#"{{"database":"{}"}}"#, database),
        ),
        (
            "/system/base/mongo/privileges".to_string(),
            r#"{"1000":["2000"]}"#.to_string(),
        ),
    ]))
}

/// Live handle to `database` through the engine, as an application would get it
pub async fn connect(mongo: &TestMongo, database: &str) -> Database {
    let engine = MongoEngine::new(store_for(&mongo.uri, database), SYSTEM_ID)
        .await
        .expect("engine should load");
    engine
        .connection("")
        .await
        .expect("connection to the test container")
}
