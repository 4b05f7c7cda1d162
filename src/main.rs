use clap::Parser;
use mongo_datasource::config::AppConfig;
use mongo_datasource::configuration::MemoryConfiguration;
use mongo_datasource::engine::MongoEngine;
use mongo_datasource::logging;
use mongo_datasource::server::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "mongo-datasource")]
#[command(about = "Configuration-driven MongoDB data source with a generic query API")]
struct Args {
    /// Configuration file path (default: config.yaml)
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides config file)
    #[arg(long)]
    host: Option<String>,

    /// Data source to serve (overrides config file)
    #[arg(short, long)]
    data_source: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    logging::init_tracing();

    let mut app_config =
        if args.config == "config.yaml" && !std::path::Path::new("config.yaml").exists() {
            warn!("No config.yaml found, using default configuration (local MongoDB, system 1000)");
            AppConfig::default_config()
        } else {
            AppConfig::load_from_file(&args.config)
                .map_err(|e| format!("Failed to load configuration: {}", e))?
        };

    if let Some(port) = args.port {
        app_config.server.port = port;
    }
    if let Some(host) = args.host {
        app_config.server.host = host;
    }
    if let Some(data_source) = args.data_source {
        app_config.data_source = data_source;
    }

    let store = Arc::new(MemoryConfiguration::from_values(&app_config.configuration));
    let engine = MongoEngine::new(store, app_config.system_id.clone()).await?;
    let database = engine.connection(&app_config.data_source).await?;

    for name in app_config.collection_names() {
        info!(
            "Serving collection [{}] with {} mapped filter key(s)",
            name,
            app_config.collections[name].len()
        );
    }

    let state = Arc::new(AppState::new(database, &app_config.collections));
    let app = server::router(state);

    let host: std::net::IpAddr = app_config.server.host.parse().unwrap_or_else(|_| {
        warn!(
            "Invalid host address: {}, using 127.0.0.1",
            app_config.server.host
        );
        [127, 0, 0, 1].into()
    });
    let addr = SocketAddr::from((host, app_config.server.port));
    info!(
        "mongo-datasource for system [{}] listening on {}",
        engine.system_id(),
        addr
    );

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
