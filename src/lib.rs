pub mod config;
pub mod configuration;
pub mod engine;
pub mod error;
pub mod logging;
pub mod repository;
pub mod search;
pub mod server;

// Re-export commonly used types for easier access
pub use engine::{MongoConfig, MongoEngine};
pub use error::{AppError, AppResult};
pub use repository::BaseRepository;
pub use search::{FieldMapping, Operator, Pagination, Query};
