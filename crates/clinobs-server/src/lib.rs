pub mod config;
pub mod fixtures;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod service;

pub use config::{AppConfig, ConfigError, LoggingConfig, ServerConfig, StorageConfig};
pub use fixtures::{ObservationFactory, make_observations};
pub use observability::init_tracing;
pub use server::{AppState, ClinobsServer, ServerBuilder, build_app};
pub use service::ObservationService;
