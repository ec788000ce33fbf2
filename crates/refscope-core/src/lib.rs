pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use config::{DatabaseConfig, ReconcileConfig, RefscopeConfig, RegistryConfig};
pub use error::{CoreError, Result};
pub use models::*;

pub use storage::backup::backup;
pub use storage::database::MendeleyDatabase;
pub use storage::location::locate_database;
pub use storage::{Annotation, DocumentStore};
