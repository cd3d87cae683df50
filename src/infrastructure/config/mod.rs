mod settings;

pub use settings::{DatabaseConfig, OtelConfig, ServerConfig, Settings, StorageConfig};
