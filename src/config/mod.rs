// Configuration module
pub mod settings;

pub use settings::{
    AuthConfig, Config, DisplayConfig, NotificationConfig, StorageConfig, process_env,
};
