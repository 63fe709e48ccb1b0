mod settings;

pub use settings::{
    NotificationConfig, OtelConfig, RedisConfig, ServerConfig, Settings, StorageConfig,
};
