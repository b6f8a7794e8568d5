mod app_config;

pub use app_config::{ApiKeySettings, AppConfig, LogFormat, LoggingConfig};
