use std::collections::HashSet;

use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api_keys: ApiKeySettings,
    pub logging: LoggingConfig,
}

/// Settings for API key issuance and validation
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySettings {
    /// Prefix prepended to every issued credential
    pub prefix: String,
    /// Random bytes of entropy per secret
    pub secret_bytes: usize,
    /// Requests per hour granted when no limit is specified
    pub default_rate_limit: u32,
    /// Days until expiry when no expiry is specified
    pub default_expiry_days: u32,
    /// Permissions granted when none are specified
    pub default_permissions: HashSet<String>,
    /// Upper bound on a single validation, including the hash scan
    pub validation_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_keys: ApiKeySettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ApiKeySettings {
    fn default() -> Self {
        Self {
            prefix: "sk-".to_string(),
            secret_bytes: 32,
            default_rate_limit: 1000,
            default_expiry_days: 365,
            default_permissions: HashSet::from(["read".to_string()]),
            validation_timeout_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("KEYGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
