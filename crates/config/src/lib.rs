use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "murmur.toml",
    "config/murmur.toml",
    "crates/config/murmur.toml",
    "../murmur.toml",
    "../config/murmur.toml",
    "../crates/config/murmur.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub chat: ChatConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            database: DatabaseConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://murmur.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Tunables for the chat core.
///
/// ```
/// use murmur_config::ChatConfig;
///
/// let chat = ChatConfig::default();
/// assert_eq!(chat.max_message_length, 500);
/// assert_eq!(chat.storage_timeout_ms, 5_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "ChatConfig::default_max_message_length")]
    pub max_message_length: usize,
    #[serde(default = "ChatConfig::default_history_page_size")]
    pub history_page_size: i64,
    #[serde(default = "ChatConfig::default_max_history_page_size")]
    pub max_history_page_size: i64,
    #[serde(default = "ChatConfig::default_fanout_buffer")]
    pub fanout_buffer: usize,
    #[serde(default = "ChatConfig::default_storage_timeout")]
    pub storage_timeout_ms: u64,
    #[serde(default = "ChatConfig::default_history_retries")]
    pub history_retry_attempts: u32,
}

impl ChatConfig {
    const fn default_max_message_length() -> usize {
        500
    }

    const fn default_history_page_size() -> i64 {
        50
    }

    const fn default_max_history_page_size() -> i64 {
        100
    }

    const fn default_fanout_buffer() -> usize {
        64
    }

    const fn default_storage_timeout() -> u64 {
        5_000
    }

    const fn default_history_retries() -> u32 {
        2
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: Self::default_max_message_length(),
            history_page_size: Self::default_history_page_size(),
            max_history_page_size: Self::default_max_history_page_size(),
            fanout_buffer: Self::default_fanout_buffer(),
            storage_timeout_ms: Self::default_storage_timeout(),
            history_retry_attempts: Self::default_history_retries(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use murmur_config::load;
///
/// std::env::remove_var("MURMUR_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("http.address", defaults.http.address.clone())
        .unwrap()
        .set_default("http.port", i64::from(defaults.http.port))
        .unwrap()
        .set_default("database.url", defaults.database.url.clone())
        .unwrap()
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )
        .unwrap()
        .set_default(
            "chat.max_message_length",
            defaults.chat.max_message_length as i64,
        )
        .unwrap()
        .set_default("chat.history_page_size", defaults.chat.history_page_size)
        .unwrap()
        .set_default(
            "chat.max_history_page_size",
            defaults.chat.max_history_page_size,
        )
        .unwrap()
        .set_default("chat.fanout_buffer", defaults.chat.fanout_buffer as i64)
        .unwrap()
        .set_default(
            "chat.storage_timeout_ms",
            i64::try_from(defaults.chat.storage_timeout_ms).unwrap_or(i64::MAX),
        )
        .unwrap()
        .set_default(
            "chat.history_retry_attempts",
            i64::from(defaults.chat.history_retry_attempts),
        )
        .unwrap();

    let environment_overrides = config::Environment::with_prefix("MURMUR").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("MURMUR_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via MURMUR_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
