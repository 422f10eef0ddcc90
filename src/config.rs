use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct NexusConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub enhance: EnhanceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub error_status: ErrorStatusMode,
    /// Largest request body accepted; larger bodies get a JSON 400.
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Base URL of the PostgREST / Supabase project.
    pub url: String,
    /// Service-role key, sent as `apikey` and bearer token.
    pub service_key: String,
    pub table: String,
    pub timeout_secs: u64,
    /// SQLite file used by the `sqlite` backend.
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EnhanceConfig {
    pub on_capture_error: CapturePolicy,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Postgrest,
    Sqlite,
}

/// How handler errors are turned into HTTP status codes.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatusMode {
    /// 400 for bad input, 502 for store failures, 500 otherwise.
    #[default]
    Typed,
    /// Every error is a 500.
    Legacy,
}

/// What the enhance endpoint does when recording the prompt fails.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapturePolicy {
    /// Log the failure and still answer with the enhanced prompt.
    #[default]
    Continue,
    /// Fail the request with the store error.
    Abort,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8787,
            log_level: "info".into(),
            error_status: ErrorStatusMode::default(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let db_path = default_nexus_dir()
            .join("items.db")
            .to_string_lossy()
            .into_owned();
        Self {
            backend: StoreBackend::default(),
            url: String::new(),
            service_key: String::new(),
            table: "items".into(),
            timeout_secs: 30,
            db_path,
        }
    }
}

impl StoreConfig {
    /// Resolve the SQLite path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.db_path)
    }
}

/// Returns `~/.nexus/`, or `./.nexus/` when there is no home directory.
pub fn default_nexus_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nexus")
}

/// Returns the default config file path: `~/.nexus/config.toml`
pub fn default_config_path() -> PathBuf {
    default_nexus_dir().join("config.toml")
}

impl NexusConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            NexusConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides. The Supabase variables keep their
    /// platform names so a function environment can be reused as-is.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SUPABASE_URL") {
            self.store.url = val;
        }
        if let Ok(val) = std::env::var("SUPABASE_SERVICE_ROLE_KEY") {
            self.store.service_key = val;
        }
        if let Ok(val) = std::env::var("NEXUS_BACKEND") {
            match val.as_str() {
                "postgrest" => self.store.backend = StoreBackend::Postgrest,
                "sqlite" => self.store.backend = StoreBackend::Sqlite,
                other => warn!(value = %other, "ignoring unknown NEXUS_BACKEND"),
            }
        }
        if let Ok(val) = std::env::var("NEXUS_DB") {
            self.store.db_path = val;
        }
        if let Ok(val) = std::env::var("NEXUS_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("NEXUS_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %val, "ignoring invalid NEXUS_PORT"),
            }
        }
        if let Ok(val) = std::env::var("NEXUS_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = NexusConfig::default();
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.server.error_status, ErrorStatusMode::Typed);
        assert_eq!(config.server.max_body_bytes, 2 * 1024 * 1024);
        assert_eq!(config.store.backend, StoreBackend::Postgrest);
        assert_eq!(config.store.table, "items");
        assert!(config.store.url.is_empty());
        assert!(config.store.service_key.is_empty());
        assert_eq!(config.enhance.on_capture_error, CapturePolicy::Continue);
        assert!(config.store.db_path.ends_with("items.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
port = 9000
error_status = "legacy"

[store]
backend = "sqlite"
db_path = "/tmp/items.db"

[enhance]
on_capture_error = "abort"
"#;
        let config: NexusConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.error_status, ErrorStatusMode::Legacy);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.db_path, "/tmp/items.db");
        assert_eq!(config.enhance.on_capture_error, CapturePolicy::Abort);
        // defaults still apply for unset fields
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.store.timeout_secs, 30);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = NexusConfig::default();
        std::env::set_var("SUPABASE_URL", "https://example.supabase.co");
        std::env::set_var("SUPABASE_SERVICE_ROLE_KEY", "service-key");
        std::env::set_var("NEXUS_BACKEND", "sqlite");
        std::env::set_var("NEXUS_PORT", "not-a-port");

        config.apply_env_overrides();

        assert_eq!(config.store.url, "https://example.supabase.co");
        assert_eq!(config.store.service_key, "service-key");
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.server.port, 8787);

        // Clean up
        std::env::remove_var("SUPABASE_URL");
        std::env::remove_var("SUPABASE_SERVICE_ROLE_KEY");
        std::env::remove_var("NEXUS_BACKEND");
        std::env::remove_var("NEXUS_PORT");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = NexusConfig::load_from("/nonexistent/nexus/config.toml").unwrap();
        assert_eq!(config.store.table, "items");
    }
}
