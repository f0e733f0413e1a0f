//! Configuration resolution for Clobberer.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/clobberer/settings.json)
//! 3. Explicit config file (--config)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::PoolSettings;
use crate::error::{Error, Result};

/// Complete Clobberer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub database_path: Option<PathBuf>,
    /// Path prefix the API is mounted under.
    pub mount_prefix: String,
    /// Trusted header carrying the authenticated requester, set by the
    /// fronting proxy.
    pub identity_header: String,
    pub log_level: String,
    pub log_json: bool,
    pub db_max_connections: u32,
    pub db_busy_timeout_ms: u64,
}

impl ServerConfig {
    pub const fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.db_max_connections,
            busy_timeout: Duration::from_millis(self.db_busy_timeout_ms),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8010)),
            database_path: None,
            mount_prefix: "/clobberer".to_string(),
            identity_header: "x-authenticated-email".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            db_max_connections: 5,
            db_busy_timeout_ms: 5000,
        }
    }
}

/// A settings file as written on disk. Every field is optional so that a
/// file only overrides the keys it names.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerOverlay,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerOverlay {
    listen_addr: Option<SocketAddr>,
    database_path: Option<PathBuf>,
    mount_prefix: Option<String>,
    identity_header: Option<String>,
    log_level: Option<String>,
    log_json: Option<bool>,
    db_max_connections: Option<u32>,
    db_busy_timeout_ms: Option<u64>,
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    load_layers(
        global_config_path().as_deref(),
        explicit,
        |key| std::env::var(key).ok(),
    )
}

fn load_layers(
    global: Option<&Path>,
    explicit: Option<&Path>,
    var: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global
        && global_path.exists()
    {
        let file = load_config_file(global_path)?;
        merge_config(&mut config, file);
    }

    if let Some(path) = explicit {
        // An explicitly named file must exist.
        let file = load_config_file(path)?;
        merge_config(&mut config, file);
    }

    apply_env_overrides(&mut config, var)?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Get the default database path.
pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("clobberer.db"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".clobberer"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/clobberer"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("clobberer"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: ConfigFile) {
    let server = &mut base.server;
    let overlay = overlay.server;
    if let Some(addr) = overlay.listen_addr {
        server.listen_addr = addr;
    }
    if overlay.database_path.is_some() {
        server.database_path = overlay.database_path;
    }
    if let Some(prefix) = overlay.mount_prefix {
        server.mount_prefix = prefix;
    }
    if let Some(header) = overlay.identity_header {
        server.identity_header = header;
    }
    if let Some(level) = overlay.log_level {
        server.log_level = level;
    }
    if let Some(json) = overlay.log_json {
        server.log_json = json;
    }
    if let Some(max) = overlay.db_max_connections {
        server.db_max_connections = max;
    }
    if let Some(ms) = overlay.db_busy_timeout_ms {
        server.db_busy_timeout_ms = ms;
    }
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(val) = var("CLOBBERER_LISTEN_ADDR") {
        config.server.listen_addr = val
            .parse()
            .map_err(|e| Error::Config(format!("CLOBBERER_LISTEN_ADDR={val}: {e}")))?;
    }
    if let Some(val) = var("CLOBBERER_DB_PATH") {
        config.server.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = var("CLOBBERER_MOUNT_PREFIX") {
        config.server.mount_prefix = val;
    }
    if let Some(val) = var("CLOBBERER_IDENTITY_HEADER") {
        config.server.identity_header = val;
    }
    if let Some(val) = var("CLOBBERER_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Some(val) = var("CLOBBERER_DB_MAX_CONNECTIONS") {
        config.server.db_max_connections = val
            .parse()
            .map_err(|e| Error::Config(format!("CLOBBERER_DB_MAX_CONNECTIONS={val}: {e}")))?;
    }
    if let Some(val) = var("CLOBBERER_DB_BUSY_TIMEOUT_MS") {
        config.server.db_busy_timeout_ms = val
            .parse()
            .map_err(|e| Error::Config(format!("CLOBBERER_DB_BUSY_TIMEOUT_MS={val}: {e}")))?;
    }
    Ok(())
}
