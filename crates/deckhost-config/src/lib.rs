//! Shared configuration for the ButtonDeck host.
//!
//! TOML file + `DECKHOST_*` environment layering, platform path
//! resolution, and translation to `deckhost_core::HostConfig`. The CLI adds
//! flag-aware overrides on top.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use deckhost_core::{
    DEVICES_FILE_NAME, DuplicateSessionPolicy, HostConfig, MetadataPolicy, UninitializedSavePolicy,
};

/// Environment prefix; nested keys use `__`, e.g. `DECKHOST_STORE__DEVICES_FILE`.
pub const ENV_PREFIX: &str = "DECKHOST_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Durable device record settings.
    #[serde(default)]
    pub store: StoreSection,

    /// Session binding settings.
    #[serde(default)]
    pub sessions: SessionSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreSection {
    /// Device record location. Relative paths resolve against the data dir;
    /// unset means `<data dir>/devices.toml`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices_file: Option<PathBuf>,

    #[serde(default)]
    pub metadata_policy: MetadataPolicy,

    #[serde(default)]
    pub uninitialized_save: UninitializedSavePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSection {
    #[serde(default)]
    pub duplicate_sessions: DuplicateSessionPolicy,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "buttondeck", "deckhost")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory holding the durable device record by default.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

pub fn default_devices_path() -> PathBuf {
    data_dir().join(DEVICES_FILE_NAME)
}

fn dirs_fallback(base: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(base);
    p.push("deckhost");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from an explicit file + environment. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML at `path`, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Resolve the devices file for `cfg`, anchoring relative paths at `data_dir()`.
pub fn devices_path(cfg: &Config) -> Result<PathBuf, ConfigError> {
    match cfg.store.devices_file.as_deref() {
        None => Ok(default_devices_path()),
        Some(path) if path.as_os_str().is_empty() => Err(ConfigError::Validation {
            field: "store.devices_file".into(),
            reason: "path must not be empty".into(),
        }),
        Some(path) if path.is_relative() => Ok(data_dir().join(path)),
        Some(path) => Ok(path.to_path_buf()),
    }
}

/// Build a `HostConfig` from file/env config, no CLI overrides.
pub fn to_host_config(cfg: &Config) -> Result<HostConfig, ConfigError> {
    Ok(HostConfig {
        devices_path: devices_path(cfg)?,
        metadata_policy: cfg.store.metadata_policy,
        uninitialized_save: cfg.store.uninitialized_save,
        duplicate_sessions: cfg.sessions.duplicate_sessions,
    })
}
