//! CLI-side configuration: applies `GlobalOpts` overrides on top of the
//! shared `deckhost-config` crate.
//!
//! Core never sees these types -- it receives a pre-built `HostConfig`.

use std::path::PathBuf;

pub use deckhost_config::{Config, config_path, load_config_from, save_config_to, to_host_config};

use deckhost_core::HostConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file selected by `--config`, or the platform default.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the config file (if any) plus environment overrides.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(load_config_from(&active_config_path(global))?)
}

/// Build the `HostConfig`: file + env, then `--devices-file`.
pub fn resolve_host_config(global: &GlobalOpts) -> Result<HostConfig, CliError> {
    let cfg = load(global)?;
    let mut host = to_host_config(&cfg)?;

    if let Some(ref path) = global.devices_file {
        if path.as_os_str().is_empty() {
            return Err(CliError::Validation {
                field: "devices-file".into(),
                reason: "path must not be empty".into(),
            });
        }
        host.devices_path.clone_from(path);
    }

    tracing::debug!(
        devices_path = %host.devices_path.display(),
        metadata_policy = %host.metadata_policy,
        "resolved host config"
    );
    Ok(host)
}
