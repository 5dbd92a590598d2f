//! Shared helpers for command handlers.

use std::io::IsTerminal;

use deckhost_core::{DeckHost, DeviceId, SaveOutcome};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;

/// Parse a device identifier given on the command line.
pub fn parse_device_id(identifier: &str) -> Result<DeviceId, CliError> {
    Ok(identifier.parse::<DeviceId>()?)
}

/// Open the host for the configured device record, loading it.
pub fn open_host(global: &GlobalOpts) -> Result<DeckHost, CliError> {
    let host_config = config::resolve_host_config(global)?;
    Ok(DeckHost::init(host_config)?)
}

/// Flush the known set and log where it went.
pub fn save(host: &DeckHost) -> Result<(), CliError> {
    match host.save()? {
        SaveOutcome::Written { devices } => {
            tracing::info!(
                path = %host.store().path().display(),
                devices,
                "device record written"
            );
        }
        outcome => tracing::warn!(?outcome, "device record not written"),
    }
    Ok(())
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}
