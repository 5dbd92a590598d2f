//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use deckhost_config::ConfigError;
use deckhost_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const STORAGE: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(deckhost::not_found),
        help("Run: deckhost {list_command} to see known {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(deckhost::conflict), help("{hint}"))]
    Conflict {
        resource_type: String,
        identifier: String,
        hint: String,
    },

    // ── Durable record ───────────────────────────────────────────────
    #[error("Device record at {path} is corrupt")]
    #[diagnostic(
        code(deckhost::corrupt_record),
        help(
            "Fix the TOML by hand, or move the file aside and re-import the\n\
             devices you still need with: deckhost devices import <file>"
        )
    )]
    CorruptRecord {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Device record at {path} could not be accessed")]
    #[diagnostic(
        code(deckhost::storage),
        help("Check that the path exists and is readable and writable.")
    )]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {what}: {message}")]
    #[diagnostic(code(deckhost::serialization))]
    Serialization { what: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(deckhost::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(deckhost::config),
        help("Check the config file (deckhost config path) and DECKHOST_* variables.")
    )]
    Config(Box<figment::Error>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(deckhost::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::CorruptRecord { .. } | Self::Storage { .. } => exit_code::STORAGE,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: "device".into(),
            identifier: identifier.into(),
            list_command: "devices list".into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CorruptRecord { path, source } => CliError::CorruptRecord {
                path: path.display().to_string(),
                source,
            },

            CoreError::ReadFailed { path, source } | CoreError::WriteFailed { path, source } => {
                CliError::Storage {
                    path: path.display().to_string(),
                    source,
                }
            }

            CoreError::Serialization(e) => CliError::Serialization {
                what: "device record".into(),
                message: e.to_string(),
            },

            CoreError::DeviceNotFound { device_id } => CliError::device_not_found(device_id.to_string()),

            CoreError::InvalidDeviceId { value, reason } => CliError::Validation {
                field: "device id".into(),
                reason: format!("'{value}' is not a UUID ({reason})"),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Serialization(e) => CliError::Serialization {
                what: "config".into(),
                message: e.to_string(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
        }
    }
}
