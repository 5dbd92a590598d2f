//! Clap derive structures for the `deckhost` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// deckhost -- inspect and edit the devices a ButtonDeck host remembers
#[derive(Debug, Parser)]
#[command(
    name = "deckhost",
    version,
    about = "Manage remembered ButtonDeck devices from the command line",
    long_about = "Inspect and edit the durable device record that the ButtonDeck host\n\
        loads at startup: device ids, display names and main folders.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to read instead of the platform default
    #[arg(long, env = "DECKHOST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Device record to operate on (overrides config)
    #[arg(long, short = 'f', env = "DECKHOST_DEVICES_FILE", global = true)]
    pub devices_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DECKHOST_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage remembered devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List remembered devices
    #[command(alias = "ls")]
    List,

    /// Show one device
    Show {
        /// Device id (UUID)
        device: String,
    },

    /// Remember a new device
    Add {
        /// Device id (UUID)
        device: String,

        /// Display name
        #[arg(long, short = 'n')]
        name: String,

        /// Root folder of the device's button layout
        #[arg(long)]
        folder: PathBuf,
    },

    /// Rename a device or move its main folder
    Set {
        /// Device id (UUID)
        device: String,

        /// New display name
        #[arg(long, short = 'n')]
        name: Option<String>,

        /// New main folder
        #[arg(long)]
        folder: Option<PathBuf>,
    },

    /// Forget a device permanently
    #[command(alias = "rm")]
    Forget {
        /// Device id (UUID)
        device: String,
    },

    /// Merge devices from another record; existing devices are kept as-is
    Import {
        /// Path to a devices.toml file
        file: PathBuf,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Display current resolved configuration
    Show,

    /// Write a config file with default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
