//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Resolved config as TOML, plus the effective devices file as a comment.
fn format_config(cfg: &Config) -> String {
    let devices = config::to_host_config(cfg).map_or_else(
        |e| format!("# devices file: unresolved ({e})"),
        |host| format!("# devices file: {}", host.devices_path.display()),
    );
    let body = toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# unrenderable: {e}\n"));
    format!("{devices}\n\n{body}")
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = config::active_config_path(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                "config".into()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config::active_config_path(global);
            if path.exists() && !force {
                return Err(CliError::Conflict {
                    resource_type: "config file".into(),
                    identifier: path.display().to_string(),
                    hint: "Pass --force to overwrite it.".into(),
                });
            }

            config::save_config_to(&Config::default(), &path)?;
            if !global.quiet {
                eprintln!("Configuration written to {}", path.display());
            }
            Ok(())
        }
    }
}
