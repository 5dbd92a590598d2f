//! Device command handlers.

use tabled::Tabled;

use deckhost_core::{DeviceIdentity, MetadataUpdate};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Main Folder")]
    folder: String,
}

impl From<&DeviceIdentity> for DeviceRow {
    fn from(d: &DeviceIdentity) -> Self {
        Self {
            id: d.device_id.to_string(),
            name: d.display_name.clone(),
            folder: d.main_folder.display().to_string(),
        }
    }
}

fn detail(d: &DeviceIdentity) -> String {
    [
        format!("ID:          {}", d.device_id),
        format!("Name:        {}", d.display_name),
        format!("Main Folder: {}", d.main_folder.display()),
    ]
    .join("\n")
}

fn id_of(d: &DeviceIdentity) -> String {
    d.device_id.to_string()
}

fn print_device(d: &DeviceIdentity, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, d, detail, id_of)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let host = util::open_host(global)?;
    let store = host.store();

    match args.command {
        DevicesCommand::List => {
            let devices = store.known_devices();
            let out = output::render_list(
                &global.output,
                &devices,
                |d| DeviceRow::from(d),
                id_of,
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Show { device } => {
            let id = util::parse_device_id(&device)?;
            let found = store
                .get(&id)
                .ok_or_else(|| CliError::device_not_found(&device))?;
            print_device(&found, global)
        }

        DevicesCommand::Add {
            device,
            name,
            folder,
        } => {
            let id = util::parse_device_id(&device)?;
            if store.is_persisted(&id) {
                return Err(CliError::Conflict {
                    resource_type: "device".into(),
                    identifier: device,
                    hint: "Change its metadata with: deckhost devices set <id> --name/--folder".into(),
                });
            }
            let stored = store.persist(DeviceIdentity::new(id, name, folder));
            util::save(&host)?;
            print_device(&stored, global)
        }

        DevicesCommand::Set {
            device,
            name,
            folder,
        } => {
            let id = util::parse_device_id(&device)?;
            let update = MetadataUpdate {
                display_name: name,
                main_folder: folder,
            };
            if update.is_empty() {
                return Err(CliError::Validation {
                    field: "set".into(),
                    reason: "nothing to change; pass --name and/or --folder".into(),
                });
            }
            let updated = host.update_metadata(&id, &update)?;
            util::save(&host)?;
            print_device(&updated, global)
        }

        DevicesCommand::Forget { device } => {
            let id = util::parse_device_id(&device)?;
            let found = store
                .get(&id)
                .ok_or_else(|| CliError::device_not_found(&device))?;

            let prompt = format!("Forget device '{}' ({id})?", found.display_name);
            if !util::confirm(&prompt, "devices forget", global.yes)? {
                if !global.quiet {
                    eprintln!("Aborted.");
                }
                return Ok(());
            }

            host.forget(&id);
            util::save(&host)?;
            if !global.quiet {
                eprintln!("Forgot device {id}");
            }
            Ok(())
        }

        DevicesCommand::Import { file } => {
            let added = store.merge_from(&file)?;
            util::save(&host)?;
            if !global.quiet {
                eprintln!(
                    "Imported {added} new device(s) from {}; {} known in total",
                    file.display(),
                    store.len()
                );
            }
            Ok(())
        }
    }
}
