// ── Durable device record ──
//
// TOML file holding an array of `[[device]]` tables. Reads parse the whole
// file before anything is returned; writes go through a sibling temp file
// and an atomic rename, so readers never observe a half-written record.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::DeviceIdentity;

#[derive(Debug, Default, Deserialize)]
struct DeviceFile {
    #[serde(default, rename = "device")]
    devices: Vec<DeviceIdentity>,
}

#[derive(Serialize)]
struct DeviceFileRef<'a> {
    #[serde(rename = "device")]
    devices: Vec<&'a DeviceIdentity>,
}

/// Read and parse the record at `path`.
///
/// Returns `Ok(None)` when the file does not exist.
pub(crate) fn read(path: &Path) -> Result<Option<Vec<DeviceIdentity>>, CoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CoreError::ReadFailed {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let file: DeviceFile = toml::from_str(&content).map_err(|e| CoreError::CorruptRecord {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;
    Ok(Some(file.devices))
}

/// Serialize `devices` and atomically replace the record at `path`.
pub(crate) fn write<'a>(
    path: &Path,
    devices: impl IntoIterator<Item = &'a DeviceIdentity>,
) -> Result<(), CoreError> {
    let body = toml::to_string_pretty(&DeviceFileRef {
        devices: devices.into_iter().collect(),
    })?;

    let write_failed = |source| CoreError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }

    let tmp_path = temp_path(path);
    let result = (|| {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(body.as_bytes())?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, path)
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_failed(source));
    }
    Ok(())
}

/// Delete the record at `path`. Returns whether a file was there.
pub(crate) fn remove(path: &Path) -> Result<bool, CoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(CoreError::WriteFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
