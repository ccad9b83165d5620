use std::{
    ffi::{OsStr, OsString},
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::{InventoryError, Result};

/// Replaces the file at `path` with `contents`.
///
/// The contents are written to a sibling temp file, synced, and renamed over `path`, so readers
/// see either the old file or the complete new one. The parent directory must exist.
pub fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let temp_path = temp_path(path);

    write_and_rename(&temp_path, path, contents).map_err(|source| {
        // Best effort, the write error is what gets reported.
        let _ = fs::remove_file(&temp_path);
        InventoryError::OutputWrite {
            path: path.to_owned(),
            source,
        }
    })?;

    debug!(?path, bytes = contents.len(), "Wrote inventory");
    Ok(())
}

fn write_and_rename(temp_path: &Path, path: &Path, contents: &str) -> io::Result<()> {
    let mut file = File::create(temp_path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(temp_path, path)
}

/// `inventory.ini` -> `.inventory.ini.tmp`, in the same directory so the rename stays on one
/// filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or(OsStr::new("inventory")));
    name.push(".tmp");
    path.with_file_name(name)
}
