//! Locked, atomic JSON file persistence shared by the on-disk adapters
//!
//! Each data file has a sidecar `<file>.lock` held with an fs2 advisory
//! lock (shared for reads, exclusive for writes), so a CLI run and a
//! desktop app touching the same directory never see a torn file. Writes
//! go to a temp file in the same directory and are renamed into place.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::domain::result::Result;

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

fn open_lock(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path(path))?;
    Ok(file)
}

/// Read and parse a JSON file, `None` if it does not exist
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    read_string(path)?
        .map(|raw| serde_json::from_str(&raw).map_err(Into::into))
        .transpose()
}

/// Read a file's raw contents, `None` if it does not exist
pub fn read_string(path: &Path) -> Result<Option<String>> {
    let lock = open_lock(path)?;
    lock.lock_shared()?;
    let result = match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    };
    lock.unlock()?;
    result
}

/// Serialize to pretty JSON and atomically replace the file
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    write_string(path, &raw)
}

/// Atomically replace a file's contents
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    let lock = open_lock(path)?;
    lock.lock_exclusive()?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let result = (|| -> Result<()> {
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    })();

    lock.unlock()?;
    result
}

/// Delete a file; a missing file is not an error
pub fn remove(path: &Path) -> Result<()> {
    let lock = open_lock(path)?;
    lock.lock_exclusive()?;
    let result = match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    };
    lock.unlock()?;
    result
}
