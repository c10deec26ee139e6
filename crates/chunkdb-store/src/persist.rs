//! On-disk envelope shared by every index file.
//!
//! A file is a JSON object `{"kind": "...", "entries": ...}`. Writes go to a
//! sibling `.tmp` file which is fsynced and renamed over the target, so a
//! reader sees either the old or the new file, never a torn one.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use chunkdb_core::{Error, IndexKind, Result};

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    kind: IndexKind,
    entries: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    kind: IndexKind,
    entries: T,
}

#[derive(Deserialize)]
struct Header {
    kind: IndexKind,
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

pub fn write_atomic<T: Serialize>(path: &Path, kind: IndexKind, entries: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let tmp = tmp_path(path);
    let file = File::create(&tmp).map_err(|e| Error::io(&tmp, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &EnvelopeRef { kind, entries })?;
    writer.flush().map_err(|e| Error::io(&tmp, e))?;
    let file = writer.into_inner().map_err(|e| Error::io(&tmp, e.into_error()))?;
    file.sync_all().map_err(|e| Error::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Read the entries of an index file, `None` if it does not exist yet.
pub fn read<T: DeserializeOwned>(path: &Path, expected: IndexKind) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let envelope: Envelope<T> = serde_json::from_reader(BufReader::new(file))?;
    if envelope.kind != expected {
        return Err(Error::storage(format!(
            "{} holds a {} index, expected {}",
            path.display(),
            envelope.kind,
            expected
        )));
    }
    Ok(Some(envelope.entries))
}

/// Peek at the kind tag of an existing index file.
pub fn read_kind(path: &Path) -> Result<IndexKind> {
    if !path.exists() {
        return Err(Error::not_found(path.display().to_string()));
    }
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let header: Header = serde_json::from_reader(BufReader::new(file))?;
    Ok(header.kind)
}
