//! On-disk format for the resolution cache.
//!
//! A snapshot is the 4-byte magic `HRC1` followed by a JSON document:
//!
//! ```text
//! HRC1{"entries":{"a.example":{"address":"10.0.0.1"},"b.example":{"failed":"no such host"}}}
//! ```
//!
//! Entries are a tagged union, so a cached failure can never be mistaken for
//! an address. Keys are written in sorted order.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cache::ResolutionEntry;
use super::error::SnapshotError;

const MAGIC: &[u8; 4] = b"HRC1";

#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotFile {
    entries: BTreeMap<String, ResolutionEntry>,
}

/// Reads a snapshot file.
///
/// Returns `Ok(None)` when the file does not exist.
pub(crate) fn read_snapshot(
    path: &Path,
) -> Result<Option<BTreeMap<String, ResolutionEntry>>, SnapshotError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no snapshot file, starting empty");
            return Ok(None);
        }
        Err(e) => return Err(SnapshotError::io(path, e)),
    };

    decode(path, &bytes).map(Some)
}

/// Writes a snapshot file via a sibling temp file and a rename.
pub(crate) fn write_snapshot(
    path: &Path,
    entries: BTreeMap<String, ResolutionEntry>,
) -> Result<(), SnapshotError> {
    let payload = encode(path, SnapshotFile { entries })?;
    let tmp_path = temp_path_for(path);

    let write_result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(&payload)?;
        file.sync_all()
    })();
    if let Err(e) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(SnapshotError::io(&tmp_path, e));
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        SnapshotError::io(path, e)
    })
}

fn encode(path: &Path, snapshot: SnapshotFile) -> Result<Vec<u8>, SnapshotError> {
    let body = serde_json::to_vec(&snapshot).map_err(|e| SnapshotError::payload(path, e))?;
    let mut output = Vec::with_capacity(MAGIC.len() + body.len());
    output.extend_from_slice(MAGIC);
    output.extend_from_slice(&body);
    Ok(output)
}

fn decode(path: &Path, bytes: &[u8]) -> Result<BTreeMap<String, ResolutionEntry>, SnapshotError> {
    let Some(body) = bytes.strip_prefix(MAGIC.as_slice()) else {
        return Err(SnapshotError::InvalidFormat {
            path: path.to_path_buf(),
        });
    };
    let snapshot: SnapshotFile =
        serde_json::from_slice(body).map_err(|e| SnapshotError::payload(path, e))?;
    Ok(snapshot.entries)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("snapshot"), OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}
