//! Text storage: line-oriented sources and sharded sinks
//!
//! A sink is a directory holding `part-00000 … part-NNNNN` (one shard per
//! partition) and an empty `_SUCCESS` marker. Shards are written into a
//! hidden sibling directory first and renamed into place, so readers never
//! observe a half-written destination.

use crate::error::{DataflowError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

/// Marker written last into a completed sink
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// One line of input text with its origin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextRecord {
    /// File the line came from
    pub source: Arc<str>,
    /// 1-based line number within `source`
    pub line: usize,
    pub text: String,
}

impl Display for TextRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.source, self.line, self.text)
    }
}

/// What to do when the destination already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    ErrorIfExists,
    Overwrite,
}

impl SaveMode {
    pub fn from_overwrite(overwrite: bool) -> Self {
        if overwrite {
            SaveMode::Overwrite
        } else {
            SaveMode::ErrorIfExists
        }
    }
}

/// Outcome of a completed write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSummary {
    pub location: PathBuf,
    pub shards: usize,
    pub records: usize,
}

/// Data files making up an input location, in sorted order.
///
/// A file location is returned as is. A directory is walked recursively;
/// hidden entries and names starting with `_` (markers) are skipped.
pub fn list_input_files(location: &Path) -> Result<Vec<PathBuf>> {
    if location.is_file() {
        return Ok(vec![location.to_path_buf()]);
    }
    if !location.is_dir() {
        return Err(DataflowError::invalid_location(format!(
            "Input location not found: {}",
            location.display()
        )));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(location)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored(entry.file_name()));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn is_ignored(name: &std::ffi::OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('.') || name.starts_with('_')
}

/// Read every line of one file
pub fn read_lines(path: &Path) -> Result<Vec<TextRecord>> {
    let file = fs::File::open(path).map_err(|e| {
        DataflowError::io(format!("Failed to open {}: {}", path.display(), e)).with_source(e)
    })?;
    let source: Arc<str> = Arc::from(path.display().to_string());

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).split(b'\n').enumerate() {
        let mut bytes = line.map_err(|e| {
            DataflowError::io(format!("Failed to read {}: {}", path.display(), e)).with_source(e)
        })?;
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        records.push(TextRecord {
            source: source.clone(),
            line: idx + 1,
            text: decode_line(bytes),
        });
    }
    debug!("Read {} lines from {}", records.len(), path.display());
    Ok(records)
}

/// Undecodable bytes become U+FFFD so the record keeps its position and can
/// be rejected downstream with a line number.
fn decode_line(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Check the destination against the save mode
pub fn check_destination(location: &Path, mode: SaveMode) -> Result<()> {
    if mode == SaveMode::ErrorIfExists && location.exists() {
        return Err(DataflowError::output_conflict(location));
    }
    Ok(())
}

/// Name of the shard holding partition `index`
pub fn shard_name(index: usize) -> String {
    format!("part-{:05}", index)
}

/// Write one shard file
pub fn write_shard<T: Display>(dir: &Path, index: usize, records: &[T]) -> Result<usize> {
    let path = dir.join(shard_name(index));
    let file = fs::File::create(&path).map_err(|e| {
        DataflowError::io(format!("Failed to create {}: {}", path.display(), e)).with_source(e)
    })?;
    let mut writer = BufWriter::new(file);
    for record in records {
        writeln!(writer, "{}", record)?;
    }
    writer.flush()?;
    Ok(records.len())
}

/// Staging directory next to the destination
pub fn staging_dir(location: &Path) -> Result<tempfile::TempDir> {
    let parent = match location.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".stargraph-staging-")
        .tempdir_in(&parent)?;
    Ok(staging)
}

/// Seal a staged sink and move it to `location`, replacing what is there if allowed
pub fn commit_staged(staging: tempfile::TempDir, location: &Path, mode: SaveMode) -> Result<()> {
    fs::File::create(staging.path().join(SUCCESS_MARKER))?;

    check_destination(location, mode)?;
    if location.is_dir() {
        fs::remove_dir_all(location)?;
    } else if location.exists() {
        fs::remove_file(location)?;
    }

    fs::rename(staging.path(), location).map_err(|e| {
        DataflowError::io(format!(
            "Failed to move output into {}: {}",
            location.display(),
            e
        ))
        .with_source(e)
    })?;
    // staging path is gone now; dropping the handle is a no-op
    drop(staging);
    Ok(())
}
