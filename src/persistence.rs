//! Date-partitioned record files
//!
//! Records are written to `<dir>/<prefix>-<YYYY-MM-DD>.<ext>`:
//! - **jsonl** (default): one JSON object per line, appended under an exclusive lock
//! - **json**: a pretty-printed JSON array, rewritten through a temporary file that is
//!   renamed over the original while a sidecar `.lock` file is held
//!
//! Loading accepts either layout for the same date.

use crate::error::{DevToolsError, DevToolsResult};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// On-disk layout of persisted records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceFormat {
    /// Append-only JSON Lines
    #[default]
    Jsonl,
    /// Pretty-printed JSON array
    Json,
}

impl PersistenceFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jsonl => "jsonl",
            Self::Json => "json",
        }
    }
}

/// Persistence settings resolved once when a store is constructed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persistence {
    pub dir: PathBuf,
    pub format: PersistenceFormat,
}

impl Persistence {
    pub fn new(dir: impl Into<PathBuf>, format: PersistenceFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    /// JSON Lines persistence into `dir`
    pub fn jsonl(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, PersistenceFormat::Jsonl)
    }
}

/// Single-writer sink for one record family (`queries`, `requests`)
#[derive(Debug)]
pub struct RecordSink {
    dir: PathBuf,
    prefix: &'static str,
    format: PersistenceFormat,
    write_lock: Mutex<()>,
}

impl RecordSink {
    pub fn new(persistence: Persistence, prefix: &'static str) -> Self {
        Self {
            dir: persistence.dir,
            prefix,
            format: persistence.format,
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: &str) -> PathBuf {
        partition_path(&self.dir, self.prefix, date, self.format)
    }

    /// Persist one record into the partition for `date`
    pub fn append<T: Serialize>(&self, record: &T, date: &str) -> DevToolsResult<PathBuf> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        fs::create_dir_all(&self.dir).map_err(|e| DevToolsError::io(&self.dir, e))?;
        let path = self.path_for(date);

        match self.format {
            PersistenceFormat::Jsonl => {
                let mut line = serde_json::to_string(record)?;
                line.push('\n');
                append_line(&path, &line)?;
            }
            PersistenceFormat::Json => rewrite_array(&path, serde_json::to_value(record)?)?,
        }

        Ok(path)
    }
}

/// Persisted forms of the records a store already holds, counted per form
///
/// Restoring consumes one matching held record per incoming record, so reloading a
/// file skips what is already in memory while repeated identical records in the
/// file itself are all kept the first time.
#[derive(Debug, Default)]
pub(crate) struct HeldRecords {
    counts: HashMap<String, usize>,
}

impl HeldRecords {
    pub(crate) fn new(keys: impl IntoIterator<Item = String>) -> Self {
        let mut counts = HashMap::new();
        for key in keys {
            *counts.entry(key).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Consume one held record with this persisted form; `false` when none is left
    pub(crate) fn take(&mut self, key: &str) -> bool {
        match self.counts.get_mut(key) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }
}

pub fn partition_path(dir: &Path, prefix: &str, date: &str, format: PersistenceFormat) -> PathBuf {
    dir.join(format!("{}-{}.{}", prefix, date, format.extension()))
}

/// Append `line` to `path` while holding an exclusive lock on the file
pub fn append_line(path: &Path, line: &str) -> DevToolsResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| DevToolsError::io(path, e))?;

    file.lock_exclusive().map_err(|e| DevToolsError::io(path, e))?;
    let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
    let _ = FileExt::unlock(&file);

    written.map_err(|e| DevToolsError::io(path, e))
}

fn rewrite_array(path: &Path, record: serde_json::Value) -> DevToolsResult<()> {
    let lock_path = path.with_extension("json.lock");
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| DevToolsError::io(&lock_path, e))?;
    lock_file
        .lock_exclusive()
        .map_err(|e| DevToolsError::io(&lock_path, e))?;

    let result = (|| -> DevToolsResult<()> {
        // An unreadable array is left untouched rather than replaced by a fresh one
        let mut records: Vec<serde_json::Value> = match fs::read_to_string(path) {
            Ok(contents) if contents.trim().is_empty() => Vec::new(),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| DevToolsError::MalformedRecord {
                    path: path.to_path_buf(),
                    line: e.line(),
                    reason: e.to_string(),
                })?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(DevToolsError::io(path, e)),
        };
        records.push(record);

        let tmp_path = path.with_extension("json.tmp");
        let mut tmp = File::create(&tmp_path).map_err(|e| DevToolsError::io(&tmp_path, e))?;
        serde_json::to_writer_pretty(&mut tmp, &records)?;
        tmp.sync_all().map_err(|e| DevToolsError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, path).map_err(|e| DevToolsError::io(path, e))
    })();

    let _ = FileExt::unlock(&lock_file);
    result
}

/// Read every record of one family persisted for `date`, JSON array file first
pub fn load_partition<T: DeserializeOwned>(
    dir: &Path,
    prefix: &str,
    date: &str,
) -> DevToolsResult<Vec<T>> {
    let mut records = load_records(&partition_path(dir, prefix, date, PersistenceFormat::Json))?;
    records.extend(load_records(&partition_path(
        dir,
        prefix,
        date,
        PersistenceFormat::Jsonl,
    ))?);
    Ok(records)
}

/// Read records from a single file in either layout; a missing file is empty
pub fn load_records<T: DeserializeOwned>(path: &Path) -> DevToolsResult<Vec<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(DevToolsError::io(path, e)),
    };

    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(&contents).map_err(|e| DevToolsError::MalformedRecord {
            path: path.to_path_buf(),
            line: e.line(),
            reason: e.to_string(),
        });
    }

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| DevToolsError::MalformedRecord {
                path: path.to_path_buf(),
                line: idx + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}
