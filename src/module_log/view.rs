//! Per-module log buffers
//!
//! Every module gets its own ordered sequence of [`ModuleLogEntry`] values. With a
//! log directory configured, each call also appends a line to
//! `<dir>/<module>-<YYYY-MM-DD>.log`:
//!
//! ```text
//! [2026-03-01 10:00:00] ERROR: bad login {"user":"bob"}
//! ```

use crate::clock::{date_stamp, format_timestamp, timestamp_format, Clock, SystemClock};
use crate::error::{DevToolsError, DevToolsResult};
use crate::persistence::{append_line, HeldRecords};
use crate::Context;
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Default page size of [`ModuleLogView::logs`]
pub const DEFAULT_LOG_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleLogEntry {
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub context: Context,
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Local>,
}

impl ModuleLogEntry {
    /// Plain-text line written to module log files, without trailing newline
    ///
    /// Backslashes and line breaks in the message are escaped so each entry stays
    /// on one physical line.
    pub fn to_line(&self) -> String {
        let context = if self.context.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&self.context).unwrap_or_default()
        };

        format!(
            "[{}] {}: {} {}",
            format_timestamp(&self.timestamp),
            self.level.to_uppercase(),
            escape_message(&self.message),
            context
        )
    }

    /// Parse a line produced by [`to_line`](Self::to_line); the level comes back lowercased
    pub fn parse_line(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('[')?;
        let (timestamp, rest) = rest.split_once("] ")?;
        let timestamp = timestamp_format::parse(timestamp)?;
        let (level, rest) = rest.split_once(": ")?;

        let (message, context) = split_context(rest);

        Some(Self {
            level: level.to_lowercase(),
            message: unescape_message(message),
            context,
            timestamp,
        })
    }
}

fn escape_message(message: &str) -> String {
    message
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

fn unescape_message(escaped: &str) -> String {
    let mut message = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            message.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => message.push('\n'),
            Some('r') => message.push('\r'),
            Some(other) => message.push(other),
            None => message.push('\\'),
        }
    }
    message
}

/// Split `message {json}` into its parts; an empty context leaves one trailing space
fn split_context(rest: &str) -> (&str, Context) {
    if rest.ends_with('}') {
        for (idx, _) in rest.match_indices(" {") {
            if let Ok(context) = serde_json::from_str::<Context>(&rest[idx + 1..]) {
                return (&rest[..idx], context);
            }
        }
    }
    (rest.strip_suffix(' ').unwrap_or(rest), Context::new())
}

pub struct ModuleLogView {
    logs: Mutex<IndexMap<String, Vec<ModuleLogEntry>>>,
    log_dir: Option<PathBuf>,
    clock: Arc<dyn Clock>,
}

impl ModuleLogView {
    /// Create a view, mirroring every entry to files under `log_dir` when set
    pub fn new(log_dir: Option<PathBuf>) -> Self {
        Self {
            logs: Mutex::new(IndexMap::new()),
            log_dir,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Vec<ModuleLogEntry>>> {
        self.logs.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn log(&self, module: &str, level: &str, message: impl Into<String>, context: Context) {
        let entry = ModuleLogEntry {
            level: level.to_string(),
            message: message.into(),
            context,
            timestamp: self.clock.now(),
        };

        if let Some(dir) = &self.log_dir {
            if let Err(e) = write_line(dir, module, &entry) {
                tracing::warn!(error = %e, kind = e.kind(), module, "Failed to write module log");
            }
        }

        self.lock().entry(module.to_string()).or_default().push(entry);
    }

    /// Last `limit` entries of `module`, optionally only those at `level`
    pub fn logs(&self, module: &str, level: Option<&str>, limit: usize) -> Vec<ModuleLogEntry> {
        let logs = self.lock();
        let Some(entries) = logs.get(module) else {
            return Vec::new();
        };

        let matching: Vec<&ModuleLogEntry> = entries
            .iter()
            .filter(|e| level.map_or(true, |l| e.level == l))
            .collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).cloned().collect()
    }

    pub fn all_logs(&self) -> IndexMap<String, Vec<ModuleLogEntry>> {
        self.lock().clone()
    }

    pub fn modules(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Clear one module, or every module when `module` is `None`
    pub fn clear(&self, module: Option<&str>) {
        let mut logs = self.lock();
        match module {
            Some(module) => {
                logs.shift_remove(module);
            }
            None => logs.clear(),
        }
    }

    /// Append previously written entries without writing them again
    ///
    /// An entry whose log line matches one already held for the module is skipped.
    /// Returns the number of entries appended.
    pub fn restore(
        &self,
        module: &str,
        entries: impl IntoIterator<Item = ModuleLogEntry>,
    ) -> usize {
        let mut logs = self.lock();
        let held_entries = logs.entry(module.to_string()).or_default();
        let mut held = HeldRecords::new(held_entries.iter().map(ModuleLogEntry::to_line));

        let mut restored = 0;
        for entry in entries {
            if held.take(&entry.to_line()) {
                continue;
            }
            held_entries.push(entry);
            restored += 1;
        }
        restored
    }

    /// Restore every module log file written to `dir` for `date`
    ///
    /// Returns the number of entries restored.
    pub fn load_dir(&self, dir: &Path, date: &str) -> DevToolsResult<usize> {
        let mut restored = 0;
        for (module, entries) in load_module_logs(dir, date)? {
            restored += self.restore(&module, entries);
        }
        Ok(restored)
    }
}

impl Default for ModuleLogView {
    fn default() -> Self {
        Self::new(None)
    }
}

/// File name stem for a module; path separators would escape the log directory
fn file_stem(module: &str) -> String {
    module.replace(['/', '\\'], "_")
}

fn write_line(dir: &Path, module: &str, entry: &ModuleLogEntry) -> DevToolsResult<()> {
    fs::create_dir_all(dir).map_err(|e| DevToolsError::io(dir, e))?;
    let path = dir.join(format!(
        "{}-{}.log",
        file_stem(module),
        date_stamp(&entry.timestamp)
    ));
    append_line(&path, &format!("{}\n", entry.to_line()))
}

/// Read every `<module>-<date>.log` file in `dir`, modules sorted by name
///
/// Lines that do not parse are skipped with a warning.
pub fn load_module_logs(
    dir: &Path,
    date: &str,
) -> DevToolsResult<IndexMap<String, Vec<ModuleLogEntry>>> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(IndexMap::new()),
        Err(e) => return Err(DevToolsError::io(dir, e)),
    };

    let suffix = format!("-{}.log", date);
    let mut modules = IndexMap::new();

    for dir_entry in read_dir {
        let path = dir_entry.map_err(|e| DevToolsError::io(dir, e))?.path();
        let Some(module) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_suffix(suffix.as_str()))
            .filter(|module| !module.is_empty())
            .map(str::to_string)
        else {
            continue;
        };

        let contents = fs::read_to_string(&path).map_err(|e| DevToolsError::io(&path, e))?;
        let mut entries = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match ModuleLogEntry::parse_line(line) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!(
                    path = %path.display(),
                    line = idx + 1,
                    "Skipping unparseable module log line"
                ),
            }
        }
        modules.insert(module, entries);
    }

    modules.sort_keys();
    Ok(modules)
}
