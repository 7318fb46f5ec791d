//! In-memory request inspector
//!
//! Keeps every recorded [`RequestEntry`] keyed by a generated id, in insertion
//! order, and optionally persists each entry when it is recorded.

use super::entry::{RequestDetails, RequestEntry, RequestInfo, RequestRecord, ResponseInfo};
use crate::clock::{date_stamp, Clock, SystemClock};
use crate::error::DevToolsResult;
use crate::persistence::{load_partition, Persistence, RecordSink};
use indexmap::IndexMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Default page size of [`RequestInspector::recent_entries`]
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Persisted file prefix, `requests-<date>.<ext>`
pub const REQUEST_FILE_PREFIX: &str = "requests";

pub struct RequestInspector {
    enabled: AtomicBool,
    entries: Mutex<IndexMap<String, Arc<RequestEntry>>>,
    sink: Option<RecordSink>,
    clock: Arc<dyn Clock>,
}

impl RequestInspector {
    pub fn new(persistence: Option<Persistence>) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            entries: Mutex::new(IndexMap::new()),
            sink: persistence.map(|p| RecordSink::new(p, REQUEST_FILE_PREFIX)),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Arc<RequestEntry>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a completed request
    ///
    /// While the inspector is disabled this still returns an entry, but that entry
    /// is never stored: it cannot be found through [`entry`](Self::entry) and
    /// anything added to it afterwards is lost with it.
    ///
    /// Only the state at record time is persisted; later `add_*`/`set_data` calls
    /// on the returned entry stay in memory.
    pub fn record(
        &self,
        request: RequestInfo,
        response: Option<ResponseInfo>,
        duration: f64,
        memory_usage: u64,
    ) -> Arc<RequestEntry> {
        self.record_with_details(
            request,
            response,
            duration,
            memory_usage,
            RequestDetails::default(),
        )
    }

    /// Record a completed request together with details gathered while it ran
    ///
    /// The details are attached before the entry is persisted.
    pub fn record_with_details(
        &self,
        request: RequestInfo,
        response: Option<ResponseInfo>,
        duration: f64,
        memory_usage: u64,
        details: RequestDetails,
    ) -> Arc<RequestEntry> {
        let now = self.clock.now();

        if !self.is_enabled() {
            let entry = Arc::new(RequestEntry::new(
                Uuid::new_v4().simple().to_string(),
                request,
                response,
                duration,
                memory_usage,
                now,
            ));
            entry.absorb(details);
            return entry;
        }

        let id = format!("req_{}", Uuid::now_v7().simple());
        let entry = Arc::new(RequestEntry::new(
            id.clone(),
            request,
            response,
            duration,
            memory_usage,
            now,
        ));
        entry.absorb(details);
        self.lock().insert(id, entry.clone());

        tracing::debug!(
            request_id = %entry.id(),
            method = %entry.request().method,
            path = %entry.request().path,
            duration_ms = entry.duration(),
            "Request recorded"
        );

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.append(&entry.to_record(), &date_stamp(&now)) {
                tracing::warn!(
                    error = %e,
                    kind = e.kind(),
                    request_id = %entry.id(),
                    "Failed to persist request"
                );
            }
        }

        entry
    }

    pub fn entry(&self, id: &str) -> Option<Arc<RequestEntry>> {
        self.lock().get(id).cloned()
    }

    /// Up to `limit` entries, newest timestamp first
    ///
    /// Entries sharing a timestamp are ordered by most recent insertion first.
    pub fn recent_entries(&self, limit: usize) -> Vec<Arc<RequestEntry>> {
        let mut entries: Vec<Arc<RequestEntry>> = self.lock().values().rev().cloned().collect();
        entries.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        entries.truncate(limit);
        entries
    }

    /// Entries whose path contains `pattern` (case-sensitive), in insertion order
    pub fn entries_by_path(&self, pattern: &str) -> Vec<Arc<RequestEntry>> {
        self.lock()
            .values()
            .filter(|entry| entry.request().path.contains(pattern))
            .cloned()
            .collect()
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        tracing::info!("Request inspector enabled");
    }

    /// Stop storing requests; already recorded entries are kept
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        tracing::info!("Request inspector disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Drop every in-memory entry; persisted files are left alone
    pub fn clear(&self) {
        let mut entries = self.lock();
        let cleared = entries.len();
        entries.clear();
        tracing::info!(cleared, "Request inspector cleared");
    }

    /// Re-insert previously persisted records without writing them again
    ///
    /// A record whose id is already present is skipped. Returns the number of
    /// records inserted.
    pub fn restore(&self, records: impl IntoIterator<Item = RequestRecord>) -> usize {
        let mut entries = self.lock();
        let mut restored = 0;
        for record in records {
            if entries.contains_key(&record.id) {
                continue;
            }
            entries.insert(record.id.clone(), Arc::new(RequestEntry::from_record(record)));
            restored += 1;
        }
        restored
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Read the requests persisted under `dir` for `date` (`YYYY-MM-DD`)
pub fn load_requests(dir: &Path, date: &str) -> DevToolsResult<Vec<RequestRecord>> {
    load_partition(dir, REQUEST_FILE_PREFIX, date)
}

impl Default for RequestInspector {
    fn default() -> Self {
        Self::new(None)
    }
}
