//! In-memory query profiler
//!
//! Collects [`QueryEntry`] records in insertion order, answers tail/filter
//! queries and aggregates, and optionally persists each entry as it arrives.

use super::entry::QueryEntry;
use crate::clock::{date_stamp, Clock, SystemClock};
use crate::error::DevToolsResult;
use crate::persistence::{load_partition, HeldRecords, Persistence, RecordSink};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Threshold used by [`QueryProfiler::statistics`]
pub const DEFAULT_SLOW_QUERY_THRESHOLD_MS: f64 = 100.0;

/// Default page size of [`QueryProfiler::queries`]
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Persisted file prefix, `queries-<date>.<ext>`
pub const QUERY_FILE_PREFIX: &str = "queries";

/// Aggregate view over every recorded query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryStatistics {
    pub total_queries: usize,
    pub total_duration: f64,
    pub avg_duration: f64,
    pub slow_queries: usize,
}

pub struct QueryProfiler {
    enabled: AtomicBool,
    queries: Mutex<Vec<Arc<QueryEntry>>>,
    sink: Option<RecordSink>,
    clock: Arc<dyn Clock>,
}

impl QueryProfiler {
    /// Create a profiler, persisting to `<dir>/queries-<date>` when `persistence` is set
    pub fn new(persistence: Option<Persistence>) -> Self {
        Self {
            enabled: AtomicBool::new(true),
            queries: Mutex::new(Vec::new()),
            sink: persistence.map(|p| RecordSink::new(p, QUERY_FILE_PREFIX)),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<QueryEntry>>> {
        self.queries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a query
    ///
    /// Returns the captured entry, or `None` when the profiler is disabled.
    /// A persistence failure is logged and does not affect the in-memory capture.
    pub fn record(
        &self,
        sql: impl Into<String>,
        bindings: Vec<Value>,
        duration: f64,
        module: Option<&str>,
    ) -> Option<Arc<QueryEntry>> {
        if !self.is_enabled() {
            return None;
        }

        let entry = Arc::new(QueryEntry::new(
            sql,
            bindings,
            duration,
            module.map(str::to_string),
            self.clock.now(),
        ));
        self.lock().push(entry.clone());

        tracing::debug!(
            module = entry.module().unwrap_or("-"),
            duration_ms = entry.duration(),
            "Query recorded"
        );

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.append(entry.as_ref(), &date_stamp(&entry.timestamp())) {
                tracing::warn!(
                    error = %e,
                    kind = e.kind(),
                    dir = %sink.dir().display(),
                    "Failed to persist query"
                );
            }
        }

        Some(entry)
    }

    /// Up to `limit` most recent queries, optionally restricted to one module
    pub fn queries(&self, module: Option<&str>, limit: usize) -> Vec<Arc<QueryEntry>> {
        let queries = self.lock();
        let matching: Vec<&Arc<QueryEntry>> = queries
            .iter()
            .filter(|q| module.map_or(true, |m| q.module() == Some(m)))
            .collect();

        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).cloned().collect()
    }

    /// Queries strictly slower than `threshold_ms`, in recording order
    pub fn slow_queries(&self, threshold_ms: f64) -> Vec<Arc<QueryEntry>> {
        self.lock()
            .iter()
            .filter(|q| q.is_slower_than(threshold_ms))
            .cloned()
            .collect()
    }

    pub fn statistics(&self) -> QueryStatistics {
        self.statistics_with_threshold(DEFAULT_SLOW_QUERY_THRESHOLD_MS)
    }

    pub fn statistics_with_threshold(&self, threshold_ms: f64) -> QueryStatistics {
        let queries = self.lock();
        let total_queries = queries.len();
        let total_duration: f64 = queries.iter().map(|q| q.duration()).sum();
        let avg_duration = if total_queries > 0 {
            total_duration / total_queries as f64
        } else {
            0.0
        };
        let slow_queries = queries
            .iter()
            .filter(|q| q.is_slower_than(threshold_ms))
            .count();

        QueryStatistics {
            total_queries,
            total_duration,
            avg_duration,
            slow_queries,
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        tracing::info!("Query profiler enabled");
    }

    /// Stop capturing; already recorded queries are kept
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        tracing::info!("Query profiler disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Drop every in-memory query; persisted files are left alone
    pub fn clear(&self) {
        let mut queries = self.lock();
        let cleared = queries.len();
        queries.clear();
        tracing::info!(cleared, "Query profiler cleared");
    }

    /// Re-insert previously persisted entries without writing them again
    ///
    /// An entry whose persisted form matches one already held is skipped, so
    /// loading the same day twice, or into the process that wrote it, does not
    /// count a query twice. Returns the number of entries inserted.
    pub fn restore(&self, entries: impl IntoIterator<Item = QueryEntry>) -> usize {
        let mut queries = self.lock();
        let mut held = HeldRecords::new(queries.iter().map(|q| persisted_key(q)));

        let mut restored = 0;
        for entry in entries {
            let entry = entry.normalized();
            if held.take(&persisted_key(&entry)) {
                continue;
            }
            queries.push(Arc::new(entry));
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

fn persisted_key(entry: &QueryEntry) -> String {
    serde_json::to_string(entry).unwrap_or_default()
}

/// Read the queries persisted under `dir` for `date` (`YYYY-MM-DD`)
pub fn load_queries(dir: &Path, date: &str) -> DevToolsResult<Vec<QueryEntry>> {
    load_partition(dir, QUERY_FILE_PREFIX, date)
}

impl Default for QueryProfiler {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profiler_with(durations: &[f64]) -> QueryProfiler {
        let profiler = QueryProfiler::default();
        for (i, duration) in durations.iter().enumerate() {
            profiler.record(format!("SELECT {}", i), vec![], *duration, None);
        }
        profiler
    }

    #[test]
    fn test_statistics_for_mixed_durations() {
        let profiler = profiler_with(&[50.0, 150.0, 90.0]);

        let stats = profiler.statistics();
        assert_eq!(stats.total_queries, 3);
        assert_eq!(stats.total_duration, 290.0);
        assert!((stats.avg_duration - 96.67).abs() < 0.01);
        assert_eq!(stats.slow_queries, 1);

        let slow = profiler.slow_queries(100.0);
        assert_eq!(slow.len(), 1);
        assert_eq!(slow[0].duration(), 150.0);
    }

    #[test]
    fn test_empty_statistics_have_zero_average() {
        let stats = QueryProfiler::default().statistics();
        assert_eq!(stats.total_queries, 0);
        assert_eq!(stats.total_duration, 0.0);
        assert_eq!(stats.avg_duration, 0.0);
        assert_eq!(stats.slow_queries, 0);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let profiler = profiler_with(&[100.0, 100.5, 99.9]);
        let slow = profiler.slow_queries(100.0);
        assert_eq!(slow.len(), 1);
        assert_eq!(slow[0].duration(), 100.5);
    }

    #[test]
    fn test_disable_skips_capture_and_keeps_data() {
        let profiler = profiler_with(&[1.0]);

        profiler.disable();
        assert!(!profiler.is_enabled());
        assert!(profiler.record("SELECT 2", vec![], 1.0, None).is_none());
        assert_eq!(profiler.statistics().total_queries, 1);

        profiler.enable();
        assert!(profiler.record("SELECT 3", vec![], 1.0, None).is_some());
        assert_eq!(profiler.statistics().total_queries, 2);
    }

    #[test]
    fn test_queries_returns_tail_filtered_by_module() {
        let profiler = QueryProfiler::default();
        for i in 0..5 {
            let module = if i % 2 == 0 { "users" } else { "billing" };
            profiler.record(format!("SELECT {}", i), vec![json!(i)], 1.0, Some(module));
        }

        let users = profiler.queries(Some("users"), 2);
        let sqls: Vec<&str> = users.iter().map(|q| q.sql()).collect();
        assert_eq!(sqls, ["SELECT 2", "SELECT 4"]);

        let all = profiler.queries(None, DEFAULT_QUERY_LIMIT);
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].sql(), "SELECT 0");

        assert!(profiler.queries(Some("search"), 10).is_empty());
    }

    #[test]
    fn test_clear_on_empty_profiler() {
        let profiler = QueryProfiler::default();
        profiler.clear();
        assert!(profiler.is_empty());

        let profiler = profiler_with(&[5.0, 6.0]);
        profiler.clear();
        assert_eq!(profiler.len(), 0);
    }

    #[test]
    fn test_record_persists_each_query() {
        let dir = tempfile::tempdir().unwrap();
        let profiler = QueryProfiler::new(Some(Persistence::jsonl(dir.path())));

        let entry = profiler
            .record("SELECT * FROM t WHERE x=?", vec![json!("abc")], 3.0, Some("t"))
            .unwrap();
        profiler.record("SELECT 1", vec![], 1.0, None);

        let path = dir
            .path()
            .join(format!("queries-{}.jsonl", date_stamp(&entry.timestamp())));
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("SELECT * FROM t WHERE x='abc'"));

        profiler.clear();
        assert!(profiler.is_empty());
    }

    #[test]
    fn test_restore_skips_queries_already_held() {
        let dir = tempfile::tempdir().unwrap();
        let profiler = QueryProfiler::new(Some(Persistence::jsonl(dir.path())));
        let entry = profiler.record("SELECT 1", vec![], 150.0, Some("t")).unwrap();
        profiler.record("SELECT 1", vec![], 150.0, Some("t"));

        let date = date_stamp(&entry.timestamp());
        let loaded = load_queries(dir.path(), &date).unwrap();
        assert_eq!(profiler.restore(loaded.clone()), 0);
        assert_eq!(profiler.len(), 2);

        let fresh = QueryProfiler::default();
        assert_eq!(fresh.restore(loaded.clone()), 2);
        assert_eq!(fresh.restore(loaded), 0);
        assert_eq!(fresh.statistics().total_queries, 2);
        assert_eq!(fresh.statistics().slow_queries, 2);
    }
}
