//! The [`DevTools`] bundle shared with request-handling code
//!
//! Owns one request inspector, one module log view and one query profiler, all
//! built from a single [`DevToolsConfig`].
//!
//! # Example
//!
//! ```ignore
//! let cfg = devtools::config::load_config(Path::new("devtools.toml"))?;
//! let devtools = Arc::new(DevTools::from_config(&cfg));
//!
//! let app = Router::new()
//!     .route("/users", get(list_users))
//!     .layer(middleware::from_fn_with_state(devtools.clone(), record_requests))
//!     .with_state(devtools);
//! ```

use crate::config::DevToolsConfig;
use crate::dashboard::{DashboardSettings, DevToolsDashboard};
use crate::error::{DevToolsError, DevToolsResult};
use crate::memory::ProcessMemory;
use crate::middleware::RequestTrace;
use crate::module_log::{ModuleLogLayer, ModuleLogView};
use crate::query::{load_queries, QueryEntry, QueryProfiler};
use crate::request::{load_requests, RequestInspector};
use serde_json::Value;
use std::sync::Arc;

pub struct DevTools {
    pub requests: Arc<RequestInspector>,
    pub queries: Arc<QueryProfiler>,
    pub logs: Arc<ModuleLogView>,
    settings: DashboardSettings,
    memory: ProcessMemory,
}

/// Counts restored by [`DevTools::load_persisted`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub requests: usize,
    pub queries: usize,
    pub logs: usize,
}

impl DevTools {
    pub fn new(
        requests: RequestInspector,
        queries: QueryProfiler,
        logs: ModuleLogView,
        settings: DashboardSettings,
    ) -> Self {
        Self {
            requests: Arc::new(requests),
            queries: Arc::new(queries),
            logs: Arc::new(logs),
            settings,
            memory: ProcessMemory::new(),
        }
    }

    pub fn from_config(cfg: &DevToolsConfig) -> Self {
        let persistence = cfg.storage.persistence();

        let requests = RequestInspector::new(persistence.clone());
        let queries = QueryProfiler::new(persistence);
        if !cfg.enabled {
            requests.disable();
            queries.disable();
        }

        Self::new(
            requests,
            queries,
            ModuleLogView::new(cfg.logs.path.clone()),
            DashboardSettings {
                slow_query_threshold_ms: cfg.slow_query_threshold_ms,
                recent_requests: cfg.dashboard.recent_requests,
            },
        )
    }

    pub fn settings(&self) -> DashboardSettings {
        self.settings
    }

    /// Resident memory of this process in bytes, as stored on request entries
    pub fn memory_usage(&self) -> u64 {
        self.memory.current()
    }

    /// Profile a query and attach it to the current request, if any
    pub fn record_query(
        &self,
        trace: Option<&RequestTrace>,
        sql: impl Into<String>,
        bindings: Vec<Value>,
        duration: f64,
        module: Option<&str>,
    ) -> Option<Arc<QueryEntry>> {
        let entry = self.queries.record(sql, bindings, duration, module)?;
        if let Some(trace) = trace {
            trace.add_query_entry(&entry);
        }
        Some(entry)
    }

    pub fn dashboard(&self) -> DevToolsDashboard {
        DevToolsDashboard::new(
            self.requests.clone(),
            self.logs.clone(),
            self.queries.clone(),
            self.settings,
        )
    }

    /// A tracing layer mirroring application events into [`Self::logs`]
    pub fn tracing_layer(&self) -> ModuleLogLayer {
        ModuleLogLayer::new(self.logs.clone())
    }

    /// Restore what a running application persisted for `date` (`YYYY-MM-DD`)
    ///
    /// Records already held are skipped, so loading the same day again restores
    /// nothing new. The summary counts only what was added.
    ///
    /// Fails with [`DevToolsError::DashboardUnavailable`] when storage is not
    /// configured. Module logs are read only when a log directory is configured.
    pub fn load_persisted(&self, cfg: &DevToolsConfig, date: &str) -> DevToolsResult<LoadSummary> {
        let Some(persistence) = cfg.storage.persistence() else {
            return Err(DevToolsError::DashboardUnavailable(
                "storage is not configured".to_string(),
            ));
        };

        let requests = self.requests.restore(load_requests(&persistence.dir, date)?);
        let queries = self.queries.restore(load_queries(&persistence.dir, date)?);

        let logs = match &cfg.logs.path {
            Some(dir) => self.logs.load_dir(dir, date)?,
            None => 0,
        };

        let summary = LoadSummary {
            requests,
            queries,
            logs,
        };
        tracing::debug!(
            date,
            requests = summary.requests,
            queries = summary.queries,
            logs = summary.logs,
            "Persisted data loaded"
        );

        Ok(summary)
    }
}

impl Default for DevTools {
    fn default() -> Self {
        Self::from_config(&DevToolsConfig::default())
    }
}
