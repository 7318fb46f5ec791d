//! Snapshot structures consumed by the HTML renderer and `--format json` output

use crate::module_log::ModuleLogEntry;
use crate::query::{QueryEntry, QueryStatistics};
use crate::request::RequestRecord;
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub requests: RequestData,
    pub logs: LogData,
    pub queries: QueryData,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestData {
    /// Every stored request, not only the listed ones
    pub total: usize,
    pub recent: Vec<RequestRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogData {
    pub modules: IndexMap<String, ModuleLogStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleLogStats {
    pub total: usize,
    /// Counts per level, in order of first appearance
    pub by_level: IndexMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryData {
    pub statistics: QueryStatistics,
    pub threshold_ms: f64,
    pub slow_queries: Vec<QueryEntry>,
}

impl ModuleLogStats {
    pub fn from_entries(entries: &[ModuleLogEntry]) -> Self {
        let mut by_level = IndexMap::new();
        for entry in entries {
            *by_level.entry(entry.level.clone()).or_insert(0) += 1;
        }

        Self {
            total: entries.len(),
            by_level,
        }
    }
}
