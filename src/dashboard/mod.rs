//! Read-only dashboard over the three stores
//!
//! [`DevToolsDashboard`] snapshots the request inspector, module log view and query
//! profiler into [`DashboardData`], which renders to a standalone HTML page or JSON.

pub mod data;
pub mod render;

pub use data::{DashboardData, LogData, ModuleLogStats, QueryData, RequestData};
pub use render::{html_escape, render_dashboard};

use crate::module_log::ModuleLogView;
use crate::query::{QueryProfiler, DEFAULT_SLOW_QUERY_THRESHOLD_MS};
use crate::request::RequestInspector;
use std::sync::Arc;

/// What the dashboard lists
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardSettings {
    pub slow_query_threshold_ms: f64,
    pub recent_requests: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: DEFAULT_SLOW_QUERY_THRESHOLD_MS,
            recent_requests: 20,
        }
    }
}

pub struct DevToolsDashboard {
    requests: Arc<RequestInspector>,
    logs: Arc<ModuleLogView>,
    queries: Arc<QueryProfiler>,
    settings: DashboardSettings,
}

impl DevToolsDashboard {
    pub fn new(
        requests: Arc<RequestInspector>,
        logs: Arc<ModuleLogView>,
        queries: Arc<QueryProfiler>,
        settings: DashboardSettings,
    ) -> Self {
        Self {
            requests,
            logs,
            queries,
            settings,
        }
    }

    pub fn data(&self) -> DashboardData {
        let recent = self
            .requests
            .recent_entries(self.settings.recent_requests)
            .iter()
            .map(|entry| entry.to_record())
            .collect();

        let modules = self
            .logs
            .all_logs()
            .iter()
            .map(|(module, entries)| (module.clone(), ModuleLogStats::from_entries(entries)))
            .collect();

        let threshold = self.settings.slow_query_threshold_ms;
        let slow_queries = self
            .queries
            .slow_queries(threshold)
            .iter()
            .map(|q| q.as_ref().clone())
            .collect();

        DashboardData {
            requests: RequestData {
                total: self.requests.len(),
                recent,
            },
            logs: LogData { modules },
            queries: QueryData {
                statistics: self.queries.statistics_with_threshold(threshold),
                threshold_ms: threshold,
                slow_queries,
            },
        }
    }

    pub fn render(&self) -> String {
        render_dashboard(&self.data())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RequestInfo, ResponseInfo};
    use crate::Context;

    fn dashboard() -> DevToolsDashboard {
        let requests = Arc::new(RequestInspector::default());
        let logs = Arc::new(ModuleLogView::default());
        let queries = Arc::new(QueryProfiler::default());

        for i in 0..30 {
            requests.record(
                RequestInfo::new("GET", format!("/items/{}", i)),
                Some(ResponseInfo::new(200)),
                1.0,
                0,
            );
        }
        logs.log("auth", "error", "bad login", Context::new());
        logs.log("auth", "info", "login", Context::new());
        queries.record("SELECT slow", vec![], 150.0, Some("items"));
        queries.record("SELECT fast", vec![], 5.0, None);

        DevToolsDashboard::new(requests, logs, queries, DashboardSettings::default())
    }

    #[test]
    fn test_data_composition() {
        let data = dashboard().data();

        assert_eq!(data.requests.total, 30);
        assert_eq!(data.requests.recent.len(), 20);
        assert_eq!(data.logs.modules["auth"].total, 2);
        assert_eq!(data.logs.modules["auth"].by_level["error"], 1);
        assert_eq!(data.queries.statistics.total_queries, 2);
        assert_eq!(data.queries.slow_queries.len(), 1);
        assert_eq!(data.queries.slow_queries[0].sql(), "SELECT slow");
    }

    #[test]
    fn test_render_contains_sections() {
        let html = dashboard().render();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Recent Requests (30 total)"));
        assert!(html.contains("ERROR: 1"));
        assert!(html.contains("Slow Queries (&gt;100ms)"));
        assert!(html.contains("SELECT slow"));
        assert!(!html.contains("SELECT fast"));
        assert_eq!(html.matches("class=\"request-item\"").count(), 10);
    }

    #[test]
    fn test_render_empty_stores() {
        let dashboard = DevToolsDashboard::new(
            Arc::new(RequestInspector::default()),
            Arc::new(ModuleLogView::default()),
            Arc::new(QueryProfiler::default()),
            DashboardSettings::default(),
        );
        let html = dashboard.render();

        assert!(html.contains("No requests recorded"));
        assert!(html.contains("No module logs"));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn test_json_export() {
        let json = dashboard().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["queries"]["statistics"]["slow_queries"], 1);
        assert_eq!(value["requests"]["recent"][0]["method"], "GET");
    }
}
