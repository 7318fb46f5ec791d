//! Static HTML rendering of [`DashboardData`]

use super::data::{DashboardData, ModuleLogStats};
use crate::query::QueryEntry;
use crate::request::RequestRecord;

/// Requests listed on the page, regardless of how many the data carries
const LISTED_REQUESTS: usize = 10;

/// SQL longer than this is cut in the slow query table
const SQL_PREVIEW_CHARS: usize = 100;

const STYLE: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f4f5f7; padding: 20px; color: #222; }
.container { max-width: 1400px; margin: 0 auto; }
.header, .card { background: #fff; padding: 20px; border-radius: 8px; box-shadow: 0 1px 3px rgba(0,0,0,0.12); margin-bottom: 20px; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(300px, 1fr)); gap: 20px; }
.card h3 { font-size: 15px; color: #555; margin-bottom: 12px; padding-bottom: 8px; border-bottom: 2px solid #eee; }
.stat { display: flex; justify-content: space-between; padding: 8px 0; border-bottom: 1px solid #f0f0f0; }
.stat:last-child { border-bottom: none; }
.stat-value { font-weight: 600; }
.request-item { padding: 10px; background: #fafafa; border-radius: 4px; margin-bottom: 8px; }
.request-meta { font-size: 12px; color: #666; margin-top: 4px; }
.method, .status, .badge { display: inline-block; padding: 2px 6px; border-radius: 3px; font-size: 12px; font-weight: 600; }
.method-get, .status-2xx { background: #d4edda; color: #155724; }
.method-post, .status-3xx, .badge-info { background: #d1ecf1; color: #0c5460; }
.method-put, .method-patch, .status-4xx, .badge-warning { background: #fff3cd; color: #856404; }
.method-delete, .status-5xx, .badge-danger { background: #f8d7da; color: #721c24; }
.levels { padding-left: 20px; }
table { width: 100%; border-collapse: collapse; }
th, td { padding: 10px; text-align: left; border-bottom: 1px solid #eee; }
th { background: #fafafa; }
td.sql { font-family: monospace; font-size: 12px; }
.empty { color: #888; font-style: italic; }
"#;

/// Render a complete HTML document
pub fn render_dashboard(data: &DashboardData) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>DevTools Dashboard</title>
<style>{style}</style>
</head>
<body>
<div class="container">
<div class="header">
<h1>DevTools Dashboard</h1>
<p>Request inspector, module logs and query profiler</p>
</div>
<div class="grid">
{requests}
{logs}
{statistics}
</div>
{slow}
</div>
</body>
</html>
"#,
        style = STYLE,
        requests = render_requests(data),
        logs = render_logs(data),
        statistics = render_statistics(data),
        slow = render_slow_queries(&data.queries.slow_queries, data.queries.threshold_ms),
    )
}

fn render_requests(data: &DashboardData) -> String {
    let items: String = data
        .requests
        .recent
        .iter()
        .take(LISTED_REQUESTS)
        .map(render_request)
        .collect();

    let body = if items.is_empty() {
        r#"<p class="empty">No requests recorded</p>"#.to_string()
    } else {
        items
    };

    format!(
        r#"<div class="card">
<h3>Recent Requests ({total} total)</h3>
{body}
</div>"#,
        total = data.requests.total,
        body = body,
    )
}

fn render_request(request: &RequestRecord) -> String {
    let status = request
        .status_code
        .map(|code| {
            format!(
                r#"<span class="status status-{}xx">{}</span>"#,
                code / 100,
                code
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div class="request-item">
<div><span class="method method-{method_class}">{method}</span> {status} <strong>{path}</strong></div>
<div class="request-meta">{duration:.2} ms | {memory:.2} MB</div>
</div>
"#,
        method_class = html_escape(&request.method.to_lowercase()),
        method = html_escape(&request.method),
        status = status,
        path = html_escape(&request.path),
        duration = request.duration,
        memory = request.memory_usage as f64 / 1024.0 / 1024.0,
    )
}

fn render_logs(data: &DashboardData) -> String {
    let modules: String = data
        .logs
        .modules
        .iter()
        .map(|(module, stats)| render_module(module, stats))
        .collect();

    let body = if modules.is_empty() {
        r#"<p class="empty">No module logs</p>"#.to_string()
    } else {
        modules
    };

    format!(
        r#"<div class="card">
<h3>Module Logs</h3>
{}
</div>"#,
        body
    )
}

fn render_module(module: &str, stats: &ModuleLogStats) -> String {
    let badges: Vec<String> = stats
        .by_level
        .iter()
        .map(|(level, count)| {
            format!(
                r#"<span class="badge badge-{}">{}: {}</span>"#,
                level_badge(level),
                html_escape(&level.to_uppercase()),
                count
            )
        })
        .collect();

    let levels = if badges.is_empty() {
        String::new()
    } else {
        format!(r#"<div class="levels">{}</div>"#, badges.join(" "))
    };

    format!(
        r#"<div class="stat"><span>{}</span><span class="stat-value">{}</span></div>
{}
"#,
        html_escape(module),
        stats.total,
        levels
    )
}

fn level_badge(level: &str) -> &'static str {
    match level {
        "error" | "critical" | "alert" | "emergency" => "danger",
        "warning" | "warn" => "warning",
        _ => "info",
    }
}

fn render_statistics(data: &DashboardData) -> String {
    let stats = &data.queries.statistics;
    format!(
        r#"<div class="card">
<h3>Query Statistics</h3>
<div class="stat"><span>Total Queries</span><span class="stat-value">{}</span></div>
<div class="stat"><span>Total Duration</span><span class="stat-value">{:.2} ms</span></div>
<div class="stat"><span>Avg Duration</span><span class="stat-value">{:.2} ms</span></div>
<div class="stat"><span>Slow Queries</span><span class="stat-value">{}</span></div>
</div>"#,
        stats.total_queries, stats.total_duration, stats.avg_duration, stats.slow_queries
    )
}

fn render_slow_queries(queries: &[QueryEntry], threshold_ms: f64) -> String {
    if queries.is_empty() {
        return String::new();
    }

    let rows: String = queries
        .iter()
        .map(|query| {
            format!(
                r#"<tr><td class="sql">{}</td><td>{:.2} ms</td><td>{}</td><td>{}</td></tr>
"#,
                html_escape(&sql_preview(query.sql())),
                query.duration(),
                html_escape(query.module().unwrap_or("-")),
                crate::clock::format_timestamp(&query.timestamp()),
            )
        })
        .collect();

    format!(
        r#"<div class="card">
<h3>Slow Queries (&gt;{}ms)</h3>
<table>
<thead><tr><th>SQL</th><th>Duration</th><th>Module</th><th>Timestamp</th></tr></thead>
<tbody>
{}</tbody>
</table>
</div>"#,
        threshold_ms, rows
    )
}

fn sql_preview(sql: &str) -> String {
    if sql.chars().count() <= SQL_PREVIEW_CHARS {
        return sql.to_string();
    }
    let cut: String = sql.chars().take(SQL_PREVIEW_CHARS).collect();
    format!("{}...", cut)
}

/// Simple HTML escape
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
