/// Integration tests for persisted files and reloading them in another process
use devtools::config::DevToolsConfig;
use devtools::persistence::{Persistence, PersistenceFormat};
use devtools::query::load_queries;
use devtools::request::load_requests;
use devtools::{DevTools, DevToolsError, QueryProfiler, RequestInfo, RequestInspector, ResponseInfo};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use std::thread;

fn today() -> String {
    devtools::clock::date_stamp(&chrono::Local::now())
}

#[test]
fn test_json_array_format_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let persistence = Persistence::new(dir.path(), PersistenceFormat::Json);
    let profiler = QueryProfiler::new(Some(persistence.clone()));
    let inspector = RequestInspector::new(Some(persistence));

    profiler.record("SELECT * FROM t WHERE x=?", vec![json!("abc")], 12.0, Some("t"));
    profiler.record("SELECT 2", vec![], 120.0, None);
    let entry = inspector.record(
        RequestInfo::new("DELETE", "/items/3"),
        Some(ResponseInfo::new(204)),
        3.0,
        2048,
    );

    let date = today();
    let raw = fs::read_to_string(dir.path().join(format!("queries-{}.json", date))).unwrap();
    let array: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(array.as_array().unwrap().len(), 2);
    assert_eq!(array[0]["formatted_sql"], "SELECT * FROM t WHERE x='abc'");
    assert_eq!(array[0]["module"], "t");
    assert!(array[1]["module"].is_null());

    let queries = load_queries(dir.path(), &date).unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[1].duration(), 120.0);

    let requests = load_requests(dir.path(), &date).unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].id, entry.id());
    assert_eq!(requests[0].memory_usage, 2048);
}

#[test]
fn test_persisted_request_field_layout() {
    let dir = tempfile::tempdir().unwrap();
    let inspector = RequestInspector::new(Some(Persistence::jsonl(dir.path())));
    inspector.record(RequestInfo::new("GET", "/"), Some(ResponseInfo::new(200)), 1.0, 0);

    let raw = fs::read_to_string(dir.path().join(format!("requests-{}.jsonl", today()))).unwrap();
    let record: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();

    for key in [
        "id",
        "method",
        "path",
        "status_code",
        "duration",
        "memory_usage",
        "timestamp",
        "queries",
        "logs",
        "events",
        "data",
    ] {
        assert!(record.get(key).is_some(), "missing key {}", key);
    }
    assert_eq!(record["timestamp"].as_str().unwrap().len(), 19);
}

#[test]
fn test_concurrent_writers_keep_every_line() {
    let dir = tempfile::tempdir().unwrap();
    let profiler = Arc::new(QueryProfiler::new(Some(Persistence::jsonl(dir.path()))));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let profiler = profiler.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    profiler.record(format!("SELECT {} FROM w{}", i, worker), vec![], 1.0, None);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(profiler.len(), 200);
    assert_eq!(load_queries(dir.path(), &today()).unwrap().len(), 200);
}

#[test]
fn test_malformed_line_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("queries-2026-03-01.jsonl"),
        "{\"sql\":\"SELECT 1\",\"bindings\":[],\"formatted_sql\":\"SELECT 1\",\"duration\":1.0,\"module\":null,\"timestamp\":\"2026-03-01 10:00:00\"}\nnot json\n",
    )
    .unwrap();

    match load_queries(dir.path(), "2026-03-01") {
        Err(DevToolsError::MalformedRecord { line, .. }) => assert_eq!(line, 2),
        other => panic!("Expected MalformedRecord, got {:?}", other),
    }
}

#[test]
fn test_unwritable_storage_does_not_lose_capture() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();

    let profiler = QueryProfiler::new(Some(Persistence::jsonl(&blocker)));
    assert!(profiler.record("SELECT 1", vec![], 1.0, None).is_some());
    assert_eq!(profiler.len(), 1);
}

#[test]
fn test_reload_into_fresh_devtools() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = DevToolsConfig::default();
    cfg.storage.enabled = true;
    cfg.storage.path = Some(dir.path().join("storage"));
    cfg.logs.path = Some(dir.path().join("logs"));

    let app = DevTools::from_config(&cfg);
    for path in ["/a", "/b", "/c"] {
        app.requests.record(RequestInfo::new("GET", path), Some(ResponseInfo::new(200)), 1.0, 0);
    }
    app.record_query(None, "SELECT * FROM orders", vec![], 250.0, Some("orders"));
    app.logs.log("orders", "error", "sync failed\nretrying", devtools::Context::new());

    let cli = DevTools::from_config(&cfg);
    let summary = cli.load_persisted(&cfg, &today()).unwrap();
    assert_eq!(summary.requests, 3);
    assert_eq!(summary.queries, 1);
    assert_eq!(summary.logs, 1);
    assert_eq!(cli.requests.len(), 3);

    let again = cli.load_persisted(&cfg, &today()).unwrap();
    assert_eq!((again.requests, again.queries, again.logs), (0, 0, 0));
    assert_eq!(cli.requests.len(), 3);
    assert_eq!(cli.queries.len(), 1);
    assert_eq!(cli.queries.statistics().slow_queries, 1);
    let logs = cli.logs.logs("orders", None, 10);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "sync failed\nretrying");

    app.load_persisted(&cfg, &today()).unwrap();
    assert_eq!(app.queries.len(), 1);
    assert_eq!(app.logs.logs("orders", None, 10).len(), 1);
}
