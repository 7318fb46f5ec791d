use crate::clock::timestamp_format;
use crate::query::QueryEntry;
use crate::Context;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

/// The part of an inbound request the inspector keeps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
}

impl RequestInfo {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

/// The part of a response the inspector keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInfo {
    pub status_code: u16,
}

impl ResponseInfo {
    pub fn new(status_code: u16) -> Self {
        Self { status_code }
    }
}

/// Append-only collections attached to a request while it is handled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestDetails {
    #[serde(default)]
    pub queries: Vec<Context>,
    #[serde(default)]
    pub logs: Vec<Context>,
    #[serde(default)]
    pub events: Vec<Context>,
    #[serde(default)]
    pub data: Context,
}

impl RequestDetails {
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty() && self.logs.is_empty() && self.events.is_empty() && self.data.is_empty()
    }
}

/// Flat serialized form of a [`RequestEntry`], as persisted in `requests-<date>` files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: String,
    pub method: String,
    pub path: String,
    pub status_code: Option<u16>,
    pub duration: f64,
    pub memory_usage: u64,
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Local>,
    #[serde(flatten)]
    pub details: RequestDetails,
}

/// One observed HTTP request
///
/// Identity, request/response info, duration, memory usage and timestamp are fixed
/// at creation. Queries, logs, events and data may keep growing afterwards through
/// a shared handle; those additions are not written back to persisted files.
#[derive(Debug)]
pub struct RequestEntry {
    id: String,
    request: RequestInfo,
    response: Option<ResponseInfo>,
    duration: f64,
    memory_usage: u64,
    timestamp: DateTime<Local>,
    details: Mutex<RequestDetails>,
}

impl RequestEntry {
    pub fn new(
        id: impl Into<String>,
        request: RequestInfo,
        response: Option<ResponseInfo>,
        duration: f64,
        memory_usage: u64,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            id: id.into(),
            request,
            response,
            duration,
            memory_usage,
            timestamp,
            details: Mutex::new(RequestDetails::default()),
        }
    }

    pub fn from_record(record: RequestRecord) -> Self {
        Self {
            id: record.id,
            request: RequestInfo::new(record.method, record.path),
            response: record.status_code.map(ResponseInfo::new),
            duration: record.duration,
            memory_usage: record.memory_usage,
            timestamp: record.timestamp,
            details: Mutex::new(record.details),
        }
    }

    fn details(&self) -> MutexGuard<'_, RequestDetails> {
        self.details.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    pub fn response(&self) -> Option<&ResponseInfo> {
        self.response.as_ref()
    }

    pub fn status_code(&self) -> Option<u16> {
        self.response.map(|r| r.status_code)
    }

    /// Duration in milliseconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Memory usage in bytes
    pub fn memory_usage(&self) -> u64 {
        self.memory_usage
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn add_query(&self, query: Context) {
        self.details().queries.push(query);
    }

    /// Attach a profiled query in its serialized shape
    pub fn add_query_entry(&self, query: &QueryEntry) {
        self.add_query(query.to_context());
    }

    pub fn queries(&self) -> Vec<Context> {
        self.details().queries.clone()
    }

    pub fn add_log(&self, log: Context) {
        self.details().logs.push(log);
    }

    pub fn logs(&self) -> Vec<Context> {
        self.details().logs.clone()
    }

    pub fn add_event(&self, event: Context) {
        self.details().events.push(event);
    }

    pub fn events(&self) -> Vec<Context> {
        self.details().events.clone()
    }

    pub fn set_data(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.details().data.insert(key.into(), value.into());
    }

    pub fn data(&self, key: &str) -> Option<Value> {
        self.details().data.get(key).cloned()
    }

    pub fn all_data(&self) -> Context {
        self.details().data.clone()
    }

    /// Merge collections gathered elsewhere (e.g. during request handling)
    pub fn absorb(&self, gathered: RequestDetails) {
        let mut details = self.details();
        details.queries.extend(gathered.queries);
        details.logs.extend(gathered.logs);
        details.events.extend(gathered.events);
        details.data.extend(gathered.data);
    }

    pub fn to_record(&self) -> RequestRecord {
        RequestRecord {
            id: self.id.clone(),
            method: self.request.method.clone(),
            path: self.request.path.clone(),
            status_code: self.status_code(),
            duration: self.duration,
            memory_usage: self.memory_usage,
            timestamp: self.timestamp,
            details: self.details().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn entry() -> RequestEntry {
        RequestEntry::new(
            "req_1",
            RequestInfo::new("GET", "/api/users/5"),
            Some(ResponseInfo::new(200)),
            12.5,
            2 * 1024 * 1024,
            Local.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
        )
    }

    fn fields(value: Value) -> Context {
        match value {
            Value::Object(map) => map,
            _ => panic!("Expected object"),
        }
    }

    #[test]
    fn test_sub_collections_grow_in_order() {
        let entry = entry();
        entry.add_log(fields(json!({"level": "info", "message": "first"})));
        entry.add_log(fields(json!({"level": "info", "message": "second"})));
        entry.add_event(fields(json!({"name": "user.viewed"})));
        entry.set_data("user_id", 5);
        entry.set_data("user_id", 6);

        let logs = entry.logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1]["message"], "second");
        assert_eq!(entry.events().len(), 1);
        assert_eq!(entry.data("user_id"), Some(json!(6)));
        assert_eq!(entry.data("missing"), None);
        assert_eq!(entry.all_data().len(), 1);
    }

    #[test]
    fn test_record_shape() {
        let entry = entry();
        entry.add_query(fields(json!({"sql": "SELECT 1"})));

        let value = serde_json::to_value(entry.to_record()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            [
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
                "data"
            ]
        );
        assert_eq!(value["status_code"], 200);
        assert_eq!(value["timestamp"], "2026-03-01 10:00:00");
        assert_eq!(value["queries"][0]["sql"], "SELECT 1");
    }

    #[test]
    fn test_record_without_response() {
        let entry = RequestEntry::new(
            "req_2",
            RequestInfo::new("POST", "/login"),
            None,
            0.0,
            0,
            Local.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
        );
        let record = entry.to_record();
        assert_eq!(record.status_code, None);

        let restored = RequestEntry::from_record(record);
        assert!(restored.response().is_none());
        assert_eq!(restored.request().path, "/login");
    }

    #[test]
    fn test_absorb_merges_details() {
        let entry = entry();
        entry.set_data("a", 1);

        let mut gathered = RequestDetails::default();
        gathered.events.push(fields(json!({"name": "cache.miss"})));
        gathered.data.insert("b".to_string(), json!(2));
        entry.absorb(gathered);

        assert_eq!(entry.events().len(), 1);
        assert_eq!(entry.data("a"), Some(json!(1)));
        assert_eq!(entry.data("b"), Some(json!(2)));
    }
}
