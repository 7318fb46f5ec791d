//! axum middleware recording every request into the inspector
//!
//! Handlers reach the per-request collector through the `Extension<RequestTrace>`
//! extractor:
//!
//! ```ignore
//! async fn list_users(
//!     State(devtools): State<Arc<DevTools>>,
//!     Extension(trace): Extension<RequestTrace>,
//! ) -> Json<Vec<User>> {
//!     let started = Instant::now();
//!     let users = db.fetch_users().await;
//!     devtools.record_query(Some(&trace), "SELECT * FROM users", vec![], ms(started), Some("users"));
//!     Json(users)
//! }
//! ```

use crate::devtools::DevTools;
use crate::query::QueryEntry;
use crate::request::{RequestDetails, RequestInfo, ResponseInfo};
use crate::Context;
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Response header carrying the id of the stored request entry
pub const REQUEST_ID_HEADER: &str = "x-devtools-request-id";

/// Queries, logs, events and data collected while one request is handled
#[derive(Debug, Clone, Default)]
pub struct RequestTrace {
    details: Arc<Mutex<RequestDetails>>,
}

impl RequestTrace {
    fn details(&self) -> MutexGuard<'_, RequestDetails> {
        self.details.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_query(&self, query: Context) {
        self.details().queries.push(query);
    }

    pub fn add_query_entry(&self, query: &QueryEntry) {
        self.add_query(query.to_context());
    }

    pub fn add_log(&self, log: Context) {
        self.details().logs.push(log);
    }

    pub fn add_event(&self, event: Context) {
        self.details().events.push(event);
    }

    pub fn set_data(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.details().data.insert(key.into(), value.into());
    }

    /// Move out everything collected so far
    pub fn take(&self) -> RequestDetails {
        std::mem::take(&mut *self.details())
    }
}

/// Record the request once the inner service has produced a response
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .route("/users", get(list_users))
///     .layer(middleware::from_fn_with_state(devtools.clone(), record_requests))
///     .with_state(devtools);
/// ```
pub async fn record_requests(
    State(devtools): State<Arc<DevTools>>,
    mut req: Request,
    next: Next,
) -> Response {
    let request = RequestInfo::new(req.method().as_str(), req.uri().path());
    let trace = RequestTrace::default();
    req.extensions_mut().insert(trace.clone());

    let start = Instant::now();
    let mut response = next.run(req).await;
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    let entry = devtools.requests.record_with_details(
        request,
        Some(ResponseInfo::new(response.status().as_u16())),
        duration_ms,
        devtools.memory_usage(),
        trace.take(),
    );

    if devtools.requests.entry(entry.id()).is_some() {
        if let Ok(value) = HeaderValue::from_str(entry.id()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
    }

    response
}
