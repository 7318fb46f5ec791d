//! HTTP request recording

pub mod entry;
pub mod inspector;

pub use entry::{RequestDetails, RequestEntry, RequestInfo, RequestRecord, ResponseInfo};
pub use inspector::{load_requests, RequestInspector, DEFAULT_RECENT_LIMIT};
