pub mod clock;
pub mod config;
pub mod dashboard;
pub mod devtools;
pub mod error;
pub mod memory;
pub mod middleware;
pub mod module_log;
pub mod persistence;
pub mod query;
pub mod request;

pub use crate::devtools::{DevTools, LoadSummary};
pub use dashboard::DevToolsDashboard;
pub use error::{DevToolsError, DevToolsResult};
pub use middleware::{record_requests, RequestTrace, REQUEST_ID_HEADER};
pub use module_log::{ModuleLogEntry, ModuleLogLayer, ModuleLogView};
pub use query::{QueryEntry, QueryProfiler, QueryStatistics};
pub use request::{RequestEntry, RequestInfo, RequestInspector, ResponseInfo};

use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Free-form context and data attached to log entries and requests, in insertion order
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Initialize tracing/logging
///
/// Note: This function can only be called once.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

/// Initialize tracing with application events also mirrored into a module log view
///
/// # Arguments
///
/// * `view` - The view receiving one entry per event, grouped by target module
///
/// # Notes
///
/// Like [`init_tracing`], this installs the global subscriber and can only succeed once.
/// If a subscriber is already installed, a warning is printed and the view stays empty.
pub fn init_tracing_with_module_logs(view: Arc<ModuleLogView>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(ModuleLogLayer::new(view));

    match tracing::subscriber::set_global_default(subscriber) {
        Ok(_) => {
            tracing::info!("Module log layer added to tracing subscriber");
        }
        Err(e) => {
            eprintln!("Warning: Failed to add module log layer: {}", e);
            eprintln!("Application events will not appear in module logs");
        }
    }
}
