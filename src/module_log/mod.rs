//! Module-scoped log lines

pub mod layer;
pub mod view;

pub use layer::ModuleLogLayer;
pub use view::{load_module_logs, ModuleLogEntry, ModuleLogView, DEFAULT_LOG_LIMIT};
