use std::path::PathBuf;
use thiserror::Error;

/// Devtools error types
#[derive(Debug, Error)]
pub enum DevToolsError {
    /// Filesystem error while persisting or loading records
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Record could not be encoded or decoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
    /// Dashboard has no data source to render from
    #[error("Dashboard not available: {0}")]
    DashboardUnavailable(String),
    /// A persisted record could not be parsed back
    #[error("Malformed record in {path} at line {line}: {reason}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

impl DevToolsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-readable name, used as a structured logging field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
            Self::DashboardUnavailable(_) => "dashboard_unavailable",
            Self::MalformedRecord { .. } => "malformed_record",
        }
    }
}

pub type DevToolsResult<T> = Result<T, DevToolsError>;
