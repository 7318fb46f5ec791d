use crate::error::{DevToolsError, DevToolsResult};
use crate::persistence::{Persistence, PersistenceFormat};
use crate::query::DEFAULT_SLOW_QUERY_THRESHOLD_MS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `DEVTOOLS__STORAGE__PATH=/var/devtools`
pub const ENV_PREFIX: &str = "DEVTOOLS";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DevToolsConfig {
    /// Initial capture state of the request inspector and query profiler
    pub enabled: bool,
    pub slow_query_threshold_ms: f64,
    pub storage: StorageConfig,
    pub logs: LogConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub enabled: bool,
    pub path: Option<PathBuf>,
    pub format: PersistenceFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory for `<module>-<date>.log` files
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub output: PathBuf,
    pub recent_requests: usize,
}

impl Default for DevToolsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            slow_query_threshold_ms: DEFAULT_SLOW_QUERY_THRESHOLD_MS,
            storage: StorageConfig::default(),
            logs: LogConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("devtools-dashboard.html"),
            recent_requests: 20,
        }
    }
}

impl StorageConfig {
    /// Persistence settings, or `None` when storage is off
    pub fn persistence(&self) -> Option<Persistence> {
        if !self.enabled {
            return None;
        }
        self.path
            .as_ref()
            .map(|path| Persistence::new(path.clone(), self.format))
    }
}

/// Load configuration from an optional file plus `DEVTOOLS__*` environment overrides
pub fn load_config(path: &Path) -> anyhow::Result<DevToolsConfig> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let cfg: DevToolsConfig = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &DevToolsConfig) -> DevToolsResult<()> {
    if cfg.storage.enabled {
        match &cfg.storage.path {
            Some(path) if !path.as_os_str().is_empty() => {}
            _ => {
                return Err(DevToolsError::Config(
                    "storage.path must be set when storage is enabled".to_string(),
                ))
            }
        }
    }

    if !cfg.slow_query_threshold_ms.is_finite() || cfg.slow_query_threshold_ms < 0.0 {
        return Err(DevToolsError::Config(format!(
            "slow_query_threshold_ms must be a non-negative number, got {}",
            cfg.slow_query_threshold_ms
        )));
    }

    if cfg.dashboard.recent_requests == 0 {
        return Err(DevToolsError::Config(
            "dashboard.recent_requests must be greater than zero".to_string(),
        ));
    }

    if let Some(path) = &cfg.logs.path {
        if path.as_os_str().is_empty() {
            return Err(DevToolsError::Config("logs.path cannot be empty".to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = DevToolsConfig::default();
        assert!(validate_config(&cfg).is_ok());
        assert!(cfg.enabled);
        assert_eq!(cfg.slow_query_threshold_ms, 100.0);
        assert_eq!(cfg.dashboard.output, PathBuf::from("devtools-dashboard.html"));
        assert!(cfg.storage.persistence().is_none());
    }

    #[test]
    fn test_validate_config_requires_storage_path() {
        let mut cfg = DevToolsConfig::default();
        cfg.storage.enabled = true;

        let result = validate_config(&cfg);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("storage.path must be set"));
    }

    #[test]
    fn test_validate_config_rejects_negative_threshold() {
        let mut cfg = DevToolsConfig::default();
        cfg.slow_query_threshold_ms = -1.0;
        assert!(validate_config(&cfg).is_err());

        cfg.slow_query_threshold_ms = f64::NAN;
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
slow_query_threshold_ms = 250.0

[storage]
enabled = true
path = "/var/lib/devtools"
format = "json"

[dashboard]
recent_requests = 5
"#
        )
        .unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.slow_query_threshold_ms, 250.0);
        assert_eq!(cfg.dashboard.recent_requests, 5);
        assert_eq!(cfg.dashboard.output, PathBuf::from("devtools-dashboard.html"));

        let persistence = cfg.storage.persistence().unwrap();
        assert_eq!(persistence.dir, PathBuf::from("/var/lib/devtools"));
        assert_eq!(persistence.format, PersistenceFormat::Json);
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.dashboard.recent_requests, 20);
    }
}
