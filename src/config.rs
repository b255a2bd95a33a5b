use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {var}: {reason}")]
    InvalidEnvValue { var: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace opened at start-up; without it the host must send `workspace.select`.
    pub workspace: Option<PathBuf>,
    pub log_filter: String,
    pub default_uploader: String,
    pub busy_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            log_filter: "info".to_string(),
            default_uploader: "admin".to_string(),
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

fn non_empty_var(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let busy_timeout = match non_empty_var("RAILEDU_BUSY_TIMEOUT_MS") {
            Some(v) => {
                let ms = v.parse::<u64>().map_err(|e| ConfigError::InvalidEnvValue {
                    var: "RAILEDU_BUSY_TIMEOUT_MS".to_string(),
                    reason: e.to_string(),
                })?;
                Duration::from_millis(ms)
            }
            None => defaults.busy_timeout,
        };

        let log_filter = match non_empty_var("RAILEDU_LOG") {
            Some(v) => {
                EnvFilter::try_new(&v).map_err(|e| ConfigError::InvalidEnvValue {
                    var: "RAILEDU_LOG".to_string(),
                    reason: e.to_string(),
                })?;
                v
            }
            None => defaults.log_filter,
        };

        Ok(Self {
            workspace: non_empty_var("RAILEDU_WORKSPACE").map(PathBuf::from),
            log_filter,
            default_uploader: non_empty_var("RAILEDU_DEFAULT_UPLOADER")
                .unwrap_or(defaults.default_uploader),
            busy_timeout,
        })
    }
}
