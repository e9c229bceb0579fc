use once_cell::sync::Lazy;
use secrecy::SecretString;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::report::{ServiceAccountKey, SpreadsheetTarget};

/// Database file path
/// Read from DATABASE_PATH environment variable
/// Default: data.db
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("DATABASE_PATH").unwrap_or_else(|_| "data.db".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Log level filter (error, warn, info, debug, trace)
/// Read from LOG_LEVEL environment variable
/// Default: info
pub static LOG_LEVEL: Lazy<String> = Lazy::new(|| env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

/// Spreadsheet title used when SPREADSHEET_ID is not set
pub const DEFAULT_SPREADSHEET_NAME: &str = "Delulu Data Invite";

/// Default bind address of the liveness endpoint
pub const DEFAULT_LIVENESS_ADDR: &str = "0.0.0.0:8080";

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for outgoing HTTP requests (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Runtime configuration for the bot process
///
/// Built once in `main` and handed to the components that need it. Secrets are
/// wrapped in [`SecretString`] so they never end up in `Debug` output.
#[derive(Debug)]
pub struct Config {
    pub bot_token: SecretString,
    pub bot_api_url: Option<Url>,
    pub group_id: i64,
    pub google_credentials: ServiceAccountKey,
    pub spreadsheet: SpreadsheetTarget,
    pub liveness_addr: SocketAddr,
}

impl Config {
    /// Reads configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads configuration through an arbitrary lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("BOT_TOKEN")
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let bot_api_url = get("BOT_API_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                    var: "BOT_API_URL",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let group_id = get("GROUP_ID")
            .ok_or(ConfigError::Missing("GROUP_ID"))?
            .trim()
            .parse::<i64>()
            .map_err(|e| ConfigError::Invalid {
                var: "GROUP_ID",
                reason: e.to_string(),
            })?;

        let creds_json = get("GOOGLE_CREDS_JSON").ok_or(ConfigError::Missing("GOOGLE_CREDS_JSON"))?;
        let google_credentials = ServiceAccountKey::from_json(&creds_json).map_err(|e| ConfigError::Invalid {
            var: "GOOGLE_CREDS_JSON",
            reason: e.to_string(),
        })?;

        let spreadsheet = match get("SPREADSHEET_ID") {
            Some(id) => SpreadsheetTarget::by_id(id),
            None => SpreadsheetTarget::by_name(
                get("SPREADSHEET_NAME").unwrap_or_else(|| DEFAULT_SPREADSHEET_NAME.to_string()),
            ),
        }
        .with_worksheet(get("WORKSHEET_TITLE"));

        let liveness_addr = liveness_addr(get("LIVENESS_ADDR"), get("PORT"))?;

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            bot_api_url,
            group_id,
            google_credentials,
            spreadsheet,
            liveness_addr,
        })
    }
}

/// LIVENESS_ADDR wins over PORT; PORT binds on all interfaces.
fn liveness_addr(explicit: Option<String>, port: Option<String>) -> Result<SocketAddr, ConfigError> {
    if let Some(addr) = explicit {
        return addr.trim().parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            var: "LIVENESS_ADDR",
            reason: e.to_string(),
        });
    }

    if let Some(port) = port {
        let port = port.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
            var: "PORT",
            reason: e.to_string(),
        })?;
        return Ok(SocketAddr::from(([0, 0, 0, 0], port)));
    }

    DEFAULT_LIVENESS_ADDR.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
        var: "LIVENESS_ADDR",
        reason: e.to_string(),
    })
}
