//! Connection and backend-selection configuration.
//!
//! The remote backend is configured by a single connection string of the
//! form `key1=value1;key2=value2;...`. Parsing is pure and idempotent: the
//! client parses once at construction time and owns the resulting
//! [`ConnectionConfig`], so there is no hidden global state to guard.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::backend::BackendKind;

const ACCOUNT_NAME_KEY: &str = "AccountName";
const ACCOUNT_KEY_KEY: &str = "AccountKey";
const PROTOCOL_KEY: &str = "DefaultEndpointsProtocol";
const ENDPOINT_SUFFIX_KEY: &str = "EndpointSuffix";
const REGION_KEY: &str = "Region";

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "s3.amazonaws.com";
const DEFAULT_REGION: &str = "us-east-1";

/// Environment variable holding the remote connection string.
pub const CONNECTION_STRING_ENV: &str = "STORAGE_CONNECTION_STRING";

/// Configuration failures. Fatal: surfaced immediately, never retried.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Parsed remote-store connection string.
///
/// Required keys: `AccountName` and `AccountKey`. The `AccountKey` value is
/// taken verbatim after the first `=`, since key material may itself
/// contain `=` padding.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub account_name: String,
    pub account_key: String,
    pub protocol: String,
    pub endpoint_suffix: String,
    pub region: String,
}

impl ConnectionConfig {
    /// Parses `key1=value1;key2=value2;...`; empty segments are ignored.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Err(ConfigError::Missing("connection string is empty".to_string()));
        }

        let mut account_name = None;
        let mut account_key = None;
        let mut protocol = None;
        let mut endpoint_suffix = None;
        let mut region = None;

        for segment in raw.split(';').filter(|s| !s.trim().is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                ConfigError::Invalid(format!("connection string segment without '=': {segment}"))
            })?;

            match key.trim() {
                ACCOUNT_NAME_KEY => account_name = Some(value.to_string()),
                // Verbatim after the first '=': the key may contain '='.
                ACCOUNT_KEY_KEY => account_key = Some(value.to_string()),
                PROTOCOL_KEY => protocol = Some(value.to_string()),
                ENDPOINT_SUFFIX_KEY => endpoint_suffix = Some(value.to_string()),
                REGION_KEY => region = Some(value.to_string()),
                // Unknown keys are tolerated so connection strings written
                // for other tooling keep working.
                _ => {}
            }
        }

        let account_name = account_name
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid(format!("connection string is missing {ACCOUNT_NAME_KEY}"))
            })?;
        let account_key = account_key
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid(format!("connection string is missing {ACCOUNT_KEY_KEY}"))
            })?;

        Ok(ConnectionConfig {
            account_name,
            account_key,
            protocol: protocol.unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
            endpoint_suffix: endpoint_suffix.unwrap_or_else(|| DEFAULT_ENDPOINT_SUFFIX.to_string()),
            region: region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
        })
    }

    /// Reads `STORAGE_CONNECTION_STRING` from the environment (a `.env`
    /// file is honored).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let raw = env::var(CONNECTION_STRING_ENV).map_err(|_| {
            ConfigError::Missing(format!("{CONNECTION_STRING_ENV} is not set"))
        })?;
        Self::parse(&raw)
    }

    /// Account-scoped service endpoint: `{protocol}://{account}.{suffix}`.
    pub fn endpoint(&self) -> String {
        format!(
            "{}://{}.{}",
            self.protocol, self.account_name, self.endpoint_suffix
        )
    }
}

// Manual Debug so account key material never lands in logs.
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("protocol", &self.protocol)
            .field("endpoint_suffix", &self.endpoint_suffix)
            .field("region", &self.region)
            .finish()
    }
}

/// Backend selection plus the values each backend needs; consumed by the
/// factory in the storage crate.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub backend: BackendKind,
    /// Remote backend only.
    pub connection_string: Option<String>,
    /// Local backend only: base directory all roots live under.
    pub local_root: Option<PathBuf>,
}

impl StoreConfig {
    /// Sourced from `STORAGE_BACKEND`, `STORAGE_CONNECTION_STRING` and
    /// `LOCAL_STORAGE_PATH`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => BackendKind::from_str(&value)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?,
            Err(_) => BackendKind::Remote,
        };

        Ok(StoreConfig {
            backend,
            connection_string: env::var(CONNECTION_STRING_ENV).ok(),
            local_root: env::var("LOCAL_STORAGE_PATH").ok().map(PathBuf::from),
        })
    }
}
