use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::membership::UserId;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakeConfig,
    pub sync: Option<SyncConfig>,
}

impl AppConfig {
    /// Loads and validates the whole configuration surface. Missing required
    /// values are fatal here, never at request time.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            intake: IntakeConfig::load()?,
            sync: SyncConfig::load()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Intake workflow settings: transport credential, administrator set, store
/// location, and the optional community invite link.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub transport_token: String,
    pub admin_ids: Vec<UserId>,
    pub storage_path: PathBuf,
    pub invite_link: Option<String>,
}

impl IntakeConfig {
    fn load() -> Result<Self, ConfigError> {
        let transport_token = env::var("TRANSPORT_TOKEN").unwrap_or_default();
        if transport_token.trim().is_empty() {
            return Err(ConfigError::MissingTransportToken);
        }

        let raw_admins = env::var("ADMIN_IDS").unwrap_or_default();
        let admin_ids = parse_admin_ids(&raw_admins)?;
        if admin_ids.is_empty() {
            return Err(ConfigError::MissingAdmins);
        }

        let storage_path = env::var("STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/applications.json"));

        let invite_link = env::var("INVITE_LINK").ok().filter(|link| !link.trim().is_empty());

        Ok(Self {
            transport_token,
            admin_ids,
            storage_path,
            invite_link,
        })
    }
}

/// External knowledge-base settings. The three credentials travel together:
/// a partially configured group is a startup error, a fully absent one simply
/// disables sync.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub base_url: String,
    pub api_token: String,
    pub collection_id: String,
    /// Logical field name to external field id; empty means pass-through.
    pub field_map: BTreeMap<String, String>,
}

impl SyncConfig {
    fn load() -> Result<Option<Self>, ConfigError> {
        let base_url = non_empty_env("KB_BASE_URL");
        let api_token = non_empty_env("KB_API_TOKEN");
        let collection_id = non_empty_env("KB_COLLECTION_ID");

        let (base_url, api_token, collection_id) = match (base_url, api_token, collection_id) {
            (None, None, None) => return Ok(None),
            (Some(base_url), Some(api_token), Some(collection_id)) => {
                (base_url, api_token, collection_id)
            }
            _ => return Err(ConfigError::IncompleteSyncGroup),
        };

        let field_map = match non_empty_env("KB_FIELD_MAP") {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|source| ConfigError::InvalidFieldMap { source })?,
            None => BTreeMap::new(),
        };

        Ok(Some(Self {
            base_url,
            api_token,
            collection_id,
            field_map,
        }))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_admin_ids(raw: &str) -> Result<Vec<UserId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<i64>()
                .map(UserId)
                .map_err(|_| ConfigError::InvalidAdminId {
                    value: item.to_string(),
                })
        })
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingTransportToken,
    MissingAdmins,
    InvalidAdminId { value: String },
    IncompleteSyncGroup,
    InvalidFieldMap { source: serde_json::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingTransportToken => {
                write!(f, "TRANSPORT_TOKEN must be set for the front-end transport")
            }
            ConfigError::MissingAdmins => {
                write!(f, "ADMIN_IDS must list at least one administrator id")
            }
            ConfigError::InvalidAdminId { value } => {
                write!(f, "ADMIN_IDS entry '{value}' is not a valid integer id")
            }
            ConfigError::IncompleteSyncGroup => write!(
                f,
                "KB_BASE_URL, KB_API_TOKEN, and KB_COLLECTION_ID must be set together or not at all"
            ),
            ConfigError::InvalidFieldMap { .. } => {
                write!(f, "KB_FIELD_MAP must be a JSON object of logical name to field id")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidFieldMap { source } => Some(source),
            _ => None,
        }
    }
}
