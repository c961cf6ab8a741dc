use crate::domain::entities::BusinessHourType;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub otel_exporter_endpoint: Option<String>,
    pub service_name: String,
    pub metrics_port: u16,
    pub routing: RoutingSettings,
}

/// Routing settings handed to the evaluator and the selector at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingSettings {
    pub business_hours_enabled: bool,
    pub business_hour_type: BusinessHourType,
    pub recheck_interval: Duration,
    pub storage_timeout: Duration,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            business_hours_enabled: true,
            business_hour_type: BusinessHourType::Custom,
            recheck_interval: Duration::from_secs(60),
            storage_timeout: Duration::from_millis(2000),
        }
    }
}

impl RoutingSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = RoutingSettings::default();

        let business_hours_enabled = match env::var("LIVECHAT_BUSINESS_HOURS_ENABLED") {
            Ok(value) => parse_bool(&value).ok_or(ConfigError::InvalidBusinessHoursFlag(value))?,
            Err(_) => defaults.business_hours_enabled,
        };

        let business_hour_type = match env::var("LIVECHAT_BUSINESS_HOUR_TYPE") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidBusinessHourType(value))?,
            Err(_) => defaults.business_hour_type,
        };

        let recheck_interval = parse_positive_duration(
            env::var("AVAILABILITY_RECHECK_SECONDS").ok(),
            Duration::from_secs,
            defaults.recheck_interval,
            ConfigError::InvalidRecheckInterval,
        )?;

        let storage_timeout = parse_positive_duration(
            env::var("ROUTING_STORAGE_TIMEOUT_MS").ok(),
            Duration::from_millis,
            defaults.storage_timeout,
            ConfigError::InvalidStorageTimeout,
        )?;

        Ok(RoutingSettings {
            business_hours_enabled,
            business_hour_type,
            recheck_interval,
            storage_timeout,
        })
    }
}

/// Unset falls back to `default`; zero and non-integers are rejected
fn parse_positive_duration(
    value: Option<String>,
    unit: fn(u64) -> Duration,
    default: Duration,
    error: ConfigError,
) -> Result<Duration, ConfigError> {
    let duration = match value {
        Some(value) => value.trim().parse::<u64>().ok().map(unit),
        None => Some(default),
    };
    duration.filter(|d| !d.is_zero()).ok_or(error)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://oxidesk-routing.db?mode=rwc".to_string());

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let otel_exporter_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();

        let service_name =
            env::var("SERVICE_NAME").unwrap_or_else(|_| "oxidesk-routing".to_string());

        let metrics_port = env::var("METRICS_PORT")
            .unwrap_or_else(|_| "9000".to_string())
            .parse()
            .unwrap_or(9000);

        Ok(Config {
            database_url,
            server_host,
            server_port,
            otel_exporter_endpoint,
            service_name,
            metrics_port,
            routing: RoutingSettings::from_env()?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Shared, observable routing settings.
///
/// Replacing the settings notifies every subscriber; the settings listener
/// reacts with a full availability refresh.
#[derive(Clone, Debug)]
pub struct SettingsHandle {
    tx: Arc<watch::Sender<RoutingSettings>>,
}

impl SettingsHandle {
    pub fn new(settings: RoutingSettings) -> Self {
        let (tx, _rx) = watch::channel(settings);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> RoutingSettings {
        self.tx.borrow().clone()
    }

    pub fn storage_timeout(&self) -> Duration {
        self.tx.borrow().storage_timeout
    }

    /// Replace the settings; subscribers are only woken if something changed
    pub fn update(&self, settings: RoutingSettings) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == settings {
                false
            } else {
                *current = settings;
                true
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<RoutingSettings> {
        self.tx.subscribe()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid LIVECHAT_BUSINESS_HOURS_ENABLED value: {0}")]
    InvalidBusinessHoursFlag(String),

    #[error("Invalid LIVECHAT_BUSINESS_HOUR_TYPE value: {0} (expected single or custom)")]
    InvalidBusinessHourType(String),

    #[error("AVAILABILITY_RECHECK_SECONDS must be a positive integer")]
    InvalidRecheckInterval,

    #[error("ROUTING_STORAGE_TIMEOUT_MS must be a positive integer")]
    InvalidStorageTimeout,
}
