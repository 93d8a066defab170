use crate::reference::ReferenceSource;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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
    pub calculator: CalculatorConfig,
    pub reference: ReferenceConfig,
}

impl AppConfig {
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

        let endpoint = env::var("NOISE_CALCULATOR_URL")
            .unwrap_or_else(|_| "http://localhost:8000/calculate".to_string());
        let calculator = CalculatorConfig::new(endpoint)?;
        let timeout_secs = env::var("NOISE_CALCULATOR_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout)?;
        let calculator = CalculatorConfig {
            timeout: Duration::from_secs(timeout_secs),
            ..calculator
        };

        let reference = ReferenceConfig {
            guidance: source_from_env("NOISE_GUIDANCE_SOURCE", "data/wizard-data.json"),
            scenarios: source_from_env("NOISE_SCENARIOS_SOURCE", "data/scenarios.json"),
            plants: source_from_env("NOISE_PLANTS_SOURCE", "data/plants.json"),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            calculator,
            reference,
        })
    }
}

fn source_from_env(key: &str, default: &str) -> ReferenceSource {
    ReferenceSource::parse(&env::var(key).unwrap_or_else(|_| default.to_string()))
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

/// Where and how to reach the external calculation service.
#[derive(Debug, Clone)]
pub struct CalculatorConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl CalculatorConfig {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ConfigError> {
        let endpoint = endpoint.into().trim().to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidCalculatorUrl(endpoint));
        }

        Ok(Self {
            endpoint,
            timeout: Duration::from_secs(30),
        })
    }
}

/// Sources for the three read-only lookup tables.
#[derive(Debug, Clone)]
pub struct ReferenceConfig {
    pub guidance: ReferenceSource,
    pub scenarios: ReferenceSource,
    pub plants: ReferenceSource,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidCalculatorUrl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => write!(
                f,
                "NOISE_CALCULATOR_TIMEOUT_SECS must be a positive number of seconds"
            ),
            ConfigError::InvalidCalculatorUrl(value) => write!(
                f,
                "NOISE_CALCULATOR_URL must be an http(s) URL, got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidCalculatorUrl(_) => None,
        }
    }
}

/// Serializes tests that read or write process environment variables.
#[cfg(test)]
pub(crate) fn env_guard() -> &'static std::sync::Mutex<()> {
    static GUARD: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    GUARD.get_or_init(|| std::sync::Mutex::new(()))
}
