use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_AGENT_EMAIL: &str = "agent@finflow.com";
const DEFAULT_AGENT_NAME: &str = "Default Agent";
const DEVELOPMENT_AGENT_PASSWORD: &str = "admin123";
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_SESSION_TTL_MINUTES: i64 = 8 * 60;
pub const MAX_SESSION_TTL_MINUTES: i64 = 30 * 24 * 60;

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
    pub agents: AgentSeedConfig,
    pub sessions: SessionConfig,
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

        let max_body_bytes = match env::var("APP_MAX_BODY_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidBodyLimit)?,
            Err(_) => DEFAULT_MAX_BODY_BYTES,
        };

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let ttl_minutes = match env::var("APP_SESSION_TTL_MINUTES") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|value| (1..=MAX_SESSION_TTL_MINUTES).contains(value))
                .ok_or(ConfigError::InvalidSessionTtl)?,
            Err(_) => DEFAULT_SESSION_TTL_MINUTES,
        };

        let password = env::var("FINFLOW_AGENT_PASSWORD")
            .ok()
            .filter(|value| !value.is_empty())
            .or_else(|| match environment {
                AppEnvironment::Production => None,
                _ => Some(DEVELOPMENT_AGENT_PASSWORD.to_string()),
            });

        let agents = AgentSeedConfig {
            email: env::var("FINFLOW_AGENT_EMAIL")
                .unwrap_or_else(|_| DEFAULT_AGENT_EMAIL.to_string()),
            name: env::var("FINFLOW_AGENT_NAME").unwrap_or_else(|_| DEFAULT_AGENT_NAME.to_string()),
            password,
        };

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                max_body_bytes,
            },
            telemetry: TelemetryConfig { log_level },
            agents,
            sessions: SessionConfig { ttl_minutes },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Credentials for the agent account created at startup.
///
/// In production `password` is `None` unless `FINFLOW_AGENT_PASSWORD` is set.
/// Without a password, seeding is skipped.
#[derive(Clone)]
pub struct AgentSeedConfig {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
}

impl fmt::Debug for AgentSeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSeedConfig")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Lifetime of bearer tokens issued at agent login.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub ttl_minutes: i64,
}

impl SessionConfig {
    /// Token lifetime, clamped to `1..=MAX_SESSION_TTL_MINUTES`.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes.clamp(1, MAX_SESSION_TTL_MINUTES))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidBodyLimit,
    InvalidSessionTtl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidBodyLimit => {
                write!(f, "APP_MAX_BODY_BYTES must be a positive integer")
            }
            ConfigError::InvalidSessionTtl => {
                write!(
                    f,
                    "APP_SESSION_TTL_MINUTES must be between 1 and {MAX_SESSION_TTL_MINUTES}"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidBodyLimit
            | ConfigError::InvalidSessionTtl => None,
        }
    }
}
