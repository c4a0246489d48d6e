use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
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
    pub assessor: AssessorConfig,
    pub registry: RegistryConfig,
    pub matching: MatchingConfig,
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

        let assessor = AssessorConfig {
            api_key: env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty()),
            base_url: env::var("ASSESSOR_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: env::var("ASSESSOR_MODEL").unwrap_or_else(|_| "gpt-4-turbo".to_string()),
            temperature: parse_env("ASSESSOR_TEMPERATURE", 0.2)?,
            timeout_secs: parse_env("ASSESSOR_TIMEOUT_SECS", 60)?,
        };

        let registry = RegistryConfig {
            base_url: env::var("REGISTRY_BASE_URL")
                .unwrap_or_else(|_| "https://clinicaltrials.gov/api/v2".to_string()),
            page_size: parse_env("REGISTRY_PAGE_SIZE", 20)?,
            status_filter: match env::var("REGISTRY_STATUS_FILTER") {
                Ok(value) if value.trim().is_empty() => None,
                Ok(value) => Some(value),
                Err(_) => Some("RECRUITING".to_string()),
            },
            timeout_secs: parse_env("REGISTRY_TIMEOUT_SECS", 30)?,
        };

        let matching = MatchingConfig {
            chunk_size: parse_env("MATCH_CHUNK_SIZE", 5)?,
            pacing_ms: parse_env("MATCH_PACING_MS", 500)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            assessor,
            registry,
            matching,
        })
    }
}

fn parse_env<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var }),
        Err(_) => Ok(default),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Settings for the LLM criteria assessor backend.
#[derive(Debug, Clone)]
pub struct AssessorConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl AssessorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for the clinical trials registry client.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    pub page_size: u16,
    pub status_filter: Option<String>,
    pub timeout_secs: u64,
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Batch fan-out and pacing knobs.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub chunk_size: usize,
    pub pacing_ms: u64,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { var: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { var } => {
                write!(f, "{var} must be a valid number")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for var in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "OPENAI_API_KEY",
            "ASSESSOR_BASE_URL",
            "ASSESSOR_MODEL",
            "ASSESSOR_TEMPERATURE",
            "ASSESSOR_TIMEOUT_SECS",
            "REGISTRY_BASE_URL",
            "REGISTRY_PAGE_SIZE",
            "REGISTRY_STATUS_FILTER",
            "REGISTRY_TIMEOUT_SECS",
            "MATCH_CHUNK_SIZE",
            "MATCH_PACING_MS",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.assessor.model, "gpt-4-turbo");
        assert_eq!(config.assessor.api_key, None);
        assert_eq!(config.registry.page_size, 20);
        assert_eq!(config.registry.status_filter.as_deref(), Some("RECRUITING"));
        assert_eq!(config.matching.chunk_size, 5);
        assert_eq!(config.matching.pacing_ms, 500);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        env::remove_var("APP_HOST");
    }

    #[test]
    fn empty_status_filter_disables_it() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REGISTRY_STATUS_FILTER", "");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.registry.status_filter, None);
        env::remove_var("REGISTRY_STATUS_FILTER");
    }

    #[test]
    fn rejects_unparseable_chunk_size() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("MATCH_CHUNK_SIZE", "many");
        let err = AppConfig::load().expect_err("must fail");
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                var: "MATCH_CHUNK_SIZE"
            }
        ));
        env::remove_var("MATCH_CHUNK_SIZE");
    }
}
