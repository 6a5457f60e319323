use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Contract paths exposed by the external decision services.
pub const RISK_SCORING_PATH: &str = "/api/assess-risk";
pub const CREDIT_CALCULATION_PATH: &str = "/api/calculate-credit";
pub const NOTIFICATION_PATH: &str = "/api/send-approval";

const DEFAULT_COLLABORATOR_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_COLLABORATOR_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;

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
    pub collaborators: CollaboratorConfig,
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

        let session_idle_secs = match env::var("APP_SESSION_IDLE_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidSessionIdle)?,
            Err(_) => DEFAULT_SESSION_IDLE_SECS,
        };

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                session_idle_secs,
            },
            telemetry: TelemetryConfig { log_level },
            collaborators: CollaboratorConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Sessions untouched for this long are dropped from the registry.
    pub session_idle_secs: u64,
}

impl ServerConfig {
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

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

/// Endpoints of the risk-scoring, credit-calculation and notification services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorConfig {
    pub risk_scoring_url: String,
    pub credit_calculation_url: String,
    pub notification_url: String,
    pub timeout_secs: u64,
}

impl CollaboratorConfig {
    /// Derive all three endpoints from a shared base URL.
    pub fn from_base_url(base_url: &str) -> Self {
        let base = base_url.trim().trim_end_matches('/');
        Self {
            risk_scoring_url: format!("{base}{RISK_SCORING_PATH}"),
            credit_calculation_url: format!("{base}{CREDIT_CALCULATION_PATH}"),
            notification_url: format!("{base}{NOTIFICATION_PATH}"),
            timeout_secs: DEFAULT_COLLABORATOR_TIMEOUT_SECS,
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("APP_COLLABORATOR_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_COLLABORATOR_BASE_URL.to_string());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidCollaboratorUrl {
                variable: "APP_COLLABORATOR_BASE_URL",
                value: base_url,
            });
        }

        let mut config = Self::from_base_url(&base_url);
        config.risk_scoring_url = url_override("APP_RISK_SCORING_URL", config.risk_scoring_url)?;
        config.credit_calculation_url =
            url_override("APP_CREDIT_CALCULATION_URL", config.credit_calculation_url)?;
        config.notification_url = url_override("APP_NOTIFICATION_URL", config.notification_url)?;

        if let Ok(raw) = env::var("APP_COLLABORATOR_TIMEOUT_SECS") {
            config.timeout_secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout)?;
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn url_override(variable: &'static str, default: String) -> Result<String, ConfigError> {
    match env::var(variable) {
        Ok(value) if value.starts_with("http://") || value.starts_with("https://") => Ok(value),
        Ok(value) => Err(ConfigError::InvalidCollaboratorUrl { variable, value }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCollaboratorUrl { variable: &'static str, value: String },
    InvalidTimeout,
    InvalidSessionIdle,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCollaboratorUrl { variable, value } => {
                write!(f, "{variable} must be an http(s) URL, found '{value}'")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "APP_COLLABORATOR_TIMEOUT_SECS must be a positive integer")
            }
            ConfigError::InvalidSessionIdle => {
                write!(f, "APP_SESSION_IDLE_SECS must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
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
        for variable in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_COLLABORATOR_BASE_URL",
            "APP_RISK_SCORING_URL",
            "APP_CREDIT_CALCULATION_URL",
            "APP_NOTIFICATION_URL",
            "APP_COLLABORATOR_TIMEOUT_SECS",
            "APP_SESSION_IDLE_SECS",
        ] {
            env::remove_var(variable);
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
        assert_eq!(
            config.collaborators.risk_scoring_url,
            "http://127.0.0.1:5000/api/assess-risk"
        );
        assert_eq!(config.collaborators.timeout(), Duration::from_secs(30));
        assert_eq!(
            config.server.session_idle_timeout(),
            Duration::from_secs(1800)
        );
    }

    #[test]
    fn rejects_invalid_session_idle_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SESSION_IDLE_SECS", "soon");
        let err = AppConfig::load().expect_err("idle timeout must be numeric");
        assert!(matches!(err, ConfigError::InvalidSessionIdle));
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn collaborator_urls_follow_base_and_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_COLLABORATOR_BASE_URL", "https://decisions.internal/");
        env::set_var("APP_NOTIFICATION_URL", "http://mailer:8025/send");
        env::set_var("APP_COLLABORATOR_TIMEOUT_SECS", "5");

        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.collaborators.credit_calculation_url,
            "https://decisions.internal/api/calculate-credit"
        );
        assert_eq!(config.collaborators.notification_url, "http://mailer:8025/send");
        assert_eq!(config.collaborators.timeout_secs, 5);
        reset_env();
    }

    #[test]
    fn rejects_non_http_collaborator_url() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_RISK_SCORING_URL", "ftp://scoring");

        match AppConfig::load() {
            Err(ConfigError::InvalidCollaboratorUrl { variable, .. }) => {
                assert_eq!(variable, "APP_RISK_SCORING_URL");
            }
            other => panic!("expected invalid collaborator url, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn rejects_zero_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_COLLABORATOR_TIMEOUT_SECS", "0");

        assert!(matches!(AppConfig::load(), Err(ConfigError::InvalidTimeout)));
        reset_env();
    }
}
