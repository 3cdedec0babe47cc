use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Where identities and credentials live.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Durable Redis store at the given URL.
    Redis(String),
    /// Process-local store; everything is lost on restart.
    Memory,
}

impl std::fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Redis(_) => f.write_str("Redis([REDACTED])"),
            StoreBackend::Memory => f.write_str("Memory"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    // Storage
    pub store: StoreBackend,

    // Server
    pub bind_addr: SocketAddr,

    // TTLs (in seconds)
    pub challenge_ttl_secs: u64,
    pub session_ttl_secs: u64,

    // Cookies
    pub secure_cookies: bool,

    // Background sweep, 0 disables it
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| "redis".to_string());
        let store = match backend.as_str() {
            "redis" => {
                let redis_url = env::var("REDIS_URL")
                    .map_err(|_| ConfigError::MissingVar("REDIS_URL".to_string()))?;
                if redis_url.is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "REDIS_URL".to_string(),
                        "cannot be empty".to_string(),
                    ));
                }
                StoreBackend::Redis(redis_url)
            }
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORE_BACKEND".to_string(),
                    format!("expected 'redis' or 'memory', got '{}'", other),
                ))
            }
        };

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        // TTLs
        let challenge_ttl_secs = parse_env_or_default("CHALLENGE_TTL_SECS", 600)?;
        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", 86_400)?;
        for (name, value) in [
            ("CHALLENGE_TTL_SECS", challenge_ttl_secs),
            ("SESSION_TTL_SECS", session_ttl_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue(
                    name.to_string(),
                    "must be greater than zero".to_string(),
                ));
            }
        }

        // Secure cookies outside development unless explicitly overridden
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let secure_cookies = parse_env_or_default("COOKIE_SECURE", app_env != "development")?;

        let cleanup_interval_secs = parse_env_or_default("CLEANUP_INTERVAL_SECS", 300)?;

        Ok(Config {
            store,
            bind_addr,
            challenge_ttl_secs,
            session_ttl_secs,
            secure_cookies,
            cleanup_interval_secs,
        })
    }

    pub fn challenge_ttl(&self) -> Duration {
        Duration::from_secs(self.challenge_ttl_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
