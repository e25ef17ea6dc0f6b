/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is loaded
/// first if present).
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `DB_HOST` / `DB_PORT`: Database server (default: localhost:5432)
/// - `DB_USER`, `DB_PASSWORD`, `DB_NAME`: Database credentials (required)
/// - `DB_SCHEMA`: Schema to use (default: public)
/// - `DB_SSL`: Require TLS to the database (default: false)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `SESSION_TTL_HOURS`: Login session lifetime (default: 168)
/// - `SESSION_SWEEP_INTERVAL_SECS`: How often expired sessions are purged (default: 3600)
/// - `PASSWORD_MIN_LENGTH`: Minimum new-password length (default: 8)
/// - `MAIL_ENDPOINT`: HTTP mail endpoint; unset disables delivery
/// - `MAIL_API_KEY`: Bearer key for the mail endpoint
/// - `MAIL_FROM`: Sender address (default: noreply@localhost)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use webring_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;

use anyhow::Context;
use webring_shared::auth::password::PasswordPolicy;
use webring_shared::db::pool::DatabaseConfig;
use webring_shared::services::user::DEFAULT_SESSION_TTL_HOURS;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,

    pub database: DatabaseConfig,

    pub auth: AuthConfig,

    pub mail: MailConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Login session lifetime in hours
    pub session_ttl_hours: i64,

    /// Period of the expired-session purge task, in seconds
    pub session_sweep_interval_secs: u64,

    /// Minimum length of a new password
    pub password_min_length: usize,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// HTTP endpoint of the delivery service; `None` logs instead of sending
    pub endpoint: Option<String>,

    pub api_key: Option<String>,

    /// Sender address
    pub from: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            session_sweep_interval_secs: 3600,
            password_min_length: PasswordPolicy::default().min_length,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            from: "noreply@localhost".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DB_USER`, `DB_PASSWORD` or `DB_NAME` is missing
    /// - a numeric or boolean variable cannot be parsed
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            var(key).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let api_defaults = ApiConfig::default();
        let db_defaults = DatabaseConfig::default();
        let auth_defaults = AuthConfig::default();
        let mail_defaults = MailConfig::default();

        let cors_origins = match var("CORS_ORIGINS") {
            Some(origins) => origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => api_defaults.cors_origins,
        };

        let config = Self {
            api: ApiConfig {
                host: var("API_HOST").unwrap_or(api_defaults.host),
                port: parse_or(&var, "API_PORT", api_defaults.port)?,
                cors_origins,
            },
            database: DatabaseConfig {
                host: var("DB_HOST").unwrap_or(db_defaults.host),
                port: parse_or(&var, "DB_PORT", db_defaults.port)?,
                user: required("DB_USER")?,
                password: required("DB_PASSWORD")?,
                database: required("DB_NAME")?,
                schema: var("DB_SCHEMA").unwrap_or(db_defaults.schema),
                ssl: parse_or(&var, "DB_SSL", db_defaults.ssl)?,
                max_connections: parse_or(
                    &var,
                    "DATABASE_MAX_CONNECTIONS",
                    db_defaults.max_connections,
                )?,
                ..db_defaults
            },
            auth: AuthConfig {
                session_ttl_hours: parse_or(
                    &var,
                    "SESSION_TTL_HOURS",
                    auth_defaults.session_ttl_hours,
                )?,
                session_sweep_interval_secs: parse_or(
                    &var,
                    "SESSION_SWEEP_INTERVAL_SECS",
                    auth_defaults.session_sweep_interval_secs,
                )?,
                password_min_length: parse_or(
                    &var,
                    "PASSWORD_MIN_LENGTH",
                    auth_defaults.password_min_length,
                )?,
            },
            mail: MailConfig {
                endpoint: var("MAIL_ENDPOINT").filter(|e| !e.is_empty()),
                api_key: var("MAIL_API_KEY").filter(|k| !k.is_empty()),
                from: var("MAIL_FROM").unwrap_or(mail_defaults.from),
            },
        };

        if config.auth.session_ttl_hours <= 0 {
            anyhow::bail!("SESSION_TTL_HOURS must be positive");
        }
        if config.auth.session_sweep_interval_secs == 0 {
            anyhow::bail!("SESSION_SWEEP_INTERVAL_SECS must be positive");
        }

        Ok(config)
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            min_length: self.auth.password_min_length,
            ..PasswordPolicy::default()
        }
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.auth.session_ttl_hours)
    }

    pub fn session_sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.auth.session_sweep_interval_secs)
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, value)),
        None => Ok(default),
    }
}
