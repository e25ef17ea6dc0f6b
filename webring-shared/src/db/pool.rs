/// Database connection pool management
///
/// The pool is built from discrete connection parameters (host, port,
/// credentials, database, schema, TLS) rather than a URL. It is created once
/// at startup, handed to `store::PgStore`, and closed on shutdown with
/// `close_pool`; nothing holds a global handle.
///
/// # Example
///
/// ```no_run
/// use webring_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), sqlx::Error> {
/// let config = DatabaseConfig {
///     user: "webring".to_string(),
///     password: "webring".to_string(),
///     database: "webring".to_string(),
///     ..Default::default()
/// };
///
/// let pool = create_pool(config).await?;
/// close_pool(pool).await;
/// # Ok(())
/// # }
/// ```

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection and pool settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,

    pub port: u16,

    pub user: String,

    pub password: String,

    /// Database name
    pub database: String,

    /// Schema placed first on the `search_path`
    pub schema: String,

    /// Require TLS. The server certificate is not verified.
    pub ssl: bool,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of idle connections kept warm
    pub min_connections: u32,

    /// Timeout for acquiring a connection from the pool (seconds)
    pub connect_timeout_seconds: u64,

    /// Idle connections are closed after this long (seconds); None = never
    pub idle_timeout_seconds: Option<u64>,

    /// Connections are recycled after this long (seconds); None = never
    pub max_lifetime_seconds: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: String::new(),
            password: String::new(),
            database: String::new(),
            schema: "public".to_string(),
            ssl: false,
            max_connections: 10,
            min_connections: 2,
            connect_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
        }
    }
}

impl DatabaseConfig {
    /// Connection options for this configuration
    pub fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(ssl_mode)
            .options([("search_path", self.schema.as_str())])
    }

    /// `postgresql://user@host:port/database`, without the password
    pub fn display_target(&self) -> String {
        format!(
            "postgresql://{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

/// Creates the connection pool and verifies the database answers
///
/// # Errors
///
/// Returns an error if the database is unreachable, rejects the credentials,
/// or fails the health check.
pub async fn create_pool(config: DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        target_db = %config.display_target(),
        schema = %config.schema,
        ssl = config.ssl,
        max_connections = config.max_connections,
        "Connecting to database"
    );

    let mut pool_options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds));

    if let Some(idle_timeout) = config.idle_timeout_seconds {
        pool_options = pool_options.idle_timeout(Duration::from_secs(idle_timeout));
        debug!(idle_timeout_seconds = idle_timeout, "Set idle timeout");
    }

    if let Some(max_lifetime) = config.max_lifetime_seconds {
        pool_options = pool_options.max_lifetime(Duration::from_secs(max_lifetime));
        debug!(max_lifetime_seconds = max_lifetime, "Set max lifetime");
    }

    let pool = pool_options.connect_with(config.connect_options()).await?;

    health_check(&pool).await?;

    info!("Database connection pool created successfully");
    Ok(pool)
}

/// Runs `SELECT 1` against the pool
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    debug!("Performing database health check");

    let result: (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;

    if result.0 == 1 {
        Ok(())
    } else {
        warn!("Database health check returned unexpected value: {}", result.0);
        Err(sqlx::Error::Protocol(
            "Health check returned unexpected value".into(),
        ))
    }
}

/// Gracefully closes the connection pool
pub async fn close_pool(pool: PgPool) {
    info!("Closing database connection pool");
    pool.close().await;
    info!("Closed database connection");
}
