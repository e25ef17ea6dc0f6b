//! # Webring API Server
//!
//! Serves the webring HTTP API: user registration and sessions, webring
//! management, member site lists and search.
//!
//! ## Startup
//!
//! 1. Load configuration from the environment (`.env` honoured)
//! 2. Connect to PostgreSQL and apply pending migrations
//! 3. Start the periodic purge of expired sessions
//! 4. Serve until Ctrl+C / SIGTERM, then drain and close the pool
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p webring-api
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webring_api::{
    app::{build_router, AppState},
    config::Config,
};
use webring_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool},
    },
    mail::{HttpMailer, LogMailer, Mailer},
    services::UserService,
    store::PgStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "webring_api=debug,webring_shared=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Webring API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(config.database.clone())
        .await
        .with_context(|| format!("Failed to connect to {}", config.database.display_target()))?;

    run_migrations(&pool)
        .await
        .context("Failed to apply database migrations")?;

    let mailer: Arc<dyn Mailer> = match &config.mail.endpoint {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "Registration emails enabled");
            Arc::new(HttpMailer::new(
                endpoint.clone(),
                config.mail.api_key.clone(),
                config.mail.from.clone(),
            ))
        }
        None => {
            tracing::warn!("MAIL_ENDPOINT not set, registration emails will only be logged");
            Arc::new(LogMailer::new(config.mail.from.clone()))
        }
    };

    let bind_address = config.bind_address();
    let sweep_interval = config.session_sweep_interval();
    let state = AppState::new(Arc::new(PgStore::new(pool.clone())), mailer, config);
    let sweeper = tokio::spawn(sweep_sessions(state.users.clone(), sweep_interval));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Periodically deletes expired login sessions
async fn sweep_sessions(users: UserService, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if let Err(e) = users.purge_expired_sessions().await {
            tracing::warn!(error = %e, "Failed to purge expired sessions");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
