use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use waitlist::config::WaitlistConfig;
use waitlist::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,waitlist=debug"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = WaitlistConfig::from_env().context("Invalid waitlist configuration")?;
    // Crash reporting is optional; without a DSN nothing is sent anywhere.
    let _sentry = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    tracing::info!(
        "Waitlist ledger at {} (limit {} bytes), admin notifications {}",
        config.ledger_path.display(),
        config.max_ledger_bytes,
        if config.notify.is_some() { "on" } else { "off" }
    );
    let state = Arc::new(AppState::from_config(&config));
    let app = waitlist::app(state, &config.frontend_url)?;

    tracing::info!("Starting server on port {}", config.port);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("Server error")?;
    Ok(())
}
