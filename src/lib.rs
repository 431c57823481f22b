use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub mod config;
pub mod error;
pub mod handlers {
    pub mod waitlist_dtos;
    pub mod waitlist_handlers;
}
pub mod models {
    pub mod signup_models;
}
pub mod repositories {
    pub mod ledger;
}
pub mod utils {
    pub mod email_utils;
    pub mod notification_utils;
    pub mod request_meta;
}
/// Client side of the signup form: validation, submission strategies, feedback.
pub mod intake {
    pub mod feedback;
    pub mod remote;
    pub mod simulated;
    pub mod strategy;
    pub mod validation;
    pub mod widget;
}

use config::WaitlistConfig;
use handlers::waitlist_handlers;
use repositories::ledger::{CsvLedger, SignupLedger};
use utils::notification_utils::AdminNotifier;

pub struct AppState {
    pub ledger: Arc<dyn SignupLedger>,
    pub default_source: String,
    pub notifier: AdminNotifier,
}

impl AppState {
    pub fn from_config(config: &WaitlistConfig) -> Self {
        Self {
            ledger: Arc::new(CsvLedger::new(config.ledger_path.clone(), config.max_ledger_bytes)),
            default_source: config.default_source.clone(),
            notifier: AdminNotifier::new(config.notify.clone()),
        }
    }
}

/// Waitlist routes with request tracing. CORS is added by [`app`].
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(waitlist_handlers::health_check))
        .route(
            "/api/waitlist",
            post(waitlist_handlers::join_waitlist)
                .options(waitlist_handlers::preflight)
                .fallback(waitlist_handlers::method_not_allowed),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

pub fn app(state: Arc<AppState>, frontend_url: &str) -> anyhow::Result<Router> {
    let origin: HeaderValue = frontend_url
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid FRONTEND_URL {:?}: {}", frontend_url, e))?;
    Ok(router(state).layer(
        CorsLayer::new()
            .allow_methods([Method::POST, Method::OPTIONS])
            .allow_origin(AllowOrigin::exact(origin))
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]),
    ))
}
