use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    error::WaitlistError,
    handlers::waitlist_dtos::{SignupRequest, SignupResponse},
    models::signup_models::{NewSignup, RegisterOutcome},
    repositories::ledger::LedgerError,
    utils::{
        email_utils::{is_valid_email, normalize_email},
        request_meta::{client_address, user_agent},
    },
    AppState,
};

/// Upper bound on a signup body; a real one is well under 1 KiB.
const MAX_BODY_BYTES: usize = 16 * 1024;

pub async fn health_check() -> &'static str {
    "OK"
}

/// Answers CORS pre-flight requests that reach the handler with an empty 200.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed(request: Request) -> WaitlistError {
    tracing::warn!("Rejected {} request to {}", request.method(), request.uri().path());
    WaitlistError::MethodNotAllowed
}

/// `POST /api/waitlist`: validates the email, then registers it in the ledger.
pub async fn join_waitlist(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<SignupResponse>, WaitlistError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client_address = client_address(request.headers(), peer);
    let agent_string = user_agent(request.headers());

    let body = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| {
            tracing::warn!("Could not read waitlist body from {}: {}", client_address, e);
            WaitlistError::EmailRequired
        })?;
    let signup_req: SignupRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("Unparseable waitlist body from {}: {}", client_address, e);
        WaitlistError::EmailRequired
    })?;

    let raw_email = match signup_req.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => {
            tracing::warn!("Waitlist submission from {} without email", client_address);
            return Err(WaitlistError::EmailRequired);
        }
    };
    let email = normalize_email(&raw_email);
    if !is_valid_email(&email) {
        tracing::warn!("Invalid email format: {:?}", raw_email);
        return Err(WaitlistError::InvalidEmail);
    }

    let source = signup_req
        .source
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| state.default_source.clone());
    let signup = NewSignup {
        email: email.clone(),
        source,
        client_address,
        agent_string,
    };

    let ledger = state.ledger.clone();
    let outcome = tokio::task::spawn_blocking(move || ledger.register(signup, Utc::now()))
        .await
        .map_err(|e| {
            tracing::error!("Waitlist ledger task failed: {}", e);
            WaitlistError::Unavailable
        })?;

    match outcome {
        Ok(RegisterOutcome::AlreadyExists) => {
            tracing::info!("Email {} is already on the waitlist", email);
            Ok(Json(SignupResponse::already_on_list()))
        }
        Ok(RegisterOutcome::Appended { record, position }) => {
            tracing::info!("New waitlist signup {} at position {} (source: {})", email, position, record.source);
            state.notifier.notify_signup(&record, position);
            Ok(Json(SignupResponse::welcome(position, record.submitted_at)))
        }
        Err(LedgerError::CapacityExceeded { size, limit }) => {
            tracing::error!(
                "Waitlist ledger is full ({} of {} bytes), rejected {}. Rotate the ledger file.",
                size,
                limit,
                email
            );
            Err(WaitlistError::Unavailable)
        }
        Err(e) => {
            tracing::error!("Failed to store waitlist signup for {}: {}", email, e);
            Err(WaitlistError::Unavailable)
        }
    }
}
