use futures::future::BoxFuture;
use thiserror::Error;

use crate::handlers::waitlist_dtos::{SignupRequest, SignupResponse};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeError {
    /// The request never got an HTTP response (connection refused, DNS, timeout).
    #[error("Waitlist service unreachable: {0}")]
    Unreachable(String),
    #[error("Unexpected response from waitlist service: {0}")]
    BadResponse(String),
}

impl IntakeError {
    pub fn is_transport(&self) -> bool {
        matches!(self, IntakeError::Unreachable(_))
    }
}

/// What a strategy returns. Remote and simulated results share this shape;
/// `simulated` is the only difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub status: u16,
    pub response: SignupResponse,
    pub simulated: bool,
}

/// Where a submission goes: the real ledger service or the local stand-in.
pub trait SubmissionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn submit<'a>(&'a self, request: &'a SignupRequest) -> BoxFuture<'a, Result<SubmissionResult, IntakeError>>;
}

/// Decides whether the remote service can be used at all.
pub trait ConnectivityProbe: Send + Sync {
    fn is_reachable(&self) -> BoxFuture<'_, bool>;
}
