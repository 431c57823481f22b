use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::handlers::waitlist_dtos::SignupResponse;

pub const UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable. Please try again later.";

/// Failures the waitlist endpoint reports to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaitlistError {
    #[error("Email is required")]
    EmailRequired,
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Method not allowed")]
    MethodNotAllowed,
    /// Storage or capacity fault. Details are logged where they happen, never returned.
    #[error("Service temporarily unavailable. Please try again later.")]
    Unavailable,
}

impl WaitlistError {
    pub fn status(&self) -> StatusCode {
        match self {
            WaitlistError::EmailRequired | WaitlistError::InvalidEmail => StatusCode::BAD_REQUEST,
            WaitlistError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            WaitlistError::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WaitlistError {
    fn into_response(self) -> Response {
        (self.status(), Json(SignupResponse::failure(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(WaitlistError::EmailRequired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(WaitlistError::InvalidEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(WaitlistError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(WaitlistError::Unavailable.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unavailable_hides_details() {
        assert_eq!(WaitlistError::Unavailable.to_string(), UNAVAILABLE_MESSAGE);
    }
}
