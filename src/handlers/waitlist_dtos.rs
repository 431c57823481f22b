use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignupRequest {
    pub email: Option<String>,
    pub source: Option<String>,
}

/// Body of every waitlist response. Optional fields are left out of the JSON when unset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waitlist_position: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub already_exists: Option<bool>,
}

pub const WELCOME_MESSAGE: &str = "Welcome to the waitlist!";
pub const ALREADY_ON_LIST_MESSAGE: &str = "You're already on the waitlist!";

impl SignupResponse {
    pub fn welcome(position: u64, timestamp: String) -> Self {
        Self {
            success: true,
            message: WELCOME_MESSAGE.to_string(),
            waitlist_position: Some(position),
            timestamp: Some(timestamp),
            already_exists: None,
        }
    }

    pub fn already_on_list() -> Self {
        Self {
            success: true,
            message: ALREADY_ON_LIST_MESSAGE.to_string(),
            waitlist_position: None,
            timestamp: None,
            already_exists: Some(true),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            waitlist_position: None,
            timestamp: None,
            already_exists: None,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.already_exists.unwrap_or(false)
    }
}
