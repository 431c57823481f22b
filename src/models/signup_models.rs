use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_ADDRESS: &str = "unknown";
pub const MAX_AGENT_CHARS: usize = 200;

/// Column order of the ledger file.
pub const LEDGER_HEADER: [&str; 5] = ["email", "timestamp", "source", "ip_address", "user_agent"];

/// One row of the waitlist ledger. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRecord {
    pub email: String,
    #[serde(rename = "timestamp")]
    pub submitted_at: String,
    pub source: String,
    #[serde(rename = "ip_address")]
    pub client_address: String,
    #[serde(rename = "user_agent")]
    pub agent_string: String,
}

impl SignupRecord {
    pub fn new(signup: NewSignup, submitted_at: DateTime<Utc>) -> Self {
        Self {
            email: signup.email,
            submitted_at: format_timestamp(submitted_at),
            source: signup.source,
            client_address: signup.client_address,
            agent_string: truncate_agent(&signup.agent_string),
        }
    }
}

/// A validated submission that has not been accepted into the ledger yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSignup {
    pub email: String,
    pub source: String,
    pub client_address: String,
    pub agent_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    AlreadyExists,
    Appended { record: SignupRecord, position: u64 },
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn truncate_agent(agent: &str) -> String {
    agent.chars().take(MAX_AGENT_CHARS).collect()
}
