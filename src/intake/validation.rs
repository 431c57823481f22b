use once_cell::sync::Lazy;
use regex::Regex;

static CLIENT_EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("client email regex is valid"));

pub const EMPTY_EMAIL_REASON: &str = "Please enter your email address";
pub const INVALID_EMAIL_REASON: &str = "Please enter a valid email address";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub reason: Option<String>,
}

impl Validation {
    fn ok() -> Self {
        Self { valid: true, reason: None }
    }

    fn rejected(reason: &str) -> Self {
        Self { valid: false, reason: Some(reason.to_string()) }
    }
}

/// Quick syntactic check run before anything is sent. The server applies the
/// stricter grammar, so this only catches obvious typos.
pub fn validate(candidate: &str) -> Validation {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        Validation::rejected(EMPTY_EMAIL_REASON)
    } else if CLIENT_EMAIL_REGEX.is_match(candidate) {
        Validation::ok()
    } else {
        Validation::rejected(INVALID_EMAIL_REASON)
    }
}
