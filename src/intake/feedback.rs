use std::fmt;

/// How urgently a screen reader should read a message out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Politeness {
    /// `aria-live="polite"`, `role="status"`.
    Polite,
    /// `aria-live="assertive"`, `role="alert"`.
    Assertive,
}

impl Politeness {
    pub fn aria_live(&self) -> &'static str {
        match self {
            Politeness::Polite => "polite",
            Politeness::Assertive => "assertive",
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Politeness::Polite => "status",
            Politeness::Assertive => "alert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub politeness: Politeness,
    pub text: String,
}

/// Outcome of one submit, in the form the page renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Rejected before sending, or rejected by the server as malformed.
    Invalid { reason: String },
    Registered {
        message: String,
        position: Option<u64>,
        timestamp: Option<String>,
        simulated: bool,
    },
    /// Not an error: the address was on the list already.
    AlreadyRegistered { message: String, simulated: bool },
    /// Request failed; the user may try again.
    Failed { message: String },
    /// Another submission from this widget is still pending.
    Busy,
}

pub const BUSY_MESSAGE: &str = "Your signup is already being submitted.";

impl Feedback {
    pub fn message(&self) -> &str {
        match self {
            Feedback::Invalid { reason } => reason,
            Feedback::Registered { message, .. }
            | Feedback::AlreadyRegistered { message, .. }
            | Feedback::Failed { message } => message,
            Feedback::Busy => BUSY_MESSAGE,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Feedback::Invalid { .. } | Feedback::Failed { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Feedback::Failed { .. })
    }

    pub fn is_simulated(&self) -> bool {
        match self {
            Feedback::Registered { simulated, .. } | Feedback::AlreadyRegistered { simulated, .. } => *simulated,
            _ => false,
        }
    }

    /// Text and urgency for the live status region.
    pub fn announcement(&self) -> Announcement {
        let politeness = if self.is_error() {
            Politeness::Assertive
        } else {
            Politeness::Polite
        };
        Announcement {
            politeness,
            text: self.message().to_string(),
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_are_assertive() {
        let invalid = Feedback::Invalid { reason: "Please enter a valid email address".into() };
        assert_eq!(invalid.announcement().politeness, Politeness::Assertive);
        assert_eq!(invalid.announcement().politeness.role(), "alert");
        assert!(!invalid.is_retryable());

        let failed = Feedback::Failed { message: "try later".into() };
        assert!(failed.is_retryable());
        assert_eq!(failed.announcement().politeness.aria_live(), "assertive");
    }

    #[test]
    fn test_duplicate_is_a_polite_success() {
        let dup = Feedback::AlreadyRegistered { message: "You're already on the waitlist!".into(), simulated: false };
        assert!(!dup.is_error());
        let announcement = dup.announcement();
        assert_eq!(announcement.politeness, Politeness::Polite);
        assert_eq!(announcement.text, "You're already on the waitlist!");
    }

    #[test]
    fn test_busy_has_a_message() {
        assert_eq!(Feedback::Busy.to_string(), BUSY_MESSAGE);
        assert!(!Feedback::Busy.is_error());
    }
}
