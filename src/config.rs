use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_LEDGER_PATH: &str = "data/waitlist.csv";
pub const DEFAULT_MAX_LEDGER_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_SOURCE: &str = "website";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} must be true or false, got {value:?}")]
    InvalidFlag { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub from: String,
    pub admin_email: String,
}

#[derive(Debug, Clone)]
pub struct WaitlistConfig {
    pub ledger_path: PathBuf,
    pub max_ledger_bytes: u64,
    pub default_source: String,
    pub port: u16,
    pub frontend_url: String,
    pub sentry_dsn: Option<String>,
    /// None keeps the admin notification hook inert.
    pub notify: Option<SmtpConfig>,
}

impl Default for WaitlistConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            max_ledger_bytes: DEFAULT_MAX_LEDGER_BYTES,
            default_source: DEFAULT_SOURCE.to_string(),
            port: 3000,
            frontend_url: "http://localhost:8080".to_string(),
            sentry_dsn: None,
            notify: None,
        }
    }
}

impl WaitlistConfig {
    /// Reads configuration from the process environment. Call `dotenvy::dotenv()` first
    /// if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let ledger_path = var("WAITLIST_LEDGER_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.ledger_path);
        let max_ledger_bytes = match var("WAITLIST_MAX_LEDGER_BYTES") {
            Some(value) => value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                name: "WAITLIST_MAX_LEDGER_BYTES",
                value,
            })?,
            None => defaults.max_ledger_bytes,
        };
        let default_source = var("WAITLIST_DEFAULT_SOURCE").unwrap_or(defaults.default_source);

        let port = match var("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber { name: "PORT", value })?,
            None => match var("ENVIRONMENT").as_deref() {
                Some("staging") => 3100,
                _ => 3000,
            },
        };
        let frontend_url = var("FRONTEND_URL").unwrap_or(defaults.frontend_url);
        let sentry_dsn = var("SENTRY_DSN");

        let notify_enabled = match var("WAITLIST_NOTIFY_ENABLED") {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidFlag {
                        name: "WAITLIST_NOTIFY_ENABLED",
                        value,
                    })
                }
            },
            None => false,
        };
        let notify = if notify_enabled {
            match (
                var("SMTP_SERVER"),
                var("SMTP_USERNAME"),
                var("SMTP_PASSWORD"),
                var("WAITLIST_ADMIN_EMAIL"),
            ) {
                (Some(server), Some(username), Some(password), Some(admin_email)) => {
                    let from = var("SMTP_FROM").unwrap_or_else(|| username.clone());
                    Some(SmtpConfig { server, username, password, from, admin_email })
                }
                _ => {
                    tracing::warn!("WAITLIST_NOTIFY_ENABLED is set but SMTP settings are incomplete, notifications stay off");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            ledger_path,
            max_ledger_bytes,
            default_source,
            port,
            frontend_url,
            sentry_dsn,
            notify,
        })
    }
}
