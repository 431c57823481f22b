use std::sync::Mutex;

use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;

use crate::handlers::waitlist_dtos::{SignupRequest, SignupResponse};
use crate::intake::strategy::{IntakeError, SubmissionResult, SubmissionStrategy};
use crate::models::signup_models::format_timestamp;

/// Stand-in for the ledger when no service is deployed. Lives in memory only:
/// nothing here is durable and `clear` forgets every entry.
#[derive(Default)]
pub struct SimulatedStore {
    emails: Mutex<Vec<String>>,
}

impl SimulatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        match self.emails.lock() {
            Ok(emails) => emails.len(),
            Err(poisoned) => {
                tracing::warn!("Simulated waitlist store lock poisoned, reading through it");
                poisoned.into_inner().len()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut emails = self.emails.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Simulated waitlist store lock poisoned, clearing anyway");
            poisoned.into_inner()
        });
        emails.clear();
        self.emails.clear_poison();
    }

    fn record(&self, email: &str) -> Result<SubmissionResult, IntakeError> {
        let email = email.trim().to_lowercase();
        let mut emails = self
            .emails
            .lock()
            .map_err(|_| IntakeError::BadResponse("simulated store lock poisoned".to_string()))?;
        let response = if emails.contains(&email) {
            SignupResponse::already_on_list()
        } else {
            emails.push(email.clone());
            SignupResponse::welcome(emails.len() as u64, format_timestamp(Utc::now()))
        };
        tracing::warn!(
            simulated = true,
            "Simulated waitlist signup for {} (not persisted, service unreachable)",
            email
        );
        Ok(SubmissionResult { status: 200, response, simulated: true })
    }
}

impl SubmissionStrategy for SimulatedStore {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn submit<'a>(&'a self, request: &'a SignupRequest) -> BoxFuture<'a, Result<SubmissionResult, IntakeError>> {
        let result = self.record(request.email.as_deref().unwrap_or_default());
        async move { result }.boxed()
    }
}
