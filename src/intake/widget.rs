use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::handlers::waitlist_dtos::SignupRequest;
use crate::intake::feedback::Feedback;
use crate::intake::remote::{HttpProbe, RemoteLedgerClient};
use crate::intake::simulated::SimulatedStore;
use crate::intake::strategy::{ConnectivityProbe, IntakeError, SubmissionResult, SubmissionStrategy};
use crate::intake::validation::validate;

pub const UNREACHABLE_MESSAGE: &str = "We couldn't reach the server. Please try again.";
pub const UNEXPECTED_MESSAGE: &str = "Something went wrong. Please try again.";

/// Clears the in-flight flag when a submission finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Signup form logic without the rendering: validate, submit through the
/// active strategy, and turn the result into [`Feedback`].
pub struct IntakeWidget {
    remote: Arc<dyn SubmissionStrategy>,
    simulated: Arc<SimulatedStore>,
    probe: Arc<dyn ConnectivityProbe>,
    use_simulated: AtomicBool,
    in_flight: AtomicBool,
    source: Option<String>,
}

impl IntakeWidget {
    /// Probes the service once and starts on whichever strategy the probe picks.
    /// While simulated, every submit probes again and goes live as soon as the
    /// service answers.
    pub async fn connect(
        remote: Arc<dyn SubmissionStrategy>,
        simulated: Arc<SimulatedStore>,
        probe: Arc<dyn ConnectivityProbe>,
        source: Option<String>,
    ) -> Self {
        let reachable = probe.is_reachable().await;
        if !reachable {
            tracing::warn!("Waitlist service unreachable, signups will be simulated locally");
        }
        Self {
            remote,
            simulated,
            probe,
            use_simulated: AtomicBool::new(!reachable),
            in_flight: AtomicBool::new(false),
            source,
        }
    }

    pub async fn for_base_url(base_url: &str, source: Option<String>) -> Self {
        Self::connect(
            Arc::new(RemoteLedgerClient::new(base_url)),
            Arc::new(SimulatedStore::new()),
            Arc::new(HttpProbe::new(base_url)),
            source,
        )
        .await
    }

    pub fn is_simulated(&self) -> bool {
        self.use_simulated.load(Ordering::Acquire)
    }

    pub fn active_strategy(&self) -> &'static str {
        if self.is_simulated() {
            self.simulated.name()
        } else {
            self.remote.name()
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn submit(&self, email: &str) -> Feedback {
        let validation = validate(email);
        if !validation.valid {
            return Feedback::Invalid {
                reason: validation.reason.unwrap_or_default(),
            };
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("Ignoring waitlist submit while another is pending");
            return Feedback::Busy;
        }
        let _in_flight = InFlight(&self.in_flight);

        let request = SignupRequest {
            email: Some(email.trim().to_string()),
            source: self.source.clone(),
        };

        if self.is_simulated() {
            if !self.probe.is_reachable().await {
                return classify(self.simulated.submit(&request).await);
            }
            tracing::info!("Waitlist service reachable again, resuming live signups");
            self.use_simulated.store(false, Ordering::Release);
        }
        match self.remote.submit(&request).await {
            Err(e) if e.is_transport() => {
                tracing::warn!("Waitlist submit failed: {}", e);
                if self.probe.is_reachable().await {
                    return Feedback::Failed { message: UNREACHABLE_MESSAGE.to_string() };
                }
                tracing::warn!("Waitlist service unreachable, switching to simulated signups");
                self.use_simulated.store(true, Ordering::Release);
                classify(self.simulated.submit(&request).await)
            }
            other => classify(other),
        }
    }
}

fn classify(result: Result<SubmissionResult, IntakeError>) -> Feedback {
    let result = match result {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Waitlist submission failed: {}", e);
            let message = if e.is_transport() { UNREACHABLE_MESSAGE } else { UNEXPECTED_MESSAGE };
            return Feedback::Failed { message: message.to_string() };
        }
    };
    let SubmissionResult { status, response, simulated } = result;
    if response.success && response.is_duplicate() {
        Feedback::AlreadyRegistered { message: response.message, simulated }
    } else if response.success {
        Feedback::Registered {
            message: response.message,
            position: response.waitlist_position,
            timestamp: response.timestamp,
            simulated,
        }
    } else if status == 400 {
        Feedback::Invalid { reason: response.message }
    } else {
        Feedback::Failed { message: response.message }
    }
}
