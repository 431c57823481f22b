use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;

use crate::handlers::waitlist_dtos::{SignupRequest, SignupResponse};
use crate::intake::strategy::{ConnectivityProbe, IntakeError, SubmissionResult, SubmissionStrategy};

const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Posts signups to a running waitlist service.
#[derive(Clone)]
pub struct RemoteLedgerClient {
    http: Client,
    base_url: String,
}

impl RemoteLedgerClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self { http, base_url: trim_base(base_url) }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/waitlist", self.base_url)
    }

    async fn post(&self, request: &SignupRequest) -> Result<SubmissionResult, IntakeError> {
        let response = self
            .http
            .post(self.endpoint())
            .timeout(SUBMIT_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| IntakeError::Unreachable(e.to_string()))?;
        let status = response.status().as_u16();
        // Error statuses still carry a SignupResponse body.
        let body = response
            .json::<SignupResponse>()
            .await
            .map_err(|e| IntakeError::BadResponse(format!("status {}: {}", status, e)))?;
        Ok(SubmissionResult { status, response: body, simulated: false })
    }
}

impl SubmissionStrategy for RemoteLedgerClient {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn submit<'a>(&'a self, request: &'a SignupRequest) -> BoxFuture<'a, Result<SubmissionResult, IntakeError>> {
        self.post(request).boxed()
    }
}

/// `GET /api/health` probe.
#[derive(Clone)]
pub struct HttpProbe {
    http: Client,
    base_url: String,
}

impl HttpProbe {
    pub fn new(base_url: &str) -> Self {
        Self { http: Client::new(), base_url: trim_base(base_url) }
    }
}

impl ConnectivityProbe for HttpProbe {
    fn is_reachable(&self) -> BoxFuture<'_, bool> {
        async move {
            match self
                .http
                .get(format!("{}/api/health", self.base_url))
                .timeout(PROBE_TIMEOUT)
                .send()
                .await
            {
                Ok(response) => response.status().is_success(),
                Err(e) => {
                    tracing::debug!("Waitlist health probe failed: {}", e);
                    false
                }
            }
        }
        .boxed()
    }
}
