//! Request/response bridge to the setup control server.

use async_trait::async_trait;
use clawsetup_protocol::CancelSessionRequest;
use clawsetup_protocol::CancelSessionResponse;
use clawsetup_protocol::PollOutcome;
use clawsetup_protocol::SessionId;
use clawsetup_protocol::SessionStatusResponse;
use clawsetup_protocol::StartSessionResponse;
use clawsetup_protocol::StartedSession;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::FlowError;

const START_ENDPOINT: &str = "/setup/api/device-auth/start";
const STATUS_ENDPOINT: &str = "/setup/api/device-auth/status";
const CANCEL_ENDPOINT: &str = "/setup/api/device-auth/cancel";

/// Client for the control server's three device-auth endpoints.
///
/// The flow controller drives this. It never auto-retries a failed
/// `start_session` (that takes explicit operator action) and treats
/// `cancel_session` as best-effort.
#[async_trait]
pub trait SetupServerClient: Send + Sync {
    /// Ask the control server to begin a device authorization with the
    /// upstream identity provider.
    async fn start_session(&self) -> Result<StartedSession, FlowError>;

    /// One status check for an in-flight session.
    ///
    /// Transport failures surface as `FlowError::Transport`; a server-side
    /// failure arrives as [`PollOutcome::Error`] in the `Ok` branch.
    async fn session_status(&self, session_id: &SessionId) -> Result<PollOutcome, FlowError>;

    /// Tell the control server the operator abandoned the session.
    async fn cancel_session(&self, session_id: &SessionId) -> Result<(), FlowError>;
}

/// [`SetupServerClient`] over HTTP, matching the setup wizard's JSON API.
pub struct HttpSetupServerClient {
    client: reqwest::Client,
    base: String,
}

impl HttpSetupServerClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Read a JSON body, mapping non-2xx statuses and malformed bodies to
    /// `Transport` errors. Only an explicit `ok: false` / `status: error`
    /// body is a protocol failure.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FlowError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(FlowError::Transport(format!("HTTP {status}: {body}")));
        }

        serde_json::from_str::<T>(&body)
            .map_err(|e| FlowError::Transport(format!("parse error: {e}")))
    }
}

#[async_trait]
impl SetupServerClient for HttpSetupServerClient {
    async fn start_session(&self) -> Result<StartedSession, FlowError> {
        let url = self.endpoint_url(START_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;

        let body: StartSessionResponse = Self::read_json(response).await?;
        body.into_result().map_err(FlowError::Protocol)
    }

    async fn session_status(&self, session_id: &SessionId) -> Result<PollOutcome, FlowError> {
        let url = self.endpoint_url(STATUS_ENDPOINT);

        let response = self
            .client
            .get(&url)
            .query(&[("session", session_id.as_str())])
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;

        let body: SessionStatusResponse = Self::read_json(response).await?;
        Ok(body.into_outcome())
    }

    async fn cancel_session(&self, session_id: &SessionId) -> Result<(), FlowError> {
        let url = self.endpoint_url(CANCEL_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .json(&CancelSessionRequest {
                session_id: session_id.clone(),
            })
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;

        let _: CancelSessionResponse = Self::read_json(response).await?;
        Ok(())
    }
}
