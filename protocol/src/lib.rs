//! Wire types for the setup control server's device-auth endpoints.
//!
//! The control server brokers an OAuth device authorization with the
//! upstream identity provider on the operator's behalf and exposes three
//! JSON endpoints to the wizard: start, status and cancel. The bodies are
//! camelCase; these types mirror them exactly, plus the domain-level
//! [`PollOutcome`] the flow controller consumes.

use serde::Deserialize;
use serde::Serialize;

/// Opaque identifier for a device-auth session, minted by the control server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Response from `POST /setup/api/device-auth/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub ok: bool,
    #[serde(default)]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub verification_url: Option<String>,
    #[serde(default)]
    pub user_code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The fields of a successfully started session: where the operator signs
/// in and the short code they enter there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedSession {
    pub session_id: SessionId,
    pub verification_url: String,
    pub user_code: String,
}

impl StartSessionResponse {
    /// Collapse the `ok`-tagged body into a result.
    ///
    /// A response that claims `ok` but is missing one of the session fields
    /// is reported as a server error rather than a partial session.
    pub fn into_result(self) -> Result<StartedSession, String> {
        if !self.ok {
            return Err(self
                .error
                .unwrap_or_else(|| "failed to start device auth".to_string()));
        }
        match (self.session_id, self.verification_url, self.user_code) {
            (Some(session_id), Some(verification_url), Some(user_code)) => Ok(StartedSession {
                session_id,
                verification_url,
                user_code,
            }),
            _ => Err("malformed start response: missing session fields".to_string()),
        }
    }
}

/// Session status tag as reported by the control server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Done,
    Error,
}

/// Identity descriptor returned once the provider approves the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResult {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
}

impl IdentityResult {
    /// Account label shown to the operator.
    pub fn label(&self) -> &str {
        self.email.as_deref().unwrap_or("Unknown")
    }
}

/// Response from `GET /setup/api/device-auth/status?session=<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub status: SessionStatus,
    #[serde(default)]
    pub result: Option<IdentityResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Domain-level view of one status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The operator has not completed the sign-in yet.
    Pending,
    /// The provider approved the session.
    Done(IdentityResult),
    /// The server reported a terminal failure.
    Error(String),
}

impl SessionStatusResponse {
    pub fn into_outcome(self) -> PollOutcome {
        match self.status {
            SessionStatus::Pending => PollOutcome::Pending,
            SessionStatus::Done => PollOutcome::Done(self.result.unwrap_or_default()),
            SessionStatus::Error => PollOutcome::Error(
                self.error
                    .unwrap_or_else(|| "authentication failed".to_string()),
            ),
        }
    }
}

/// Request body for `POST /setup/api/device-auth/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelSessionRequest {
    pub session_id: SessionId,
}

/// Ack body for cancel. Failures here are non-fatal to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelSessionResponse {
    pub ok: bool,
}
