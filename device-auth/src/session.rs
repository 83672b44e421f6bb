//! Session state shared between the controller, the poller and the
//! presentation contract.

use clawsetup_protocol::IdentityResult;
use clawsetup_protocol::SessionId;
use serde::Deserialize;
use serde::Serialize;

use crate::error::FlowError;

/// Discrete state of the device-auth flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// No session; the start affordance is available.
    #[default]
    Idle,
    /// A start request is in flight.
    Starting,
    /// The operator has a verification URL and user code; polling runs.
    AwaitingApproval,
    /// The provider approved the session.
    Succeeded,
    /// The flow ended in an error or timeout; retry is offered.
    Failed,
    /// The operator abandoned the session.
    Cancelled,
}

impl Phase {
    /// Phases that end a session; only operator action moves past them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    /// Phases during which a new `start` is forbidden.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::AwaitingApproval)
    }
}

/// A live session, recorded only after a successful start call.
///
/// Owned exclusively by the controller; dropped on cancel, terminal
/// outcome or retry-reset. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAuthSession {
    pub id: SessionId,
    pub verification_url: String,
    pub user_code: String,
}

/// Read-only view of the flow for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub phase: Phase,
    /// Label of the provider the flow was started for.
    pub provider_label: Option<String>,
    /// Present only while a session is live.
    pub session: Option<DeviceAuthSession>,
    /// Present only after `Succeeded`.
    pub identity: Option<IdentityResult>,
    /// Present only after `Failed`.
    pub failure: Option<FlowError>,
}
