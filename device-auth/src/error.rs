//! Error taxonomy for the device-auth flow.

use thiserror::Error;

/// Failures surfaced by the flow controller.
///
/// `Timeout` deliberately renders differently from any `Protocol` message so
/// the operator can tell "the provider rejected the request" apart from
/// "nobody answered within the poll budget".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// Network or HTTP failure reaching the control server.
    #[error("network error: {0}")]
    Transport(String),

    /// The control server reported a failure (`ok: false` or `status: error`).
    #[error("{0}")]
    Protocol(String),

    /// The poll budget ran out without a terminal status.
    #[error("polling timeout: the sign-in was not completed in time")]
    Timeout,

    /// An operation was invoked in a phase that forbids it. The live
    /// session, if any, is left untouched.
    #[error("invalid operation: {0}")]
    InvariantViolation(&'static str),
}
