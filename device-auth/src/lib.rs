//! Control logic for the setup wizard's device authorization flow.
//!
//! The wizard hands interactive sign-ins off to an OAuth device
//! authorization brokered by the setup control server: the operator opens a
//! verification URL, enters a short code, and the server completes the
//! token exchange with the identity provider. This crate owns the
//! client-visible side of that handshake: a single session at a time, a
//! bounded status poller that tolerates flaky connectivity, and
//! deterministic cancel/retry paths.

mod client;
mod controller;
mod error;
mod poller;
mod presentation;
mod providers;
mod session;

pub use client::HttpSetupServerClient;
pub use client::SetupServerClient;
pub use controller::DeviceAuthController;
pub use error::FlowError;
pub use poller::PollConfig;
pub use presentation::ViewState;
pub use providers::provider_label;
pub use providers::supports_device_auth;
pub use session::DeviceAuthSession;
pub use session::FlowSnapshot;
pub use session::Phase;

// Re-export the wire-level types callers commonly need alongside the
// controller.
pub use clawsetup_protocol::IdentityResult;
pub use clawsetup_protocol::PollOutcome;
pub use clawsetup_protocol::SessionId;
pub use clawsetup_protocol::StartedSession;
