//! Which parts of the device-auth card are visible in each phase.
//!
//! This is the contract only; rendering mechanics (markup, styling,
//! clipboard helpers) live with the embedding UI.

use crate::session::FlowSnapshot;
use crate::session::Phase;

/// Visibility flags for the device-auth card.
///
/// The card has three steps: the start affordance, the verification
/// instructions, and the outcome panel with a success or error branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// Step 1: the "get sign-in code" affordance.
    pub show_start: bool,
    /// Whether the start affordance accepts input (off while a start
    /// request is in flight).
    pub start_enabled: bool,
    /// Step 2: verification URL, user code and the cancel affordance.
    pub show_verification: bool,
    /// Step 3, success branch: the identity label.
    pub show_success: bool,
    /// Step 3, error branch: the failure message.
    pub show_error: bool,
    /// Whether the retry affordance is offered.
    pub show_retry: bool,
}

impl ViewState {
    pub fn for_snapshot(snapshot: &FlowSnapshot) -> Self {
        Self::for_phase(snapshot.phase)
    }

    pub fn for_phase(phase: Phase) -> Self {
        let hidden = Self {
            show_start: false,
            start_enabled: false,
            show_verification: false,
            show_success: false,
            show_error: false,
            show_retry: false,
        };
        match phase {
            Phase::Idle => Self {
                show_start: true,
                start_enabled: true,
                ..hidden
            },
            Phase::Starting => Self {
                show_start: true,
                ..hidden
            },
            Phase::AwaitingApproval => Self {
                show_verification: true,
                ..hidden
            },
            Phase::Succeeded => Self {
                show_success: true,
                ..hidden
            },
            Phase::Failed => Self {
                show_error: true,
                show_retry: true,
                ..hidden
            },
            // Cancellation lands back on step 1; starting over is the
            // retry affordance here.
            Phase::Cancelled => Self {
                show_start: true,
                start_enabled: true,
                show_retry: true,
                ..hidden
            },
        }
    }
}
