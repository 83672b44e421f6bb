//! The session controller: owns the single device-auth session and its
//! phase, and is the only writer of either.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use clawsetup_protocol::IdentityResult;
use clawsetup_protocol::PollOutcome;
use clawsetup_protocol::SessionId;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::client::SetupServerClient;
use crate::error::FlowError;
use crate::poller::PollConfig;
use crate::poller::Poller;
use crate::session::DeviceAuthSession;
use crate::session::FlowSnapshot;
use crate::session::Phase;

/// State shared between the controller and its poller task.
pub(crate) struct Shared {
    pub(crate) client: Arc<dyn SetupServerClient>,
    state: Mutex<FlowState>,
    phase_tx: watch::Sender<Phase>,
}

#[derive(Default)]
struct FlowState {
    phase: Phase,
    provider_label: Option<String>,
    active: Option<ActiveSession>,
    identity: Option<IdentityResult>,
    failure: Option<FlowError>,
}

struct ActiveSession {
    session: DeviceAuthSession,
    poller: Poller,
}

impl Shared {
    pub(crate) fn new(client: Arc<dyn SetupServerClient>) -> Self {
        Self {
            client,
            state: Mutex::new(FlowState::default()),
            phase_tx: watch::Sender::new(Phase::Idle),
        }
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().expect("flow state mutex poisoned")
    }

    fn transition(&self, state: &mut FlowState, phase: Phase) {
        if state.phase != phase {
            info!(from = ?state.phase, to = ?phase, "device auth phase transition");
            state.phase = phase;
            self.phase_tx.send_replace(phase);
        }
    }

    /// Whether `session_id` no longer names the live session. Evaluated
    /// under the state lock immediately before a poll result is applied,
    /// so a response that was in flight when the session was cancelled or
    /// superseded is discarded instead of mutating state.
    fn is_stale(state: &FlowState, session_id: &SessionId) -> bool {
        match state.active.as_ref() {
            Some(active) => active.session.id != *session_id || active.poller.is_stopped(),
            None => true,
        }
    }

    /// Apply one poll outcome for `session_id`.
    ///
    /// Returns `true` when the poller should stop its loop: either the
    /// outcome was terminal or the session is no longer active.
    pub(crate) fn apply_poll_result(&self, session_id: &SessionId, outcome: PollOutcome) -> bool {
        let mut state = self.lock();
        if Self::is_stale(&state, session_id) {
            debug!(%session_id, "discarding poll result for inactive session");
            return true;
        }

        match outcome {
            PollOutcome::Pending => false,
            PollOutcome::Done(identity) => {
                if let Some(active) = state.active.take() {
                    active.poller.stop();
                }
                info!(%session_id, account = identity.label(), "device auth approved");
                state.identity = Some(identity);
                self.transition(&mut state, Phase::Succeeded);
                true
            }
            PollOutcome::Error(message) => {
                if let Some(active) = state.active.take() {
                    active.poller.stop();
                }
                state.failure = Some(FlowError::Protocol(message));
                self.transition(&mut state, Phase::Failed);
                true
            }
        }
    }

    /// Force the session into timeout failure after the poll budget ran
    /// out without a terminal server response.
    pub(crate) fn fail_with_timeout(&self, session_id: &SessionId) {
        let mut state = self.lock();
        if Self::is_stale(&state, session_id) {
            return;
        }
        if let Some(active) = state.active.take() {
            active.poller.stop();
        }
        warn!(%session_id, "device auth poll budget exhausted");
        state.failure = Some(FlowError::Timeout);
        self.transition(&mut state, Phase::Failed);
    }
}

/// Coordinates the device authorization flow against the control server.
///
/// Holds the single current session; every write to it goes through this
/// type (start/cancel/retry and the poll-result path). Clones share the
/// same underlying state.
#[derive(Clone)]
pub struct DeviceAuthController {
    shared: Arc<Shared>,
    config: PollConfig,
}

impl DeviceAuthController {
    pub fn new(client: Arc<dyn SetupServerClient>) -> Self {
        Self::with_poll_config(client, PollConfig::default())
    }

    pub fn with_poll_config(client: Arc<dyn SetupServerClient>, config: PollConfig) -> Self {
        Self {
            shared: Arc::new(Shared::new(client)),
            config,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.shared.lock().phase
    }

    /// Watch channel publishing every phase transition.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.shared.phase_tx.subscribe()
    }

    /// Read-only snapshot for presentation layers.
    pub fn snapshot(&self) -> FlowSnapshot {
        let state = self.shared.lock();
        FlowSnapshot {
            phase: state.phase,
            provider_label: state.provider_label.clone(),
            session: state.active.as_ref().map(|a| a.session.clone()),
            identity: state.identity.clone(),
            failure: state.failure.clone(),
        }
    }

    /// Begin a new session for `provider_label`.
    ///
    /// Issues exactly one start request. While a session is `Starting` or
    /// `AwaitingApproval` the call is rejected without touching it. A
    /// failed start ends in `Failed` and is never auto-retried.
    pub async fn start(&self, provider_label: &str) -> Result<(), FlowError> {
        {
            let mut state = self.shared.lock();
            if state.phase.is_active() {
                warn!(phase = ?state.phase, "start ignored: a session is already in progress");
                return Err(FlowError::InvariantViolation(
                    "a session is already in progress",
                ));
            }
            state.provider_label = Some(provider_label.to_string());
            state.identity = None;
            state.failure = None;
            self.shared.transition(&mut state, Phase::Starting);
        }

        let started = match self.shared.client.start_session().await {
            Ok(started) => started,
            Err(err) => {
                let mut state = self.shared.lock();
                // A cancel may have landed while the request was in
                // flight; it already reset the phase.
                if state.phase == Phase::Starting {
                    state.failure = Some(err.clone());
                    self.shared.transition(&mut state, Phase::Failed);
                }
                return Err(err);
            }
        };

        let session_id = started.session_id.clone();
        // The guard must be fully out of scope before any await below:
        // holding it across one would make this future `!Send`.
        let superseded = {
            let mut state = self.shared.lock();
            if state.phase != Phase::Starting {
                true
            } else {
                let poller = Poller::spawn(self.shared.clone(), session_id.clone(), self.config);
                state.active = Some(ActiveSession {
                    session: DeviceAuthSession {
                        id: started.session_id,
                        verification_url: started.verification_url,
                        user_code: started.user_code,
                    },
                    poller,
                });
                self.shared.transition(&mut state, Phase::AwaitingApproval);
                false
            }
        };
        if superseded {
            warn!(%session_id, "start superseded by cancel; discarding new session");
            self.notify_cancel(&session_id).await;
            return Err(FlowError::InvariantViolation("start was cancelled"));
        }
        Ok(())
    }

    /// Abandon the current flow.
    ///
    /// The poller is stopped before anything else so a late status
    /// response cannot mutate state, and the phase is back at `Idle`
    /// before the best-effort server notification is awaited. A failed
    /// notification is logged, never surfaced.
    pub async fn cancel(&self) {
        let cancelled = {
            let mut state = self.shared.lock();
            let active = state.active.take();
            if let Some(active) = &active {
                active.poller.stop();
            }
            state.identity = None;
            state.failure = None;
            if state.phase != Phase::Idle {
                // Cancelled collapses to Idle within the same call; the
                // start affordance is usable again immediately.
                self.shared.transition(&mut state, Phase::Cancelled);
                self.shared.transition(&mut state, Phase::Idle);
            }
            active.map(|a| a.session.id)
        };

        if let Some(session_id) = cancelled {
            self.notify_cancel(&session_id).await;
        }
    }

    /// Reset after a failure or cancellation so the operator can try again.
    pub fn retry(&self) -> Result<(), FlowError> {
        let mut state = self.shared.lock();
        if !matches!(state.phase, Phase::Failed | Phase::Cancelled) {
            warn!(phase = ?state.phase, "retry ignored: flow is not in a terminal failure state");
            return Err(FlowError::InvariantViolation(
                "retry is only valid after failure or cancellation",
            ));
        }
        state.active = None;
        state.identity = None;
        state.failure = None;
        self.shared.transition(&mut state, Phase::Idle);
        Ok(())
    }

    /// Apply a poll outcome as though the poller had observed it.
    ///
    /// Used by the poller task; exposed so embedders that receive status
    /// pushes out of band can feed them in. The stale-session guard
    /// applies either way.
    pub fn on_poll_result(&self, session_id: &SessionId, outcome: PollOutcome) {
        self.shared.apply_poll_result(session_id, outcome);
    }

    async fn notify_cancel(&self, session_id: &SessionId) {
        if let Err(err) = self.shared.client.cancel_session(session_id).await {
            warn!(%session_id, error = %err, "cancel notification failed");
        }
    }
}
