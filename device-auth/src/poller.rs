//! Recurring status checks for an in-flight device-auth session.

use std::sync::Arc;
use std::time::Duration;

use clawsetup_protocol::SessionId;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::controller::Shared;

/// Poll cadence and budget.
///
/// Defaults match the reference wizard: a tick every 1.5 s with a
/// 200-attempt budget, roughly five minutes of waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1500),
            max_attempts: 200,
        }
    }
}

/// Handle to the recurring status-check task.
///
/// The loop issues one request per tick and awaits each response before
/// scheduling the next sleep, so the effective cadence is `interval` after
/// each response: slow responses self-throttle the polling rate. The first
/// tick fires after a full `interval`, never immediately.
pub(crate) struct Poller {
    cancel: CancellationToken,
}

impl Poller {
    pub(crate) fn spawn(shared: Arc<Shared>, session_id: SessionId, config: PollConfig) -> Self {
        let cancel = CancellationToken::new();
        tokio::spawn(run(shared, session_id, cancel.clone(), config));
        Self { cancel }
    }

    /// Stop the loop. Idempotent. No status request is issued after this
    /// returns: the loop checks cancellation before every request, and a
    /// response already in flight is abandoned (the stale-session guard
    /// would discard its result anyway).
    pub(crate) fn stop(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        // Dropping the handle stops the loop.
        self.cancel.cancel();
    }
}

async fn run(
    shared: Arc<Shared>,
    session_id: SessionId,
    cancel: CancellationToken,
    config: PollConfig,
) {
    let mut attempts: u32 = 0;

    loop {
        // First tick comes after a full interval, never immediately.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(config.interval) => {}
        }

        attempts += 1;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            res = shared.client.session_status(&session_id) => res,
        };

        match outcome {
            Ok(outcome) => {
                if shared.apply_poll_result(&session_id, outcome) {
                    return;
                }
            }
            Err(err) => {
                // Transient connectivity failures do not end the flow; the
                // next tick retries. The attempt still counts against the
                // budget.
                debug!(%session_id, attempt = attempts, error = %err, "transient status check failure");
            }
        }

        if attempts >= config.max_attempts {
            shared.fail_with_timeout(&session_id);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SetupServerClient;
    use crate::error::FlowError;
    use clawsetup_protocol::PollOutcome;
    use clawsetup_protocol::StartedSession;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use tokio::time::sleep;

    #[derive(Default)]
    struct CountingClient {
        status_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SetupServerClient for CountingClient {
        async fn start_session(&self) -> Result<StartedSession, FlowError> {
            Err(FlowError::Transport("not wired in this test".to_string()))
        }

        async fn session_status(&self, _: &SessionId) -> Result<PollOutcome, FlowError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            Ok(PollOutcome::Pending)
        }

        async fn cancel_session(&self, _: &SessionId) -> Result<(), FlowError> {
            Ok(())
        }
    }

    #[test]
    fn default_config_matches_the_wizard_budget() {
        let config = PollConfig::default();
        assert_eq!(Duration::from_millis(1500), config.interval);
        assert_eq!(200, config.max_attempts);
    }

    #[tokio::test]
    async fn first_tick_waits_a_full_interval() {
        let client = Arc::new(CountingClient::default());
        let shared = Arc::new(Shared::new(client.clone()));
        let poller = Poller::spawn(
            shared,
            SessionId::new("sess-1"),
            PollConfig {
                interval: Duration::from_millis(200),
                max_attempts: 5,
            },
        );

        sleep(Duration::from_millis(50)).await;
        assert_eq!(0, client.status_calls.load(Ordering::SeqCst));
        poller.stop();
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_prevents_further_requests() {
        let client = Arc::new(CountingClient::default());
        let shared = Arc::new(Shared::new(client.clone()));
        let poller = Poller::spawn(
            shared,
            SessionId::new("sess-1"),
            PollConfig {
                interval: Duration::from_millis(10),
                max_attempts: 100,
            },
        );

        poller.stop();
        poller.stop();
        assert!(poller.is_stopped());

        sleep(Duration::from_millis(80)).await;
        assert_eq!(0, client.status_calls.load(Ordering::SeqCst));
    }
}
