use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use super::runner::{AssessmentRunner, TickReport};

/// Periodic driver for a runner's countdown.
///
/// Stopping only ends the loop between ticks; a delivery already started by
/// the timer runs to completion.
pub struct Ticker {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn the tick loop on the current runtime.
    #[must_use]
    pub fn spawn(runner: Arc<AssessmentRunner>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        debug!(session_id = %runner.session_id(), "ticker stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        match runner.tick().await {
                            Ok(TickReport::Running { .. }) => {}
                            Ok(TickReport::Idle | TickReport::Expired(_)) => break,
                            Err(err) => {
                                warn!(session_id = %runner.session_id(), error = %err, "auto-submit failed");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Ask the loop to exit after its current tick.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the loop to exit.
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "ticker task failed");
            }
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
