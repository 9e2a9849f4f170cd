//! ==============================================================================
//! poller.rs - recurring log poll
//! ==============================================================================
//!
//! purpose:
//!     runs DeviceStatusClient::poll_logs on a fixed period as a tokio task
//!     owned by a PollHandle. the first tick fires immediately, or at a given
//!     instant when startup already did the first poll.
//!
//! ordering:
//!     each poll is awaited before the next tick is taken, and late ticks are
//!     skipped rather than bunched, so a slow device never sees two /logs
//!     requests from this loop at once and an older snapshot can't land
//!     after a newer one.
//!
//! relationships:
//!     - used by: main.rs (watch command)
//!     - uses: client.rs
//!
//! ==============================================================================

use crate::client::DeviceStatusClient;
use crate::device::DeviceApi;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_millis(1_000);

/// stops the poll task when cancelled or dropped
#[derive(Debug)]
pub struct PollHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// cancel and wait for the task to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("[POLL] log poller exited abnormally: {}", e);
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub struct LogPoller;

impl LogPoller {
    pub fn spawn<D: DeviceApi>(client: Arc<DeviceStatusClient<D>>, period: Duration) -> PollHandle {
        Self::spawn_at(client, Instant::now(), period)
    }

    /// first poll at `start`, then every `period`
    pub fn spawn_at<D: DeviceApi>(
        client: Arc<DeviceStatusClient<D>>,
        start: Instant,
        period: Duration,
    ) -> PollHandle {
        let token = CancellationToken::new();
        let child = token.child_token();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::debug!("[POLL] log poller started ({:?} interval)", period);

            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = client.poll_logs() => {}
                }
            }
            tracing::debug!("[POLL] log poller stopped");
        });

        PollHandle { token, task: Some(task) }
    }
}
