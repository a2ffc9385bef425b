//! Periodic refresh of the current page
//!
//! The refresher does not fetch anything itself. Every interval it posts a
//! tick event into the session's event channel; the session then asks the
//! controller for a refresh fetch, which goes through the same last-write-wins
//! ticketing as user navigation.
//!
//! A refresher belongs to exactly one mounted view. It stops when cancelled,
//! when dropped, or when the event channel closes, so no timer outlives the
//! view that started it.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct PeriodicRefresher {
    generation: u64,
    period: Duration,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PeriodicRefresher {
    /// Start posting `make_tick(generation)` into `events` every `period`
    ///
    /// The first tick fires one full period after the call.
    pub fn spawn<E, F>(
        period: Duration,
        generation: u64,
        events: mpsc::UnboundedSender<E>,
        make_tick: F,
    ) -> Self
    where
        E: Send + 'static,
        F: Fn(u64) -> E + Send + 'static,
    {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => {
                        debug!(generation, "Refresher cancelled");
                        break;
                    }
                    _ = timer.tick() => {
                        if events.send(make_tick(generation)).is_err() {
                            debug!(generation, "Refresher event channel closed");
                            break;
                        }
                    }
                }
            }
        });

        debug!(generation, period_ms = period.as_millis() as u64, "Refresher started");

        Self {
            generation,
            period,
            token,
            handle,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the background task has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicRefresher {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
