//! Hourly trigger for digest runs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::runner::{DigestRunner, Trigger};

/// Work performed on every scheduler firing. Implementations must not panic
/// on ordinary failures; log them instead.
#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    async fn fire(&self);
}

#[async_trait]
impl ScheduledJob for DigestRunner {
    async fn fire(&self) {
        match self.run(Trigger::Scheduled).await {
            Ok(outcome) => info!(?outcome, "Scheduled summary task finished"),
            Err(e) => error!("Error in scheduled summary task: {}", e),
        }
    }
}

/// The next wall-clock hour boundary strictly after `now`.
#[must_use]
pub fn next_top_of_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let hour = TimeDelta::hours(1);
    let floor = now.duration_trunc(hour).unwrap_or(now);
    floor + hour
}

/// Hour boundaries to sleep towards. Each tick follows the previously
/// scheduled boundary, so an early wake-up cannot schedule the same hour twice.
#[derive(Debug, Default)]
struct HourlyTicks {
    last_tick: Option<DateTime<Utc>>,
}

impl HourlyTicks {
    fn next_tick(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let from = self.last_tick.map_or(now, |last| last.max(now));
        let tick = next_top_of_hour(from);
        self.last_tick = Some(tick);
        tick
    }

    fn delay_from(&mut self, now: DateTime<Utc>) -> Duration {
        (self.next_tick(now) - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Owns the timer task. Dropping the handle does not stop it; call [`Scheduler::stop`].
pub struct Scheduler {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Fire `job` at the top of every hour.
    #[must_use]
    pub fn start(job: Arc<dyn ScheduledJob>) -> Self {
        let mut ticks = HourlyTicks::default();
        let scheduler = Self::start_with_delay(job, move || ticks.delay_from(Utc::now()));
        info!("Hourly summary scheduler set up");
        scheduler
    }

    /// Fire `job` after each delay returned by `next_delay`.
    #[must_use]
    pub fn start_with_delay<F>(job: Arc<dyn ScheduledJob>, mut next_delay: F) -> Self
    where
        F: FnMut() -> Duration + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            loop {
                let wait = next_delay();
                tokio::select! {
                    () = tokio::time::sleep(wait) => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                if *stop_rx.borrow() {
                    break;
                }

                info!("Running scheduled summary task");
                let job = Arc::clone(&job);
                // Each firing is independent; a hung run never delays the next tick.
                tokio::spawn(async move { job.fire().await });
            }
        });

        Self { stop_tx, handle }
    }

    /// Cancel future firings. A run already in flight is left to finish.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
        info!("Hourly summary scheduler stopped");
    }

    /// Wait for the timer task to exit after [`Scheduler::stop`].
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!("Scheduler task ended abnormally: {}", e);
        }
    }
}
