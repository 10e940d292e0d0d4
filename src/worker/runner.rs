//! Serialized digest execution shared by the scheduler and the `now` command.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::digest::DigestBuilder;
use crate::core::models::DigestOutcome;
use crate::core::store::ConfigStore;
use crate::errors::BotError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Scheduled => write!(f, "scheduled"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// Runs digests one at a time and records successful runs in the store.
pub struct DigestRunner {
    builder: DigestBuilder,
    store: Arc<ConfigStore>,
    in_progress: Mutex<()>,
}

impl DigestRunner {
    #[must_use]
    pub fn new(builder: DigestBuilder, store: Arc<ConfigStore>) -> Self {
        Self {
            builder,
            store,
            in_progress: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.in_progress.try_lock().is_err()
    }

    /// Run one digest unless another is in flight, then advance
    /// `lastSummaryTime` if the run counts as a success.
    ///
    /// # Errors
    ///
    /// Propagates the digest failure; the last summary time is left alone so
    /// the next run covers the missed window.
    pub async fn run(&self, trigger: Trigger) -> Result<DigestOutcome, BotError> {
        let Ok(_guard) = self.in_progress.try_lock() else {
            warn!(%trigger, "A summary run is already in progress, skipping");
            return Ok(DigestOutcome::Busy);
        };

        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("digest_run", %run_id, %trigger);

        async {
            info!("Running summary task");
            let outcome = self.builder.run().await?;

            if let Some(window_end) = outcome.window_end() {
                if self.store.update_last_summary_time(window_end).await {
                    info!(?outcome, "Summary completed successfully");
                } else {
                    error!(?outcome, "Summary completed but the last summary time was not saved");
                }
            } else {
                info!(?outcome, "Summary run did not complete");
            }

            Ok(outcome)
        }
        .instrument(span)
        .await
    }
}
