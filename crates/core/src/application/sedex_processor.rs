// Sedex Message State Processor
//
// Consumes `sedex-state` events and owns the terminal transitions of
// SyncJob rows. The decision is a pure function of the persisted
// SedexMessage set, so it is safe to recompute on every event regardless
// of ordering.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{MessageHeaders, SedexMessageState};
use crate::error::{AppError, Result};
use crate::port::{StateStore, TimeProvider};

use super::full_sync::FullSyncStateManager;

pub struct SedexMessageStateProcessor {
    store: Arc<dyn StateStore>,
    full_sync: Arc<FullSyncStateManager>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SedexMessageStateProcessor {
    pub fn new(
        store: Arc<dyn StateStore>,
        full_sync: Arc<FullSyncStateManager>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            full_sync,
            time_provider,
        }
    }

    /// Handle one sedex-state event. A missing or unknown job id is a
    /// `SyncJobNotFound` error; the consumer loop rejects such messages to
    /// the broker's dead-letter policy.
    pub async fn process(&self, headers: &MessageHeaders) -> Result<()> {
        let Some(job_id) = headers.job_id.as_deref() else {
            return Err(AppError::SyncJobNotFound(
                "sedex-state event without jobId".to_string(),
            ));
        };

        let mut unit = self.store.begin().await?;
        let Some(mut job) = unit.find_sync_job(job_id).await? else {
            unit.rollback().await?;
            return Err(AppError::SyncJobNotFound(job_id.to_string()));
        };

        if job.is_terminal() {
            // Late redelivery must not regress a settled job
            warn!(job_id = %job_id, state = %job.state, "Ignoring sedex-state event for terminal job");
            return unit.rollback().await;
        }

        let messages = unit.find_sedex_messages_by_job_id(job_id).await?;
        let all_successful = !messages.is_empty()
            && messages
                .iter()
                .all(|m| m.state == SedexMessageState::Successful);
        let any_failed = messages
            .iter()
            .any(|m| m.state == SedexMessageState::Failed);

        let now = self.time_provider.now_millis();
        let failed = if all_successful {
            job.complete(now)?;
            false
        } else if any_failed {
            job.fail(now)?;
            true
        } else {
            debug!(job_id = %job_id, messages = messages.len(), "Sedex message set not settled yet");
            return unit.rollback().await;
        };

        unit.update_sync_job(&job).await?;
        unit.commit().await?;

        if failed {
            self.full_sync.escalate_failure(job_id).await?;
        }
        Ok(())
    }
}
