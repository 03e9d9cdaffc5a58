// Full-Sync State Manager
//
// Singleton lifecycle of the current full-synchronization cycle. Every
// public operation is a critical section over the combined
// (state, job id, counter) tuple. The tuple is shadowed into the settings
// store when one is attached, so a restart resumes the cycle.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{DomainError, Setting};
use crate::error::Result;
use crate::port::{IdProvider, SettingRepository};

const SETTING_STATE: &str = "full-sync.state";
const SETTING_JOB_ID: &str = "full-sync.job-id";
const SETTING_SEED_COUNT: &str = "full-sync.seed-count";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullSyncState {
    Ready,
    Seeding,
    Seeded,
    Sending,
    Sent,
    Failed,
}

impl std::fmt::Display for FullSyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FullSyncState::Ready => write!(f, "READY"),
            FullSyncState::Seeding => write!(f, "SEEDING"),
            FullSyncState::Seeded => write!(f, "SEEDED"),
            FullSyncState::Sending => write!(f, "SENDING"),
            FullSyncState::Sent => write!(f, "SENT"),
            FullSyncState::Failed => write!(f, "FAILED"),
        }
    }
}

impl FullSyncState {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "READY" => Some(FullSyncState::Ready),
            "SEEDING" => Some(FullSyncState::Seeding),
            "SEEDED" => Some(FullSyncState::Seeded),
            "SENDING" => Some(FullSyncState::Sending),
            "SENT" => Some(FullSyncState::Sent),
            "FAILED" => Some(FullSyncState::Failed),
            _ => None,
        }
    }
}

struct Inner {
    state: FullSyncState,
    job_id: Option<String>,
    seed_count: u64,
}

pub struct FullSyncStateManager {
    inner: Mutex<Inner>,
    id_provider: Arc<dyn IdProvider>,
    settings: Option<Arc<dyn SettingRepository>>,
}

impl FullSyncStateManager {
    pub fn new(id_provider: Arc<dyn IdProvider>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: FullSyncState::Ready,
                job_id: None,
                seed_count: 0,
            }),
            id_provider,
            settings: None,
        }
    }

    /// Attach a settings store; the (state, job id, counter) tuple is
    /// persisted on every mutation and restorable via `restore`.
    pub fn with_settings(mut self, settings: Arc<dyn SettingRepository>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Reload the persisted tuple. Missing or unparseable settings leave
    /// the manager in READY.
    pub async fn restore(&self) -> Result<()> {
        let Some(settings) = &self.settings else {
            return Ok(());
        };

        let mut inner = self.inner.lock().await;
        inner.state = match settings.find_by_key(SETTING_STATE).await? {
            Some(s) => FullSyncState::parse(&s.value).unwrap_or(FullSyncState::Ready),
            None => FullSyncState::Ready,
        };
        inner.job_id = settings
            .find_by_key(SETTING_JOB_ID)
            .await?
            .map(|s| s.value)
            .filter(|v| !v.is_empty());
        inner.seed_count = settings
            .find_by_key(SETTING_SEED_COUNT)
            .await?
            .and_then(|s| s.value.parse().ok())
            .unwrap_or(0);

        info!(
            state = %inner.state,
            job_id = ?inner.job_id,
            seed_count = inner.seed_count,
            "Restored full-sync state"
        );
        Ok(())
    }

    async fn persist(&self, inner: &Inner) -> Result<()> {
        let Some(settings) = &self.settings else {
            return Ok(());
        };
        settings
            .upsert(&Setting::new(SETTING_STATE, inner.state.to_string()))
            .await?;
        settings
            .upsert(&Setting::new(
                SETTING_JOB_ID,
                inner.job_id.clone().unwrap_or_default(),
            ))
            .await?;
        settings
            .upsert(&Setting::new(
                SETTING_SEED_COUNT,
                inner.seed_count.to_string(),
            ))
            .await?;
        Ok(())
    }

    fn illegal(from: FullSyncState, to: FullSyncState) -> crate::error::AppError {
        DomainError::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
        .into()
    }

    /// READY -> SEEDING: opens admission with a fresh job id and reset
    /// counters. Returns the new job id.
    pub async fn start_seeding(&self) -> Result<String> {
        let mut inner = self.inner.lock().await;
        if inner.state != FullSyncState::Ready {
            return Err(Self::illegal(inner.state, FullSyncState::Seeding));
        }
        let job_id = self.id_provider.generate_id();
        inner.state = FullSyncState::Seeding;
        inner.job_id = Some(job_id.clone());
        inner.seed_count = 0;
        info!(job_id = %job_id, "Full sync seeding started");
        self.persist(&inner).await?;
        Ok(job_id)
    }

    /// SEEDING -> SEEDED: closes admission
    pub async fn submit_seeding(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state != FullSyncState::Seeding {
            return Err(Self::illegal(inner.state, FullSyncState::Seeded));
        }
        inner.state = FullSyncState::Seeded;
        info!(job_id = ?inner.job_id, seed_count = inner.seed_count, "Full sync seeding submitted");
        self.persist(&inner).await
    }

    /// SEEDING -> FAILED
    pub async fn fail_seeding(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state != FullSyncState::Seeding {
            return Err(Self::illegal(inner.state, FullSyncState::Failed));
        }
        inner.state = FullSyncState::Failed;
        warn!(job_id = ?inner.job_id, "Full sync seeding failed");
        self.persist(&inner).await
    }

    /// SEEDED -> SENDING: the batcher signalled the first outgoing sedex
    /// message for the job
    pub async fn start_sending(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state != FullSyncState::Seeded {
            return Err(Self::illegal(inner.state, FullSyncState::Sending));
        }
        inner.state = FullSyncState::Sending;
        info!(job_id = ?inner.job_id, "Full sync sending started");
        self.persist(&inner).await
    }

    /// SENDING -> SENT: the batcher signalled all outgoing sedex messages
    /// dispatched
    pub async fn complete_sending(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state != FullSyncState::Sending {
            return Err(Self::illegal(inner.state, FullSyncState::Sent));
        }
        inner.state = FullSyncState::Sent;
        info!(job_id = ?inner.job_id, "Full sync sending complete");
        self.persist(&inner).await
    }

    /// SEEDED | SENDING -> FAILED, driven by the state processors when the
    /// current job fails. A stale or foreign job id is ignored. Returns
    /// whether the manager transitioned.
    pub async fn escalate_failure(&self, job_id: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        if inner.job_id.as_deref() != Some(job_id) {
            debug!(job_id = %job_id, "Ignoring failure escalation for foreign job");
            return Ok(false);
        }
        if !matches!(inner.state, FullSyncState::Seeded | FullSyncState::Sending) {
            debug!(state = %inner.state, "Ignoring failure escalation in state");
            return Ok(false);
        }
        inner.state = FullSyncState::Failed;
        warn!(job_id = %job_id, "Full sync escalated to FAILED");
        self.persist(&inner).await?;
        Ok(true)
    }

    /// SENT | FAILED -> READY: clears counters and job id
    pub async fn reset(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !matches!(inner.state, FullSyncState::Sent | FullSyncState::Failed) {
            return Err(Self::illegal(inner.state, FullSyncState::Ready));
        }
        inner.state = FullSyncState::Ready;
        inner.job_id = None;
        inner.seed_count = 0;
        info!("Full sync reset");
        self.persist(&inner).await
    }

    pub async fn state(&self) -> FullSyncState {
        self.inner.lock().await.state
    }

    pub async fn is_in_state_seeding(&self) -> bool {
        self.inner.lock().await.state == FullSyncState::Seeding
    }

    pub async fn current_job_id(&self) -> Option<String> {
        self.inner.lock().await.job_id.clone()
    }

    /// Increment the seeded-message counter; safe under concurrent seeders.
    pub async fn inc_seed_counter(&self) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        inner.seed_count += 1;
        let count = inner.seed_count;
        self.persist(&inner).await?;
        Ok(count)
    }

    pub async fn seed_counter(&self) -> u64 {
        self.inner.lock().await.seed_count
    }
}
