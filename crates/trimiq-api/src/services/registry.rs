//! In-memory render job registry.
//!
//! Jobs run in-process, so their status lives in process memory. The
//! cleanup service evicts terminal entries once their outputs expire.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use trimiq_models::{JobId, JobState};

/// Registry of active and recently finished jobs.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobState>>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new job.
    pub async fn insert(&self, state: JobState) {
        self.jobs.write().await.insert(state.job_id.clone(), state);
    }

    /// Snapshot of a job's current state.
    pub async fn get(&self, job_id: &JobId) -> Option<JobState> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Apply an update to a job, if it still exists.
    pub async fn update<F>(&self, job_id: &JobId, f: F)
    where
        F: FnOnce(&mut JobState),
    {
        if let Some(state) = self.jobs.write().await.get_mut(job_id) {
            f(state);
        }
    }

    /// Fail every non-terminal job that has not made progress since
    /// `cutoff`, stamping `expires_at` so a later sweep reclaims it.
    ///
    /// A pipeline task that dies without reaching its completion or failure
    /// path leaves its job in `Processing`; without this the entry and its
    /// scratch directory would never be reclaimed.
    pub async fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Vec<JobId> {
        let mut jobs = self.jobs.write().await;
        let mut stale = Vec::new();
        for state in jobs.values_mut() {
            if !state.is_terminal() && state.updated_at < cutoff {
                state.fail("Job timed out without completing");
                state.expires_at = Some(expires_at);
                stale.push(state.job_id.clone());
            }
        }
        stale
    }

    /// Remove and return all terminal jobs whose outputs have expired.
    pub async fn take_expired(&self, now: DateTime<Utc>) -> Vec<JobState> {
        let mut jobs = self.jobs.write().await;
        let expired: Vec<JobId> = jobs
            .values()
            .filter(|j| j.is_terminal() && j.is_expired(now))
            .map(|j| j.job_id.clone())
            .collect();
        expired.iter().filter_map(|id| jobs.remove(id)).collect()
    }

    /// Number of tracked jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trimiq_models::JobStatus;

    #[tokio::test]
    async fn test_insert_and_get() {
        let registry = JobRegistry::new();
        let id = JobId::new();
        registry.insert(JobState::new(id.clone(), 1)).await;

        let state = registry.get(&id).await.unwrap();
        assert_eq!(state.status, JobStatus::Queued);
        assert!(registry.get(&JobId::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_update() {
        let registry = JobRegistry::new();
        let id = JobId::new();
        registry.insert(JobState::new(id.clone(), 1)).await;

        registry
            .update(&id, |s| s.set_progress(30, "Matching scenes"))
            .await;

        let state = registry.get(&id).await.unwrap();
        assert_eq!(state.progress, 30);
        assert_eq!(state.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_fail_stale_reclaims_stuck_processing_job() {
        let registry = JobRegistry::new();
        let now = Utc::now();

        let stuck_id = JobId::new();
        let mut stuck = JobState::new(stuck_id.clone(), 1);
        stuck.set_progress(35, "Matching scenes");
        stuck.updated_at = now - chrono::Duration::hours(3);
        registry.insert(stuck).await;

        let fresh_id = JobId::new();
        let mut fresh = JobState::new(fresh_id.clone(), 1);
        fresh.set_progress(10, "Transcribing narration");
        registry.insert(fresh).await;

        let stale = registry
            .fail_stale(now - chrono::Duration::hours(2), now)
            .await;
        assert_eq!(stale, vec![stuck_id.clone()]);

        let state = registry.get(&stuck_id).await.unwrap();
        assert_eq!(state.status, JobStatus::Failed);
        assert!(state.expires_at.is_some());

        // The failed-and-expired job is now reachable by the sweep
        let taken = registry.take_expired(now).await;
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].job_id, stuck_id);
        assert!(registry.get(&fresh_id).await.is_some());
    }

    #[tokio::test]
    async fn test_take_expired_only_removes_expired_terminal_jobs() {
        let registry = JobRegistry::new();
        let now = Utc::now();

        let expired_id = JobId::new();
        let mut expired = JobState::new(expired_id.clone(), 1);
        expired.complete("output/a.mp4", now - chrono::Duration::hours(1));
        registry.insert(expired).await;

        let live_id = JobId::new();
        let mut live = JobState::new(live_id.clone(), 1);
        live.complete("output/b.mp4", now + chrono::Duration::hours(1));
        registry.insert(live).await;

        let running_id = JobId::new();
        registry.insert(JobState::new(running_id.clone(), 1)).await;

        let taken = registry.take_expired(now).await;
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].job_id, expired_id);
        assert_eq!(registry.len().await, 2);
        assert!(registry.get(&live_id).await.is_some());
        assert!(registry.get(&running_id).await.is_some());
    }
}
