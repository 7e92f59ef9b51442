//! Timed output cleanup.
//!
//! Rendered outputs only live for `AUTO_DELETE_HOURS`; this service sweeps
//! the job registry on an interval, deletes expired outputs and job scratch
//! directories, and evicts the registry entries.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{info, warn};

use crate::metrics;
use crate::services::JobRegistry;

/// Interval between cleanup sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Non-terminal jobs with no progress for this long are considered dead
/// (their pipeline task never reported back) and are failed by the sweep.
const STALE_AFTER_SECS: i64 = 2 * 60 * 60;

/// Expired output cleanup service.
pub struct CleanupService {
    jobs: Arc<JobRegistry>,
    data_dir: PathBuf,
    enabled: bool,
}

impl CleanupService {
    /// Create a new cleanup service.
    pub fn new(jobs: Arc<JobRegistry>, data_dir: PathBuf) -> Self {
        let enabled = std::env::var("ENABLE_CLEANUP")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true); // Enabled by default

        Self {
            jobs,
            data_dir,
            enabled,
        }
    }

    /// Start the background sweep loop.
    ///
    /// Runs indefinitely and should be spawned as a background task.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Output cleanup is disabled");
            return;
        }

        info!("Starting cleanup service (interval: {:?})", SWEEP_INTERVAL);

        let mut ticker = interval(SWEEP_INTERVAL);

        loop {
            ticker.tick().await;

            let deleted = self.sweep_once().await;
            if deleted > 0 {
                info!("Cleanup sweep deleted {} expired output(s)", deleted);
            }
        }
    }

    /// Run a single sweep, returning the number of evicted jobs.
    pub async fn sweep_once(&self) -> usize {
        let now = Utc::now();
        let mut evicted = 0;

        for job in self.jobs.take_expired(now).await {
            if let Some(output) = &job.output_path {
                let path = self.data_dir.join(output);
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(
                            job_id = %job.job_id,
                            path = %path.display(),
                            "Failed to delete expired output, keeping job for retry: {e}"
                        );
                        // Re-register the job so the next sweep retries the
                        // unlink instead of leaking the file
                        self.jobs.insert(job).await;
                        continue;
                    }
                }
            }

            let scratch = self.data_dir.join("jobs").join(job.job_id.as_str());
            tokio::fs::remove_dir_all(&scratch).await.ok();

            metrics::record_output_deleted();
            evicted += 1;
        }

        // Jobs whose pipeline task died without reporting back: fail them
        // now, evict them (and their scratch dirs) on a later sweep. Marking
        // after eviction keeps the failure visible to polling clients for at
        // least one sweep interval.
        let cutoff = now - chrono::Duration::seconds(STALE_AFTER_SECS);
        for job_id in self.jobs.fail_stale(cutoff, now).await {
            warn!(job_id = %job_id, "Marked stalled job as failed");
        }

        evicted
    }
}
