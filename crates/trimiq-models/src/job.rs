//! Render job status tracking.
//!
//! Jobs run in-process; this module provides the status snapshot the API
//! serves to polling clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique render job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job accepted, pipeline not yet started
    #[default]
    Queued,
    /// Pipeline is actively running
    Processing,
    /// Output rendered and billed
    Completed,
    /// Pipeline failed with an error
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status snapshot for a render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobState {
    /// Unique job identifier
    pub job_id: JobId,
    /// User who owns this job
    pub user_id: i64,
    /// Current job status
    pub status: JobStatus,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Current processing step description
    pub current_step: Option<String>,
    /// Error message if the job failed
    pub error_message: Option<String>,
    /// Path of the rendered output (set on completion)
    pub output_path: Option<String>,
    /// When the output is deleted by the cleanup timer
    pub expires_at: Option<DateTime<Utc>>,
    /// When the job was accepted
    pub created_at: DateTime<Utc>,
    /// When the status was last updated
    pub updated_at: DateTime<Utc>,
}

impl JobState {
    /// Create a new queued job.
    pub fn new(job_id: JobId, user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            user_id,
            status: JobStatus::Queued,
            progress: 0,
            current_step: None,
            error_message: None,
            output_path: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Update progress and the current step label.
    pub fn set_progress(&mut self, progress: u8, step: impl Into<String>) {
        self.status = JobStatus::Processing;
        self.progress = progress.min(100);
        self.current_step = Some(step.into());
        self.updated_at = Utc::now();
    }

    /// Mark job as completed with the rendered output.
    pub fn complete(&mut self, output_path: impl Into<String>, expires_at: DateTime<Utc>) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.current_step = Some("Complete".into());
        self.output_path = Some(output_path.into());
        self.expires_at = Some(expires_at);
        self.updated_at = Utc::now();
    }

    /// Mark job as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Check whether the rendered output has passed its deletion deadline.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_creation() {
        let state = JobState::new(JobId::new(), 1);
        assert_eq!(state.status, JobStatus::Queued);
        assert_eq!(state.progress, 0);
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_job_state_transitions() {
        let mut state = JobState::new(JobId::new(), 1);

        state.set_progress(40, "Transcribing narration");
        assert_eq!(state.status, JobStatus::Processing);
        assert_eq!(state.progress, 40);

        state.complete("output/123.mp4", Utc::now() + chrono::Duration::hours(24));
        assert_eq!(state.status, JobStatus::Completed);
        assert_eq!(state.progress, 100);
        assert!(state.is_terminal());
        assert!(!state.is_expired(Utc::now()));
    }

    #[test]
    fn test_job_expiry() {
        let mut state = JobState::new(JobId::new(), 1);
        state.complete("output/123.mp4", Utc::now() - chrono::Duration::hours(1));
        assert!(state.is_expired(Utc::now()));
    }

    #[test]
    fn test_progress_clamped() {
        let mut state = JobState::new(JobId::new(), 1);
        state.set_progress(250, "step");
        assert_eq!(state.progress, 100);
    }
}
