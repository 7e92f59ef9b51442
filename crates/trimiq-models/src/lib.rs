//! Shared data models for the TrimIQ backend.
//!
//! This crate provides Serde-serializable types for:
//! - User accounts and registration payloads
//! - Render jobs and their status snapshots
//! - Minutes-used billing ledger entries
//! - Transcription results
//! - Output resolution presets

pub mod job;
pub mod resolution;
pub mod transcript;
pub mod usage;
pub mod user;

// Re-export common types
pub use job::{JobId, JobState, JobStatus};
pub use resolution::Resolution;
pub use transcript::{Transcript, TranscriptSegment};
pub use usage::{UsageOperationType, UsageTransaction};
pub use user::{RegisterUser, UserRecord};
