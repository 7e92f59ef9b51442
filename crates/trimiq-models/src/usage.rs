//! Minutes-used billing ledger types.
//!
//! Each time processed media minutes are debited from an account, a
//! transaction is recorded with the operation details and the balance
//! remaining afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type of billable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageOperationType {
    /// Speech-to-text transcription of uploaded narration
    Transcription,
    /// Text/clip embedding and similarity ranking
    SceneMatching,
    /// Final video assembly
    Assembly,
    /// Manual admin adjustment (refund, correction, etc.)
    AdminAdjustment,
}

impl UsageOperationType {
    /// Returns the operation type as a string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcription => "transcription",
            Self::SceneMatching => "scene_matching",
            Self::Assembly => "assembly",
            Self::AdminAdjustment => "admin_adjustment",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "transcription" => Some(Self::Transcription),
            "scene_matching" => Some(Self::SceneMatching),
            "assembly" => Some(Self::Assembly),
            "admin_adjustment" => Some(Self::AdminAdjustment),
            _ => None,
        }
    }
}

/// A minutes-used billing transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageTransaction {
    /// Unique identifier for this transaction (UUID)
    pub id: String,

    /// User who was charged
    pub user_id: i64,

    /// When the transaction occurred
    pub timestamp: DateTime<Utc>,

    /// Type of operation that consumed minutes
    pub operation_type: UsageOperationType,

    /// Minutes of processed media charged
    pub minutes: f64,

    /// Human-readable description of the operation
    pub description: String,

    /// Account balance after this transaction
    pub balance_after: f64,

    /// Associated render job (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl UsageTransaction {
    /// Create a new usage transaction.
    pub fn new(
        id: String,
        user_id: i64,
        operation_type: UsageOperationType,
        minutes: f64,
        description: String,
        balance_after: f64,
    ) -> Self {
        Self {
            id,
            user_id,
            timestamp: Utc::now(),
            operation_type,
            minutes,
            description,
            balance_after,
            job_id: None,
        }
    }

    /// Set the job ID.
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_type_round_trip() {
        for op in [
            UsageOperationType::Transcription,
            UsageOperationType::SceneMatching,
            UsageOperationType::Assembly,
            UsageOperationType::AdminAdjustment,
        ] {
            assert_eq!(UsageOperationType::from_str(op.as_str()), Some(op));
        }
        assert_eq!(UsageOperationType::from_str("unknown"), None);
    }

    #[test]
    fn test_transaction_job_id_optional() {
        let tx = UsageTransaction::new(
            "tx-1".into(),
            7,
            UsageOperationType::Assembly,
            2.5,
            "2.5 minutes rendered".into(),
            17.5,
        );
        let json = serde_json::to_string(&tx).unwrap();
        assert!(!json.contains("job_id"));

        let tx = tx.with_job_id("job-9");
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("job-9"));
    }
}
