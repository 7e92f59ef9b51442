//! Speech transcription results.

use serde::{Deserialize, Serialize};

/// One timed segment of transcribed speech.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment start in seconds
    pub start: f64,
    /// Segment end in seconds
    pub end: f64,
    /// Transcribed text
    pub text: String,
}

impl TranscriptSegment {
    /// Segment duration in seconds.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Full transcription of an uploaded narration track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Complete transcribed text
    pub text: String,
    /// Detected language code (e.g. "en")
    pub language: Option<String>,
    /// Timed segments
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Total spoken duration in seconds (end of last segment).
    pub fn duration_secs(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }

    /// Whether any speech was recognized.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
