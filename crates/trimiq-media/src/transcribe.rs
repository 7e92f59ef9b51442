//! Speech transcription via the whisper CLI.
//!
//! The whisper command is invoked with JSON output into a scratch directory;
//! the resulting `<stem>.json` is parsed into a [`Transcript`].

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use trimiq_models::{Transcript, TranscriptSegment};

use crate::error::{MediaError, MediaResult};

/// Options for a transcription run.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    /// Whisper model name (e.g. "base", "small")
    pub model: String,
    /// Directory the CLI writes its JSON output into
    pub output_dir: PathBuf,
}

/// Whisper CLI JSON output.
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    text: String,
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Transcribe an audio file.
pub async fn transcribe(
    audio_path: impl AsRef<Path>,
    options: &TranscribeOptions,
) -> MediaResult<Transcript> {
    let audio_path = audio_path.as_ref();

    if !audio_path.exists() {
        return Err(MediaError::FileNotFound(audio_path.to_path_buf()));
    }

    which::which("whisper").map_err(|_| MediaError::WhisperNotFound)?;
    tokio::fs::create_dir_all(&options.output_dir).await?;

    info!(
        audio = %audio_path.display(),
        model = %options.model,
        "Running whisper transcription"
    );

    let output = Command::new("whisper")
        .arg(audio_path)
        .args(["--model", &options.model])
        .args(["--output_format", "json"])
        .arg("--output_dir")
        .arg(&options.output_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::transcription_failed(
            "whisper exited with an error",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    let json_path = output_json_path(audio_path, &options.output_dir);
    debug!(path = %json_path.display(), "Reading whisper output");

    let raw = tokio::fs::read(&json_path).await.map_err(|_| {
        MediaError::transcription_failed(
            format!("whisper produced no output at {}", json_path.display()),
            None,
        )
    })?;

    let parsed: WhisperOutput = serde_json::from_slice(&raw)?;
    Ok(Transcript {
        text: parsed.text.trim().to_string(),
        language: parsed.language,
        segments: parsed
            .segments
            .into_iter()
            .map(|s| TranscriptSegment {
                start: s.start,
                end: s.end,
                text: s.text.trim().to_string(),
            })
            .collect(),
    })
}

/// Path of the JSON file whisper writes for the given input.
fn output_json_path(audio_path: &Path, output_dir: &Path) -> PathBuf {
    let stem = audio_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{stem}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_json_path() {
        let path = output_json_path(Path::new("/tmp/uploads/narration.wav"), Path::new("/tmp/out"));
        assert_eq!(path, PathBuf::from("/tmp/out/narration.json"));
    }

    #[test]
    fn test_whisper_output_parsing() {
        let raw = r#"{
            "text": " Hello world. ",
            "language": "en",
            "segments": [
                {"id": 0, "start": 0.0, "end": 2.1, "text": " Hello world."}
            ]
        }"#;
        let parsed: WhisperOutput = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text.trim(), "Hello world.");
        assert_eq!(parsed.segments.len(), 1);
        assert!((parsed.segments[0].end - 2.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_whisper_output_without_segments() {
        let raw = r#"{"text": "silence", "language": null}"#;
        let parsed: WhisperOutput = serde_json::from_str(raw).unwrap();
        assert!(parsed.segments.is_empty());
    }

    #[tokio::test]
    async fn test_transcribe_missing_file() {
        let options = TranscribeOptions {
            model: "base".into(),
            output_dir: std::env::temp_dir(),
        };
        let err = transcribe("/nonexistent/narration.wav", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
