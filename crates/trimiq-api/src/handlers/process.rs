//! The video processing endpoint.

use std::path::{Path, PathBuf};

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::info;

use trimiq_models::{JobId, JobState, Resolution};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::{run_pipeline, PipelineInput};
use crate::state::AppState;

/// Maximum accepted text prompt length.
const MAX_PROMPT_LENGTH: usize = 5000;

/// Response for an accepted processing request.
#[derive(Serialize)]
pub struct ProcessVideoResponse {
    pub job_id: JobId,
    /// Relative URL of the rendered output (available once the job
    /// completes)
    pub video_url: String,
    /// Seconds until the rendered output is deleted
    pub expires_in: u64,
}

/// Uploads and form fields staged from the multipart body.
struct StagedRequest {
    audio_path: Option<PathBuf>,
    clip_paths: Vec<PathBuf>,
    text_prompt: Option<String>,
    resolution: Resolution,
}

/// Accept a processing request: stage the uploads, check the balance and
/// hand the job to the in-process pipeline.
pub async fn process_video(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<ProcessVideoResponse>> {
    let record = state
        .db
        .find_by_email(&user.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown account"))?;

    if !record.has_positive_balance() {
        return Err(ApiError::PaymentRequired(
            "Account balance is empty. Top up to process videos.".to_string(),
        ));
    }

    let job_id = JobId::new();
    let job_dir = state.config.job_dir(job_id.as_str());
    let upload_dir = job_dir.join("uploads");
    tokio::fs::create_dir_all(&upload_dir).await.map_err(|e| {
        ApiError::internal(format!("failed to create upload directory: {e}"))
    })?;

    let staged = match stage_uploads(multipart, &upload_dir, state.config.max_clips).await {
        Ok(staged) => staged,
        Err(e) => {
            // The scratch dir must not leak when the request is rejected
            tokio::fs::remove_dir_all(&job_dir).await.ok();
            return Err(e);
        }
    };

    if staged.clip_paths.is_empty() {
        tokio::fs::remove_dir_all(&job_dir).await.ok();
        return Err(ApiError::bad_request("At least one video clip is required"));
    }
    if staged.audio_path.is_none() && staged.text_prompt.is_none() {
        tokio::fs::remove_dir_all(&job_dir).await.ok();
        return Err(ApiError::bad_request(
            "Either a narration audio file or a text prompt is required",
        ));
    }

    let timestamp = chrono::Utc::now().timestamp_millis();
    let video_url = format!("output/{timestamp}.mp4");
    let output_path = state.config.data_dir.join(&video_url);
    let expires_in = state.config.auto_delete_hours * 3600;

    state.jobs.insert(JobState::new(job_id.clone(), record.id)).await;
    metrics::record_job_started();

    info!(
        job_id = %job_id,
        user_id = record.id,
        clips = staged.clip_paths.len(),
        resolution = %staged.resolution,
        "Accepted processing request"
    );

    let input = PipelineInput {
        job_id: job_id.clone(),
        user: record,
        audio_path: staged.audio_path,
        clip_paths: staged.clip_paths,
        text_prompt: staged.text_prompt,
        resolution: staged.resolution,
        output_url: video_url.clone(),
        output_path,
    };
    let pipeline_state = state.clone();
    tokio::spawn(async move {
        run_pipeline(pipeline_state, input).await;
    });

    Ok(Json(ProcessVideoResponse {
        job_id,
        video_url,
        expires_in,
    }))
}

/// Write the multipart fields into the job's upload directory.
async fn stage_uploads(
    mut multipart: Multipart,
    upload_dir: &Path,
    max_clips: usize,
) -> ApiResult<StagedRequest> {
    let mut staged = StagedRequest {
        audio_path: None,
        clip_paths: Vec::new(),
        text_prompt: None,
        resolution: Resolution::default(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart request: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio_file" => {
                let extension = safe_extension(field.file_name(), "wav");
                let path = upload_dir.join(format!("narration.{extension}"));
                if stream_to_file(field, &path).await? == 0 {
                    return Err(ApiError::bad_request("Empty audio upload"));
                }
                staged.audio_path = Some(path);
            }
            "video_files" => {
                if staged.clip_paths.len() >= max_clips {
                    return Err(ApiError::bad_request(format!(
                        "Too many clips (maximum {max_clips})"
                    )));
                }
                let extension = safe_extension(field.file_name(), "mp4");
                let path = upload_dir.join(format!(
                    "clip_{:03}.{extension}",
                    staged.clip_paths.len()
                ));
                if stream_to_file(field, &path).await? == 0 {
                    return Err(ApiError::bad_request("Empty clip upload"));
                }
                staged.clip_paths.push(path);
            }
            "text_prompt" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid text prompt: {e}")))?;
                let text = text.trim().to_string();
                if text.len() > MAX_PROMPT_LENGTH {
                    return Err(ApiError::bad_request(format!(
                        "Text prompt exceeds {MAX_PROMPT_LENGTH} characters"
                    )));
                }
                if !text.is_empty() {
                    staged.text_prompt = Some(text);
                }
            }
            "resolution" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid resolution: {e}")))?;
                staged.resolution = Resolution::from_str(value.trim()).ok_or_else(|| {
                    ApiError::bad_request(format!(
                        "Unknown resolution '{}'. Use 480p, 720p or 1080p.",
                        value.trim()
                    ))
                })?;
            }
            // Unknown fields are ignored rather than rejected
            _ => {}
        }
    }

    Ok(staged)
}

/// Write a multipart field to disk chunk by chunk, returning the byte
/// count. Uploads run to the request body limit, so they are never
/// buffered whole in memory.
async fn stream_to_file(mut field: Field<'_>, path: &Path) -> ApiResult<u64> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ApiError::internal(format!("failed to store upload: {e}")))?;

    let mut written = 0u64;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::bad_request(format!("Upload failed: {e}")))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("failed to store upload: {e}")))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("failed to store upload: {e}")))?;
    Ok(written)
}

/// File extension from the client-provided name, constrained to a short
/// alphanumeric token. Anything else falls back to the given default (no
/// path traversal via upload names).
fn safe_extension(file_name: Option<&str>, default: &str) -> String {
    file_name
        .and_then(|n| n.rsplit('.').next())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_extension() {
        assert_eq!(safe_extension(Some("clip.MP4"), "mp4"), "mp4");
        assert_eq!(safe_extension(Some("narration.wav"), "wav"), "wav");
        assert_eq!(safe_extension(Some("../../etc/passwd"), "mp4"), "mp4");
        assert_eq!(safe_extension(Some("noextension"), "mp4"), "mp4");
        assert_eq!(safe_extension(None, "wav"), "wav");
    }
}
