//! The in-process video pipeline.
//!
//! Runs as a spawned task per accepted request: transcribe the narration,
//! rank the candidate clips against it via CLIP embeddings, assemble the
//! output with ffmpeg, then debit the processed minutes from the user's
//! balance.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{Duration, Utc};
use tracing::{error, info};

use trimiq_media::TranscribeOptions;
use trimiq_models::{JobId, Resolution, UsageOperationType, UserRecord};

use crate::metrics;
use crate::state::AppState;

/// Everything the pipeline needs, staged by the process-video handler.
pub struct PipelineInput {
    pub job_id: JobId,
    pub user: UserRecord,
    /// Uploaded narration track, if any
    pub audio_path: Option<PathBuf>,
    /// Candidate clips, in upload order
    pub clip_paths: Vec<PathBuf>,
    /// Text prompt used when no narration is uploaded
    pub text_prompt: Option<String>,
    pub resolution: Resolution,
    /// URL-relative output path returned to the client
    pub output_url: String,
    /// Absolute output path on disk
    pub output_path: PathBuf,
}

/// Run the pipeline for one job, updating the registry as it goes.
pub async fn run_pipeline(state: AppState, input: PipelineInput) {
    let job_id = input.job_id.clone();
    let started = Instant::now();

    match execute(&state, &input).await {
        Ok(minutes) => {
            let expires_at = Utc::now() + Duration::hours(state.config.auto_delete_hours as i64);
            state
                .jobs
                .update(&job_id, |s| s.complete(&input.output_url, expires_at))
                .await;
            metrics::record_job_completed();
            metrics::record_minutes_billed(minutes);
            info!(
                job_id = %job_id,
                minutes,
                output = %input.output_url,
                "Pipeline completed"
            );
        }
        Err(e) => {
            let expires_at = Utc::now() + Duration::hours(state.config.auto_delete_hours as i64);
            let message = format!("{e:#}");
            error!(job_id = %job_id, "Pipeline failed: {message}");
            state
                .jobs
                .update(&job_id, |s| {
                    s.fail(&message);
                    // Failed jobs are swept on the same schedule as outputs
                    s.expires_at = Some(expires_at);
                })
                .await;
            metrics::record_job_failed();
            // A partially written output must not outlive the failed job
            tokio::fs::remove_file(&input.output_path).await.ok();
        }
    }

    metrics::record_pipeline_duration(started.elapsed().as_secs_f64());
}

async fn execute(state: &AppState, input: &PipelineInput) -> anyhow::Result<f64> {
    let job_id = &input.job_id;
    let job_dir = state.config.job_dir(job_id.as_str());

    // 1. Narration text: transcript of the uploaded audio, else the prompt
    let narration = match &input.audio_path {
        Some(audio_path) => {
            state
                .jobs
                .update(job_id, |s| s.set_progress(10, "Transcribing narration"))
                .await;

            let transcribe_started = Instant::now();
            let transcript = trimiq_media::transcribe(
                audio_path,
                &TranscribeOptions {
                    model: state.config.whisper_model.clone(),
                    output_dir: job_dir.join("transcript"),
                },
            )
            .await?;
            metrics::record_transcribe_duration(transcribe_started.elapsed().as_secs_f64());

            if transcript.is_empty() {
                input
                    .text_prompt
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("no speech recognized and no text prompt given"))?
            } else {
                transcript.text
            }
        }
        None => input
            .text_prompt
            .clone()
            .ok_or_else(|| anyhow::anyhow!("neither narration audio nor text prompt given"))?,
    };

    // 2. Scene matching: keyframe per clip, embed, order by similarity
    state
        .jobs
        .update(job_id, |s| s.set_progress(35, "Matching scenes"))
        .await;

    let keyframe_dir = job_dir.join("keyframes");
    tokio::fs::create_dir_all(&keyframe_dir).await?;

    let mut keyframes = Vec::with_capacity(input.clip_paths.len());
    for (i, clip) in input.clip_paths.iter().enumerate() {
        let keyframe = keyframe_dir.join(format!("clip_{i:03}.jpg"));
        trimiq_media::extract_keyframe(clip, &keyframe).await?;
        keyframes.push(keyframe);
    }

    let text_embedding = state.embeddings.embed_text(&narration).await?;
    let clip_embeddings = state.embeddings.embed_images(&keyframes).await?;
    let ranked = trimiq_ml::rank_clips(&text_embedding, &clip_embeddings);

    let ordered: Vec<PathBuf> = ranked
        .iter()
        .map(|(i, _)| input.clip_paths[*i].clone())
        .collect();

    // 3. Assembly
    state
        .jobs
        .update(job_id, |s| s.set_progress(70, "Assembling video"))
        .await;

    trimiq_media::concat_clips(
        &ordered,
        input.audio_path.as_deref(),
        input.resolution,
        &input.output_path,
    )
    .await?;

    // 4. Billing: whole minutes of rendered output
    state
        .jobs
        .update(job_id, |s| s.set_progress(90, "Recording usage"))
        .await;

    let info = trimiq_media::probe_media(&input.output_path).await?;
    let minutes = trimiq_media::duration_minutes(info.duration);

    state
        .db
        .debit_minutes(
            input.user.id,
            minutes,
            state.config.billing_rate_per_minute,
            UsageOperationType::Assembly,
            &format!("Rendered {minutes:.0} minute(s) at {}", input.resolution),
            Some(job_id.as_str()),
        )
        .await?;

    Ok(minutes)
}
