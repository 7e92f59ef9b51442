//! Render job status polling.

use axum::extract::{Path, State};
use axum::Json;

use trimiq_models::{JobId, JobState};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Get the status of a render job owned by the authenticated user.
///
/// Jobs belonging to other users report 404 rather than 403 so job IDs
/// cannot be probed.
pub async fn get_job(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobState>> {
    let job_id = JobId::from(job_id);
    let job = state
        .jobs
        .get(&job_id)
        .await
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let record = state
        .db
        .find_by_email(&user.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown account"))?;

    if job.user_id != record.id {
        return Err(ApiError::not_found("Job not found"));
    }

    Ok(Json(job))
}
