//! Account balance and usage-history handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use trimiq_models::UsageTransaction;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Maximum allowed limit for usage history queries.
const MAX_LIMIT: u32 = 100;

/// Balance response.
#[derive(Serialize)]
pub struct BalanceResponse {
    pub balance: f64,
    pub minutes_used: f64,
    pub ad_revenue: f64,
}

/// Get the authenticated user's balance counters.
pub async fn get_balance(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<BalanceResponse>> {
    let (balance, minutes_used, ad_revenue) = state
        .db
        .balance(&user.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown account"))?;

    Ok(Json(BalanceResponse {
        balance,
        minutes_used,
        ad_revenue,
    }))
}

/// Query parameters for the usage history endpoint.
#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    /// Maximum number of transactions to return (clamped to 1..100).
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

/// Usage history response.
#[derive(Serialize)]
pub struct UsageResponse {
    pub transactions: Vec<UsageTransaction>,
}

/// Get the authenticated user's recent usage ledger, newest first.
pub async fn get_usage(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UsageQuery>,
) -> ApiResult<Json<UsageResponse>> {
    let record = state
        .db
        .find_by_email(&user.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown account"))?;

    let effective_limit = query.limit.clamp(1, MAX_LIMIT);
    let transactions = state.db.usage_history(record.id, effective_limit).await?;

    Ok(Json(UsageResponse { transactions }))
}
