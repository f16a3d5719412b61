use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use hearth_feeds::dashboard;
use hearth_types::api::Claims;
use hearth_types::models::{ActivityLog, DashboardSnapshot, HouseId};

use crate::auth::{AppState, run_blocking};
use crate::error::ApiError;
use crate::middleware::ensure_owner;

const DEFAULT_ACTIVITY_LIMIT: u32 = 100;
const MAX_ACTIVITY_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<u32>,
}

/// Current feed values for the house. Never fails on feed errors; fields that
/// could not be read are listed in `degraded`.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(house_id): Path<HouseId>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    ensure_owner(&state, claims.sub, house_id).await?;
    Ok(Json(dashboard::snapshot(&state.feeds, house_id).await))
}

pub async fn get_activity(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(house_id): Path<HouseId>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, ApiError> {
    ensure_owner(&state, claims.sub, house_id).await?;

    // Clamp limit to [1, MAX_ACTIVITY_LIMIT]
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);

    let entries = run_blocking(&state, move |s| Ok(s.db.get_activity_log(house_id, limit)?)).await?;
    Ok(Json(entries))
}
