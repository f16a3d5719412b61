use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use tracing::info;

use hearth_types::api::{ApplySetsQuery, ApplySetsResponse, Claims, MemberFailureResponse};
use hearth_types::models::{HouseId, HouseSetting, SetMember};

use crate::auth::{AppState, run_blocking};
use crate::error::ApiError;
use crate::middleware::{ensure_owner, ensure_owner_of_all};
use crate::reconcile::{self, ApplyMode, ApplyReport};

pub async fn list_settings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(house_id): Path<HouseId>,
) -> Result<Json<Vec<HouseSetting>>, ApiError> {
    ensure_owner(&state, claims.sub, house_id).await?;
    let settings = run_blocking(&state, move |s| Ok(s.db.get_house_settings(house_id)?)).await?;
    Ok(Json(settings))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((house_id, name)): Path<(HouseId, String)>,
) -> Result<Json<Vec<SetMember>>, ApiError> {
    ensure_owner(&state, claims.sub, house_id).await?;
    let members = run_blocking(&state, move |s| Ok(s.db.get_set_members(house_id, &name)?)).await?;
    Ok(Json(members))
}

pub async fn select_setting(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((house_id, name)): Path<(HouseId, String)>,
) -> Result<Json<ApplySetsResponse>, ApiError> {
    ensure_owner(&state, claims.sub, house_id).await?;

    let log_name = name.clone();
    let report = run_blocking(&state, move |s| {
        Ok(reconcile::select_setting(&s.db, house_id, &name)?)
    })
    .await?;

    info!("house {}: setting {:?} selected", house_id, log_name);
    Ok(Json(publish_report(&state, report)))
}

/// Apply a list of set members. Every house named in the list must belong
/// to the caller. `?atomic=true` switches to all-or-nothing.
pub async fn apply_sets(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ApplySetsQuery>,
    Json(members): Json<Vec<SetMember>>,
) -> Result<Json<ApplySetsResponse>, ApiError> {
    let mut house_ids: Vec<HouseId> = members.iter().map(|m| m.house_id).collect();
    house_ids.sort_unstable();
    house_ids.dedup();
    ensure_owner_of_all(&state, claims.sub, house_ids).await?;

    let mode = if query.atomic {
        ApplyMode::Atomic
    } else {
        ApplyMode::BestEffort
    };

    let report = run_blocking(&state, move |s| {
        Ok(reconcile::apply_many(&s.db, &members, mode)?)
    })
    .await?;
    Ok(Json(publish_report(&state, report)))
}

fn publish_report(state: &AppState, report: ApplyReport) -> ApplySetsResponse {
    let applied = report.applied.len();
    for entry in report.applied {
        state.activity.publish(entry);
    }

    ApplySetsResponse {
        applied,
        failures: report
            .failures
            .into_iter()
            .map(|f| MemberFailureResponse {
                index: f.index,
                error: f.error.to_string(),
            })
            .collect(),
    }
}
