use axum::{
    Extension, Json,
    extract::{Path, State},
};

use hearth_db::CredentialStore;
use hearth_types::api::Claims;
use hearth_types::models::{Notification, User, UserId};

use crate::auth::{AppState, run_blocking};
use crate::error::ApiError;

/// A user may only read their own record, and gets it with the password masked.
pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<UserId>,
) -> Result<Json<User>, ApiError> {
    if claims.sub != user_id {
        return Err(ApiError::Forbidden);
    }
    let user = run_blocking(&state, move |s| Ok(s.db.find_user_by_id(user_id)?.redacted())).await?;
    Ok(Json(user))
}

pub async fn get_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let user_id = claims.sub;
    let notifications = run_blocking(&state, move |s| {
        Ok(s.db.get_notifications_for_user(user_id)?)
    })
    .await?;
    Ok(Json(notifications))
}
