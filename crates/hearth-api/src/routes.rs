use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use serde_json::{Value, json};

use crate::auth::{self, AppState};
use crate::middleware::{require_auth, require_device_key};
use crate::{devices, events, houses, settings, users};

/// Camera frames are posted whole.
const DEVICE_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(auth::login))
        // Token is checked in the handler, before the upgrade.
        .route("/houses/{house_id}/events", get(events::house_events));

    let protected_routes = Router::new()
        .route("/users/{id}", get(users::get_user))
        .route("/notifications", get(users::get_notifications))
        .route("/houses/{house_id}/dashboard", get(houses::get_dashboard))
        .route("/houses/{house_id}/activity", get(houses::get_activity))
        .route("/houses/{house_id}/light/on", post(devices::light_on))
        .route("/houses/{house_id}/light/off", post(devices::light_off))
        .route("/houses/{house_id}/light/level", post(devices::light_level))
        .route("/houses/{house_id}/fan/on", post(devices::fan_on))
        .route("/houses/{house_id}/fan/off", post(devices::fan_off))
        .route("/houses/{house_id}/fan/speed", post(devices::fan_speed))
        .route("/houses/{house_id}/settings", get(settings::list_settings))
        .route("/houses/{house_id}/settings/{name}/members", get(settings::list_members))
        .route("/houses/{house_id}/settings/{name}/select", post(settings::select_setting))
        .route("/sets", post(settings::apply_sets))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let device_routes = Router::new()
        .route("/devices/temperature", post(devices::push_temperature))
        .route("/devices/humidity", post(devices::push_humidity))
        .route("/devices/fan-speed", post(devices::push_fan_speed))
        .route("/devices/update", post(devices::update_device))
        .route("/devices/houses/{house_id}/faces", post(devices::enrol_face))
        .route("/devices/houses/{house_id}/faces/verify", post(devices::verify_face))
        .layer(DefaultBodyLimit::max(DEVICE_BODY_LIMIT))
        .layer(middleware::from_fn_with_state(state.clone(), require_device_key));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(device_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
