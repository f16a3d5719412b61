//! Actuator commands issued by dashboard users, and the endpoints the
//! devices themselves push readings and camera frames to.

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
};
use tracing::{error, info, warn};

use hearth_db::DeviceStateStore;
use hearth_feeds::Command;
use hearth_feeds::face::FaceImage;
use hearth_types::api::{
    Claims, DeviceUpdateRequest, FaceVerifyResponse, FanSpeedReading, FanSpeedRequest,
    HumidityReading, LightLevelRequest, MessageResponse, TemperatureReading,
};
use hearth_types::models::HouseId;

use crate::auth::{AppState, run_blocking};
use crate::error::ApiError;
use crate::middleware::ensure_owner;
use crate::validation;

const DOOR_CAMERA: &str = "Door camera";

// -- Actuators --

pub async fn light_on(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(house_id): Path<HouseId>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_owner(&state, claims.sub, house_id).await?;
    actuate(state, house_id, Command::LightOn).await
}

pub async fn light_off(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(house_id): Path<HouseId>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_owner(&state, claims.sub, house_id).await?;
    actuate(state, house_id, Command::LightOff).await
}

pub async fn light_level(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(house_id): Path<HouseId>,
    Json(req): Json<LightLevelRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_owner(&state, claims.sub, house_id).await?;
    let level = validation::light_level(req.light_level)?;
    actuate(state, house_id, Command::LightLevel(level)).await
}

pub async fn fan_on(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(house_id): Path<HouseId>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_owner(&state, claims.sub, house_id).await?;
    actuate(state, house_id, Command::FanOn).await
}

pub async fn fan_off(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(house_id): Path<HouseId>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_owner(&state, claims.sub, house_id).await?;
    actuate(state, house_id, Command::FanOff).await
}

pub async fn fan_speed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(house_id): Path<HouseId>,
    Json(req): Json<FanSpeedRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_owner(&state, claims.sub, house_id).await?;
    let speed = validation::fan_speed(req.fan_speed)?;
    actuate(state, house_id, Command::FanSpeed(speed)).await
}

/// Send the command to its webhook and log it. The work runs on its own
/// task, so a caller that disconnects mid-request does not leave the
/// actuator switched without an activity entry.
async fn actuate(
    state: AppState,
    house_id: HouseId,
    command: Command,
) -> Result<Json<MessageResponse>, ApiError> {
    let task_state = state.clone();
    let task = tokio::spawn(async move {
        task_state.feeds.send_command(command).await?;

        let entry = run_blocking(&task_state, move |s| {
            Ok(s.db.append_activity(house_id, command.device(), &command.describe())?)
        })
        .await?;
        task_state.activity.publish(entry);
        Ok::<_, ApiError>(())
    });

    task.await.map_err(|e| {
        error!("actuator task join error: {}", e);
        ApiError::Internal
    })??;

    info!("house {}: {}", house_id, command.describe());
    Ok(Json(MessageResponse::new(command.describe())))
}

// -- Sensor pushes --

pub async fn push_temperature(
    State(state): State<AppState>,
    Json(req): Json<TemperatureReading>,
) -> Result<Json<MessageResponse>, ApiError> {
    let temp = validation::finite("temp", req.temp)?;
    record(&state, req.house_id, "Temperature", temp).await
}

pub async fn push_humidity(
    State(state): State<AppState>,
    Json(req): Json<HumidityReading>,
) -> Result<Json<MessageResponse>, ApiError> {
    let humid = validation::finite("humid", req.humid)?;
    record(&state, req.house_id, "Humidity", humid).await
}

pub async fn push_fan_speed(
    State(state): State<AppState>,
    Json(req): Json<FanSpeedReading>,
) -> Result<Json<MessageResponse>, ApiError> {
    let speed = validation::fan_speed_value(req.speed)?;
    record(&state, req.house_id, "Fan", speed).await
}

// Readings go to the history table only; the activity log is for changes.
async fn record(
    state: &AppState,
    house_id: HouseId,
    device_type: &'static str,
    value: f64,
) -> Result<Json<MessageResponse>, ApiError> {
    run_blocking(state, move |s| Ok(s.db.record_reading(house_id, device_type, value)?)).await?;
    Ok(Json(MessageResponse::new(format!("{} recorded", device_type))))
}

pub async fn update_device(
    State(state): State<AppState>,
    Json(req): Json<DeviceUpdateRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let device_type = validation::non_empty("device_type", &req.device_type)?.to_string();
    let data = validation::finite("data", req.data)?;
    let DeviceUpdateRequest {
        house_id,
        device_id,
        state: on,
        ..
    } = req;

    let entry = run_blocking(&state, move |s| {
        Ok(s.db.apply_raw_logged(house_id, device_id, &device_type, data, on)?)
    })
    .await?;
    state.activity.publish(entry);

    Ok(Json(MessageResponse::new("device updated")))
}

// -- Faces --

pub async fn enrol_face(
    State(state): State<AppState>,
    Path(house_id): Path<HouseId>,
    multipart: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    require_house(&state, house_id).await?;
    let image = read_image(multipart).await?;

    let encoding = state.feeds.encode_face(image).await?;

    let entry = run_blocking(&state, move |s| {
        Ok(s.db.add_face_encoding_logged(house_id, &encoding, DOOR_CAMERA, "Face enrolled")?)
    })
    .await?;
    state.activity.publish(entry);

    info!("house {}: face enrolled", house_id);
    Ok(Json(MessageResponse::new("face enrolled")))
}

pub async fn verify_face(
    State(state): State<AppState>,
    Path(house_id): Path<HouseId>,
    multipart: Multipart,
) -> Result<Json<FaceVerifyResponse>, ApiError> {
    require_house(&state, house_id).await?;
    let image = read_image(multipart).await?;

    let encodings = run_blocking(&state, move |s| Ok(s.db.get_face_encodings(house_id)?)).await?;
    let is_match = if encodings.is_empty() {
        warn!("house {}: verify requested with no enrolled faces", house_id);
        false
    } else {
        state.feeds.verify_face(image, &encodings).await?
    };

    let event = if is_match { "Face recognised" } else { "Face not recognised" };
    let entry = run_blocking(&state, move |s| {
        Ok(s.db.append_activity(house_id, DOOR_CAMERA, event)?)
    })
    .await?;
    state.activity.publish(entry);

    Ok(Json(FaceVerifyResponse { is_match }))
}

async fn require_house(state: &AppState, house_id: HouseId) -> Result<(), ApiError> {
    if run_blocking(state, move |s| Ok(s.db.house_exists(house_id)?)).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound)
    }
}

/// Pull the `img` field out of a multipart upload.
async fn read_image(mut multipart: Multipart) -> Result<FaceImage, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("img") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("image").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("img is empty".into()));
        }
        return Ok(FaceImage {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::BadRequest("missing img field".into()))
}
