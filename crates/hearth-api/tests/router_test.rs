// Router-level tests: real handlers and middleware over an in-memory store,
// with wiremock standing in for the feed and webhook services.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hearth_api::auth::{AppState, AppStateInner, hash_password};
use hearth_api::events::ActivityBus;
use hearth_api::routes::router;
use hearth_db::{Database, DeviceStateStore};
use hearth_feeds::{FeedClient, FeedConfig, Webhooks};
use hearth_types::models::SetMember;

const SECRET: &str = "router-test-secret";
const DEVICE_KEY: &str = "router-test-device-key";
const BOUNDARY: &str = "hearth-test-boundary";

// ── Helpers ─────────────────────────────────────────────────────────

fn seeded_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    let alice = db.create_user("alice", &hash_password("alice-pass").unwrap()).unwrap();
    let bob = db.create_user("bob", &hash_password("bob-pass").unwrap()).unwrap();

    let home = db.create_house("Home").unwrap();
    let cabin = db.create_house("Cabin").unwrap();
    db.grant_ownership(alice, home).unwrap();
    db.grant_ownership(bob, cabin).unwrap();

    db.add_device(home, 5, "Fan", 0.0).unwrap();
    db.add_device(home, 6, "Light", 0.0).unwrap();
    db.add_device(home, 7, "Temperature", 18.0).unwrap();
    db.add_device(home, 8, "Humidity", 40.0).unwrap();
    db.add_device(cabin, 5, "Fan", 0.0).unwrap();

    db.create_setting(home, "Evening").unwrap();
    db.add_set_member(&member(home, 5, 10.0, false)).unwrap();
    db.create_setting(cabin, "Evening").unwrap();
    db.add_set_member(&member(cabin, 5, 10.0, false)).unwrap();
    db
}

fn member(house_id: i64, device_id: i64, device_data: f64, device_state: bool) -> SetMember {
    SetMember {
        house_id,
        name: "Evening".into(),
        device_id,
        device_data,
        device_state,
    }
}

fn app_with(feeds: FeedConfig) -> (Router, AppState) {
    let state: AppState = Arc::new(AppStateInner {
        db: seeded_db(),
        jwt_secret: SECRET.into(),
        device_key: DEVICE_KEY.into(),
        feeds: FeedClient::new(feeds).unwrap(),
        activity: ActivityBus::default(),
    });
    (router(state.clone()), state)
}

fn app() -> (Router, AppState) {
    app_with(FeedConfig::default())
}

async fn mock_feeds(server: &MockServer) -> FeedConfig {
    let uri = server.uri();
    FeedConfig {
        feed_base_url: format!("{uri}/houses/{{house_id}}/feeds"),
        webhooks: Webhooks {
            alarm: Some(format!("{uri}/hooks/alarm")),
            ..Webhooks::default()
        },
        timeout: Duration::from_secs(2),
        ..FeedConfig::default()
    }
}

async fn face_feeds(server: &MockServer) -> FeedConfig {
    FeedConfig {
        face_service_url: format!("{}/face", server.uri()),
        ..mock_feeds(server).await
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_with(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn device_post(uri: &str, key: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-device-key", key)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A device upload with a single file field.
fn multipart_post(uri: &str, field: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"door.jpg\"\r\n\
         Content-Type: image/jpeg\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .header("x-device-key", DEVICE_KEY)
        .body(Body::from(body))
        .unwrap()
}

fn fail_activity_inserts(state: &AppState) {
    state
        .db
        .with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER fail_activity BEFORE INSERT ON activity_log
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )?;
            Ok(())
        })
        .unwrap();
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        post_json("/auth/login", None, json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

// ── Auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_login_returns_masked_user_and_houses() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        post_json("/auth/login", None, json!({ "username": "alice", "password": "alice-pass" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["password"], "********");
    assert_eq!(body["house_ids"], json!([1]));
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_login_is_indistinguishable() {
    let (app, _) = app();
    let wrong = send(
        &app,
        post_json("/auth/login", None, json!({ "username": "alice", "password": "nope" })),
    )
    .await;
    let unknown = send(
        &app,
        post_json("/auth/login", None, json!({ "username": "nobody", "password": "alice-pass" })),
    )
    .await;

    assert_eq!(wrong.0, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.0, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.1, unknown.1);
    assert_eq!(wrong.1["error"], "invalid credentials");
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let (app, _) = app();
    let req = Request::get("/houses/1/settings").body(Body::empty()).unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, get_with("/houses/1/settings", "not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_can_only_read_self() {
    let (app, _) = app();
    let token = login(&app, "alice", "alice-pass").await;

    let (status, body) = send(&app, get_with("/users/1", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["password"], "********");

    let (status, _) = send(&app, get_with("/users/2", &token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Ownership and validation ────────────────────────────────────────

#[tokio::test]
async fn test_non_owner_is_forbidden() {
    let (app, _) = app();
    let token = login(&app, "bob", "bob-pass").await;

    let (status, _) = send(&app, get_with("/houses/1/settings", &token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, get_with("/houses/2/settings", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Evening");
}

#[tokio::test]
async fn test_out_of_range_commands_are_rejected() {
    let (app, _) = app();
    let token = login(&app, "alice", "alice-pass").await;

    let (status, body) = send(
        &app,
        post_json("/houses/1/light/level", Some(&token), json!({ "light_level": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("light_level"));

    let (status, _) = send(
        &app,
        post_json("/houses/1/fan/speed", Some(&token), json!({ "fan_speed": 101 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        post_json("/houses/1/fan/speed", Some(&token), json!({ "fan_speed": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ownership_is_checked_before_validation() {
    let (app, _) = app();
    let token = login(&app, "bob", "bob-pass").await;

    let (status, _) = send(
        &app,
        post_json("/houses/1/light/level", Some(&token), json!({ "light_level": 7 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        post_json("/houses/1/fan/speed", Some(&token), json!({ "fan_speed": 101 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unconfigured_webhook_is_bad_gateway() {
    let (app, _) = app();
    let token = login(&app, "alice", "alice-pass").await;

    let (status, _) = send(
        &app,
        post_json("/houses/1/fan/speed", Some(&token), json!({ "fan_speed": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

// ── Settings ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_apply_sets_then_activity() {
    let (app, state) = app();
    let token = login(&app, "alice", "alice-pass").await;

    let (status, body) = send(
        &app,
        post_json("/sets", Some(&token), json!([member(1, 5, 30.0, true)])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], 1);
    assert_eq!(body["failures"], json!([]));
    assert_eq!(state.db.current_value(1, "Fan").unwrap(), 30.0);

    let (status, body) = send(&app, get_with("/houses/1/activity", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["device"], "device 5");
    assert_eq!(body[0]["type_of_event"], "Evening: value=30 state=on");
}

#[tokio::test]
async fn test_apply_sets_reports_failures() {
    let (app, _) = app();
    let token = login(&app, "alice", "alice-pass").await;

    let list = json!([member(1, 99, 1.0, true), member(1, 5, 12.0, false)]);
    let (status, body) = send(&app, post_json("/sets", Some(&token), list.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], 1);
    assert_eq!(body["failures"][0]["index"], 0);

    let (status, _) = send(&app, post_json("/sets?atomic=true", Some(&token), list)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_apply_sets_for_foreign_house_is_forbidden() {
    let (app, state) = app();
    let token = login(&app, "alice", "alice-pass").await;

    let (status, _) = send(
        &app,
        post_json(
            "/sets",
            Some(&token),
            json!([member(1, 5, 1.0, true), member(2, 5, 90.0, true)]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(state.db.current_value(1, "Fan").unwrap(), 0.0);
}

#[tokio::test]
async fn test_select_setting() {
    let (app, state) = app();
    let token = login(&app, "alice", "alice-pass").await;

    let select = post_json("/houses/1/settings/Evening/select", Some(&token), json!({}));
    let (status, body) = send(&app, select).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], 1);
    assert_eq!(state.db.current_value(1, "Fan").unwrap(), 10.0);

    let (status, body) = send(&app, get_with("/houses/1/settings", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["selected"], true);

    let select = post_json("/houses/1/settings/Party/select", Some(&token), json!({}));
    let (status, _) = send(&app, select).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Devices ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_device_push_requires_key() {
    let (app, state) = app();

    let (status, _) = send(
        &app,
        device_post("/devices/temperature", "wrong", json!({ "house_id": 1, "temp": 23.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(state.db.current_value(1, "Temperature").unwrap(), 18.0);

    let (status, _) = send(
        &app,
        device_post("/devices/temperature", DEVICE_KEY, json!({ "house_id": 1, "temp": 23.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.db.current_value(1, "Temperature").unwrap(), 23.5);
}

#[tokio::test]
async fn test_device_push_validation_and_missing_device() {
    let (app, _) = app();

    let (status, _) = send(
        &app,
        device_post("/devices/fan-speed", DEVICE_KEY, json!({ "house_id": 1, "speed": 150 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        device_post("/devices/humidity", DEVICE_KEY, json!({ "house_id": 2, "humid": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_device_update_writes_value_and_activity() {
    let (app, state) = app();
    let body = json!({
        "house_id": 1, "device_id": 6, "device_type": "Light", "data": 3, "state": true
    });

    let (status, _) = send(&app, device_post("/devices/update", DEVICE_KEY, body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.db.current_value(1, "Light").unwrap(), 3.0);

    let log = state.db.get_activity_log(1, 10).unwrap();
    assert_eq!(log[0].device, "Light");
    assert_eq!(log[0].type_of_event, "data=3 state=on");
}

#[tokio::test]
async fn test_device_update_is_undone_when_activity_fails() {
    let (app, state) = app();
    fail_activity_inserts(&state);
    let body = json!({
        "house_id": 1, "device_id": 6, "device_type": "Light", "data": 3, "state": true
    });

    let (status, _) = send(&app, device_post("/devices/update", DEVICE_KEY, body)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(state.db.current_value(1, "Light").unwrap(), 0.0);
}

// ── Faces ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_face_enrol_then_verify() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/face/img2encoding"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "face_encoding": "enc-1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/face/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "is_match": true })))
        .expect(1)
        .mount(&server)
        .await;
    let (app, state) = app_with(face_feeds(&server).await);

    let (status, _) = send(&app, multipart_post("/devices/houses/1/faces", "img", b"jpeg")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.db.get_face_encodings(1).unwrap(), vec!["enc-1"]);
    let log = state.db.get_activity_log(1, 10).unwrap();
    assert_eq!(log[0].device, "Door camera");
    assert_eq!(log[0].type_of_event, "Face enrolled");

    let (status, body) = send(
        &app,
        multipart_post("/devices/houses/1/faces/verify", "img", b"jpeg"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_match"], true);
    let log = state.db.get_activity_log(1, 10).unwrap();
    assert_eq!(log[0].type_of_event, "Face recognised");
}

#[tokio::test]
async fn test_verify_without_enrolled_faces_skips_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/face/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "is_match": true })))
        .expect(0)
        .mount(&server)
        .await;
    let (app, state) = app_with(face_feeds(&server).await);

    let (status, body) = send(
        &app,
        multipart_post("/devices/houses/1/faces/verify", "img", b"jpeg"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_match"], false);
    let log = state.db.get_activity_log(1, 10).unwrap();
    assert_eq!(log[0].type_of_event, "Face not recognised");
}

#[tokio::test]
async fn test_face_upload_rejections() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/face/img2encoding"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "face_encoding": "enc-1" })))
        .expect(0)
        .mount(&server)
        .await;
    let (app, state) = app_with(face_feeds(&server).await);

    let (status, _) = send(&app, multipart_post("/devices/houses/9/faces", "img", b"jpeg")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let wrong_field = multipart_post("/devices/houses/1/faces", "photo", b"jpeg");
    let (status, body) = send(&app, wrong_field).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("missing img field"));

    let (status, _) = send(&app, multipart_post("/devices/houses/1/faces", "img", b"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(state.db.get_face_encodings(1).unwrap().is_empty());
}

#[tokio::test]
async fn test_face_service_error_is_passed_on() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/face/img2encoding"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "No face found" })))
        .mount(&server)
        .await;
    let (app, state) = app_with(face_feeds(&server).await);

    let upload = multipart_post("/devices/houses/1/faces", "img", b"jpeg");
    let (status, body) = send(&app, upload).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "external service failure: No face found");
    assert!(state.db.get_face_encodings(1).unwrap().is_empty());
}

// ── Feeds ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_dashboard_reads_feeds() {
    let server = MockServer::start().await;
    for (key, value) in [
        ("iot-temperature", "21.5"),
        ("iot-humidity", "55"),
        ("iot-alarm", "Alarm On"),
        ("iot-state", "2"),
        ("iot-fan", "Fan Off"),
        ("iot-fanspeed", "0"),
        ("iot-door", "Open Door"),
    ] {
        Mock::given(method("GET"))
            .and(path(format!("/houses/1/feeds/{key}/data")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "value": value }])))
            .mount(&server)
            .await;
    }
    let (app, _) = app_with(mock_feeds(&server).await);
    let token = login(&app, "alice", "alice-pass").await;

    let (status, body) = send(&app, get_with("/houses/1/dashboard", &token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["temperature"], 21.5);
    assert_eq!(body["light"], true);
    assert_eq!(body["fan"], false);
    assert_eq!(body["door"], true);
    assert_eq!(body["light_level"], 2.0);
    assert!(body.get("degraded").is_none());
}

#[tokio::test]
async fn test_light_on_calls_webhook_and_logs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/alarm"))
        .and(body_json(json!({ "value": "Alarm On" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (app, state) = app_with(mock_feeds(&server).await);
    let token = login(&app, "alice", "alice-pass").await;

    let (status, _) = send(&app, post_json("/houses/1/light/on", Some(&token), json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    let log = state.db.get_activity_log(1, 10).unwrap();
    assert_eq!(log[0].device, "Light");
    assert_eq!(log[0].type_of_event, "Alarm On");
}

#[tokio::test]
async fn test_failed_webhook_keeps_its_url_private() {
    let server = MockServer::start().await;
    let hook = "/api/v2/webhooks/feed/SECRETKEY123";
    Mock::given(method("POST"))
        .and(path(hook))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    let mut feeds = mock_feeds(&server).await;
    feeds.webhooks.fan = Some(format!("{}{hook}", server.uri()));
    let (app, state) = app_with(feeds);
    let token = login(&app, "alice", "alice-pass").await;

    let (status, body) = send(&app, post_json("/houses/1/fan/on", Some(&token), json!({}))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let message = body["error"].as_str().unwrap();
    assert_eq!(message, "external service failure: upstream service unavailable");
    assert!(!message.contains("SECRETKEY123"));
    assert!(!message.contains(&server.uri()));
    assert!(state.db.get_activity_log(1, 10).unwrap().is_empty());
}
