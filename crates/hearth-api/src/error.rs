use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use hearth_db::DbError;
use hearth_feeds::FeedError;

use crate::auth::AuthError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing or invalid token")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("external service failure: {0}")]
    ExternalService(String),

    #[error("store unavailable")]
    StoreUnavailable,

    #[error("internal error")]
    Internal,
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound => ApiError::NotFound,
            DbError::Ambiguous { house_id, device_type } => ApiError::Conflict(format!(
                "house {} has more than one {} device",
                house_id, device_type
            )),
            DbError::Unavailable(detail) => {
                error!("store error: {}", detail);
                ApiError::StoreUnavailable
            }
        }
    }
}

/// Webhook and feed URLs carry credentials, so the full error only goes to
/// the log. Clients get a fixed message.
impl From<FeedError> for ApiError {
    fn from(e: FeedError) -> Self {
        warn!("outbound call failed: {}", e);
        let public = match e {
            FeedError::NotConfigured(what) => format!("no webhook configured for {}", what),
            FeedError::Service(msg) => msg,
            FeedError::Http(_) | FeedError::Status { .. } | FeedError::UnexpectedShape(_) => {
                "upstream service unavailable".to_string()
            }
        };
        ApiError::ExternalService(public)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::StoreUnavailable(inner) => inner.into(),
            AuthError::TokenIssuanceFailed(inner) => {
                error!("token issuance failed: {}", inner);
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            ApiError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
