use std::sync::{Arc, OnceLock};

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use tracing::{error, info, warn};

use hearth_db::{CredentialStore, Database, DbError};
use hearth_feeds::FeedClient;
use hearth_types::api::{Claims, LoginRequest, LoginResponse};
use hearth_types::models::{HouseId, User, UserId};

use crate::error::ApiError;
use crate::events::ActivityBus;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub device_key: String,
    pub feeds: FeedClient,
    pub activity: ActivityBus,
}

const TOKEN_LIFETIME_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user and wrong password are deliberately the same error.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("credential store unavailable: {0}")]
    StoreUnavailable(DbError),

    #[error("token issuance failed: {0}")]
    TokenIssuanceFailed(#[from] jsonwebtoken::errors::Error),
}

impl From<DbError> for AuthError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound => AuthError::InvalidCredentials,
            other => AuthError::StoreUnavailable(other),
        }
    }
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub token: String,
    pub house_ids: Vec<HouseId>,
}

/// Check a username/password pair and issue a session token.
///
/// Both failure paths (unknown user, wrong password) run one Argon2
/// verification, so they take the same time and return the same error.
/// The returned user carries the password mask, never the stored hash.
pub fn authenticate<S: CredentialStore + ?Sized>(
    store: &S,
    secret: &str,
    username: &str,
    password: &str,
) -> Result<LoginOutcome, AuthError> {
    let row = match store.find_user_by_username(username) {
        Ok(row) => row,
        Err(DbError::NotFound) => {
            verify_password(password, dummy_hash());
            return Err(AuthError::InvalidCredentials);
        }
        Err(e) => return Err(AuthError::StoreUnavailable(e)),
    };

    if !verify_password(password, &row.password) {
        return Err(AuthError::InvalidCredentials);
    }

    let token = create_token(secret, row.user_id, &row.username)?;
    let house_ids = store.houses_owned_by(row.user_id)?.into_iter().collect();

    Ok(LoginOutcome {
        user: row.redacted(),
        token,
        house_ids,
    })
}

/// Hash a plaintext password into an Argon2id PHC string.
pub fn hash_password(plain: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(hasher().hash_password(plain.as_bytes(), &salt)?.to_string())
}

/// An unparsable stored hash counts as a mismatch.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        warn!("stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("hearth-dummy-password").unwrap_or_default())
}

#[cfg(not(test))]
fn hasher() -> Argon2<'static> {
    Argon2::default()
}

// Minimum-cost parameters keep the property tests fast. Verification reads
// the parameters back out of the PHC string, so nothing else changes.
#[cfg(test)]
fn hasher() -> Argon2<'static> {
    let params = argon2::Params::new(1024, 1, 1, None).expect("valid test params");
    Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
}

pub fn create_token(
    secret: &str,
    user_id: UserId,
    username: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp()
            as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Run a synchronous store operation on the blocking pool.
pub async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let outcome = run_blocking(&state, move |s| {
        authenticate(&s.db, &s.jwt_secret, &req.username, &req.password).map_err(ApiError::from)
    })
    .await?;

    info!("user {} logged in", outcome.user.user_id);

    Ok(Json(LoginResponse {
        token: outcome.token,
        user: outcome.user,
        house_ids: outcome.house_ids,
    }))
}
