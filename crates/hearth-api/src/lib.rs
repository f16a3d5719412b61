pub mod auth;
pub mod devices;
pub mod error;
pub mod events;
pub mod houses;
pub mod middleware;
pub mod reconcile;
pub mod routes;
pub mod settings;
pub mod users;
pub mod validation;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
