use thiserror::Error;

use hearth_types::models::HouseId;

#[derive(Debug, Error)]
pub enum DbError {
    /// No row matched (lookup or update).
    #[error("not found")]
    NotFound,

    /// More than one device of the requested type exists in the house.
    #[error("house {house_id} has more than one {device_type} device")]
    Ambiguous { house_id: HouseId, device_type: String },

    /// Driver, I/O or lock failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::NotFound,
            other => DbError::Unavailable(other.to_string()),
        }
    }
}
