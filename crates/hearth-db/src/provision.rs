//! Inserts for users, houses, devices and settings, which have no HTTP
//! surface. Each takes a bare connection so a caller can batch them inside
//! one [`Database::with_tx`](crate::Database::with_tx).

use rusqlite::{Connection, params};

use hearth_types::models::{DeviceId, HouseId, SetMember, UserId};

use crate::error::DbError;

/// True when no user and no house has been provisioned yet.
pub fn is_empty(conn: &Connection) -> Result<bool, DbError> {
    let rows: i64 = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM users) + (SELECT COUNT(*) FROM house)",
        [],
        |row| row.get(0),
    )?;
    Ok(rows == 0)
}

pub fn create_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
) -> Result<UserId, DbError> {
    conn.execute(
        "INSERT INTO users (username, password) VALUES (?1, ?2)",
        (username, password_hash),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn create_house(conn: &Connection, name: &str) -> Result<HouseId, DbError> {
    conn.execute("INSERT INTO house (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn grant_ownership(
    conn: &Connection,
    user_id: UserId,
    house_id: HouseId,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR IGNORE INTO own (user_id, house_id) VALUES (?1, ?2)",
        params![user_id, house_id],
    )?;
    Ok(())
}

pub fn add_device(
    conn: &Connection,
    house_id: HouseId,
    device_id: DeviceId,
    device_type: &str,
    current_data: f64,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO iot_device (house_id, device_id, device_type, current_data)
         VALUES (?1, ?2, ?3, ?4)",
        params![house_id, device_id, device_type, current_data],
    )?;
    Ok(())
}

pub fn create_setting(conn: &Connection, house_id: HouseId, name: &str) -> Result<(), DbError> {
    conn.execute(
        "INSERT OR IGNORE INTO house_setting (name, house_id) VALUES (?1, ?2)",
        params![name, house_id],
    )?;
    Ok(())
}

pub fn add_set_member(conn: &Connection, member: &SetMember) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO set_member (house_id, name, device_id, device_data, device_state)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            member.house_id,
            member.name,
            member.device_id,
            member.device_data,
            member.device_state
        ],
    )?;
    Ok(())
}
