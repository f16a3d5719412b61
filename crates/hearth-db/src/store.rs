//! Capability traits the authenticator and reconciler are written against,
//! and their SQLite implementation for [`Database`].

use std::collections::BTreeSet;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use hearth_types::models::{ActivityLog, DeviceId, HouseId, SetMember, UserId};

use crate::Database;
use crate::error::DbError;
use crate::models::{DataRecordRow, DeviceRow, UserRow};

/// Read-only access to users and house ownership.
pub trait CredentialStore {
    fn find_user_by_username(&self, username: &str) -> Result<UserRow, DbError>;
    fn find_user_by_id(&self, user_id: UserId) -> Result<UserRow, DbError>;
    fn houses_owned_by(&self, user_id: UserId) -> Result<BTreeSet<HouseId>, DbError>;
}

/// Observed device values (`iot_device`) and commanded setting values
/// (`set_member`), plus the history and activity tables written alongside.
pub trait DeviceStateStore {
    /// Observed value of the single device of `device_type` in the house.
    fn current_value(&self, house_id: HouseId, device_type: &str) -> Result<f64, DbError>;

    /// Write an observed value and append a history record, atomically.
    fn apply_raw(
        &self,
        house_id: HouseId,
        device_id: DeviceId,
        device_type: &str,
        value: f64,
        state: bool,
    ) -> Result<DataRecordRow, DbError>;

    /// Resolve the device of `device_type` and `apply_raw` to it.
    fn record_reading(
        &self,
        house_id: HouseId,
        device_type: &str,
        value: f64,
    ) -> Result<DataRecordRow, DbError>;

    /// Set the commanded value of a setting member and mirror it into the
    /// device's observed value.
    fn set_member_value(
        &self,
        house_id: HouseId,
        setting: &str,
        device_id: DeviceId,
        value: f64,
    ) -> Result<(), DbError>;

    fn set_member_state(
        &self,
        house_id: HouseId,
        setting: &str,
        device_id: DeviceId,
        state: bool,
    ) -> Result<(), DbError>;

    /// `apply_raw` plus one activity entry describing the change, in the same
    /// transaction.
    fn apply_raw_logged(
        &self,
        house_id: HouseId,
        device_id: DeviceId,
        device_type: &str,
        value: f64,
        state: bool,
    ) -> Result<ActivityLog, DbError>;

    /// Apply value and state of every member and log one activity entry per
    /// member. All or nothing, log entries included.
    fn apply_members(&self, members: &[SetMember]) -> Result<Vec<ActivityLog>, DbError>;

    fn append_activity(
        &self,
        house_id: HouseId,
        device: &str,
        type_of_event: &str,
    ) -> Result<ActivityLog, DbError>;
}

impl CredentialStore for Database {
    fn find_user_by_username(&self, username: &str) -> Result<UserRow, DbError> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "SELECT user_id, username, password FROM users WHERE username = ?1",
                username,
            )
        })
    }

    fn find_user_by_id(&self, user_id: UserId) -> Result<UserRow, DbError> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "SELECT user_id, username, password FROM users WHERE user_id = ?1",
                user_id,
            )
        })
    }

    fn houses_owned_by(&self, user_id: UserId) -> Result<BTreeSet<HouseId>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT house_id FROM own WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get::<_, HouseId>(0))?
                .collect::<Result<BTreeSet<_>, _>>()?;
            Ok(ids)
        })
    }
}

impl DeviceStateStore for Database {
    fn current_value(&self, house_id: HouseId, device_type: &str) -> Result<f64, DbError> {
        self.with_conn(|conn| Ok(query_device_by_type(conn, house_id, device_type)?.current_data))
    }

    fn apply_raw(
        &self,
        house_id: HouseId,
        device_id: DeviceId,
        device_type: &str,
        value: f64,
        state: bool,
    ) -> Result<DataRecordRow, DbError> {
        self.with_tx(|tx| write_raw(tx, house_id, device_id, device_type, value, state))
    }

    fn record_reading(
        &self,
        house_id: HouseId,
        device_type: &str,
        value: f64,
    ) -> Result<DataRecordRow, DbError> {
        self.with_tx(|tx| {
            let device = query_device_by_type(tx, house_id, device_type)?;
            write_raw(tx, house_id, device.device_id, device_type, value, true)
        })
    }

    fn set_member_value(
        &self,
        house_id: HouseId,
        setting: &str,
        device_id: DeviceId,
        value: f64,
    ) -> Result<(), DbError> {
        self.with_tx(|tx| write_member_value(tx, house_id, setting, device_id, value))
    }

    fn set_member_state(
        &self,
        house_id: HouseId,
        setting: &str,
        device_id: DeviceId,
        state: bool,
    ) -> Result<(), DbError> {
        self.with_conn(|conn| write_member_state(conn, house_id, setting, device_id, state))
    }

    fn apply_raw_logged(
        &self,
        house_id: HouseId,
        device_id: DeviceId,
        device_type: &str,
        value: f64,
        state: bool,
    ) -> Result<ActivityLog, DbError> {
        self.with_tx(|tx| {
            write_raw(tx, house_id, device_id, device_type, value, state)?;
            let event = format!("data={} state={}", value, on_off(state));
            insert_activity(tx, house_id, device_type, &event)
        })
    }

    fn apply_members(&self, members: &[SetMember]) -> Result<Vec<ActivityLog>, DbError> {
        self.with_tx(|tx| {
            let mut entries = Vec::with_capacity(members.len());
            for m in members {
                write_member_value(tx, m.house_id, &m.name, m.device_id, m.device_data)?;
                write_member_state(tx, m.house_id, &m.name, m.device_id, m.device_state)?;
                let device = format!("device {}", m.device_id);
                let event = format!(
                    "{}: value={} state={}",
                    m.name,
                    m.device_data,
                    on_off(m.device_state)
                );
                entries.push(insert_activity(tx, m.house_id, &device, &event)?);
            }
            Ok(entries)
        })
    }

    fn append_activity(
        &self,
        house_id: HouseId,
        device: &str,
        type_of_event: &str,
    ) -> Result<ActivityLog, DbError> {
        self.with_conn(|conn| insert_activity(conn, house_id, device, type_of_event))
    }
}

fn on_off(state: bool) -> &'static str {
    if state { "on" } else { "off" }
}

fn query_user<P: rusqlite::ToSql>(
    conn: &Connection,
    sql: &str,
    key: P,
) -> Result<UserRow, DbError> {
    let row = conn.query_row(sql, [key], |row| {
        Ok(UserRow {
            user_id: row.get(0)?,
            username: row.get(1)?,
            password: row.get(2)?,
        })
    })?;
    Ok(row)
}

pub(crate) fn query_device_by_type(
    conn: &Connection,
    house_id: HouseId,
    device_type: &str,
) -> Result<DeviceRow, DbError> {
    // Two rows are enough to tell "unique" from "ambiguous".
    let mut stmt = conn.prepare(
        "SELECT house_id, device_id, device_type, current_data
         FROM iot_device
         WHERE house_id = ?1 AND device_type = ?2
         LIMIT 2",
    )?;

    let mut rows = stmt
        .query_map(params![house_id, device_type], |row| {
            Ok(DeviceRow {
                house_id: row.get(0)?,
                device_id: row.get(1)?,
                device_type: row.get(2)?,
                current_data: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if rows.len() > 1 {
        return Err(DbError::Ambiguous {
            house_id,
            device_type: device_type.to_string(),
        });
    }
    rows.pop().ok_or(DbError::NotFound)
}

fn write_raw(
    conn: &Connection,
    house_id: HouseId,
    device_id: DeviceId,
    device_type: &str,
    value: f64,
    state: bool,
) -> Result<DataRecordRow, DbError> {
    let updated = conn.execute(
        "UPDATE iot_device SET current_data = ?1
         WHERE house_id = ?2 AND device_id = ?3 AND device_type = ?4",
        params![value, house_id, device_id, device_type],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound);
    }

    let time = Utc::now();
    conn.execute(
        "INSERT INTO data_record (house_id, device_id, time, value, state)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![house_id, device_id, time, value, state],
    )?;

    debug!("house {} device {} ({}) <- {}", house_id, device_id, device_type, value);

    Ok(DataRecordRow {
        record_id: conn.last_insert_rowid(),
        house_id,
        device_id,
        time,
        value,
        state,
    })
}

fn write_member_value(
    conn: &Connection,
    house_id: HouseId,
    setting: &str,
    device_id: DeviceId,
    value: f64,
) -> Result<(), DbError> {
    let updated = conn.execute(
        "UPDATE set_member SET device_data = ?1
         WHERE house_id = ?2 AND name = ?3 AND device_id = ?4",
        params![value, house_id, setting, device_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound);
    }

    // The member's foreign key guarantees the device row exists.
    conn.execute(
        "UPDATE iot_device SET current_data = ?1 WHERE house_id = ?2 AND device_id = ?3",
        params![value, house_id, device_id],
    )?;
    Ok(())
}

fn write_member_state(
    conn: &Connection,
    house_id: HouseId,
    setting: &str,
    device_id: DeviceId,
    state: bool,
) -> Result<(), DbError> {
    let updated = conn.execute(
        "UPDATE set_member SET device_state = ?1
         WHERE house_id = ?2 AND name = ?3 AND device_id = ?4",
        params![state, house_id, setting, device_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

pub(crate) fn insert_activity(
    conn: &Connection,
    house_id: HouseId,
    device: &str,
    type_of_event: &str,
) -> Result<ActivityLog, DbError> {
    let time = Utc::now();
    conn.execute(
        "INSERT INTO activity_log (house_id, time, device, type_of_event)
         VALUES (?1, ?2, ?3, ?4)",
        params![house_id, time, device, type_of_event],
    )?;

    Ok(ActivityLog {
        activity_id: conn.last_insert_rowid(),
        house_id,
        time,
        device: device.to_string(),
        type_of_event: type_of_event.to_string(),
    })
}

/// Whether a setting row exists; used before touching its members.
pub(crate) fn setting_exists(
    conn: &Connection,
    house_id: HouseId,
    name: &str,
) -> Result<bool, DbError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM house_setting WHERE house_id = ?1 AND name = ?2",
            params![house_id, name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}
