use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use hearth_types::models::{
    ActivityLog, DeviceId, HouseId, HouseSetting, Notification, SetMember, UserId,
};

use crate::Database;
use crate::provision;
use crate::error::DbError;
use crate::store::{insert_activity, setting_exists};

impl Database {
    // -- Houses --

    pub fn house_exists(&self, house_id: HouseId) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM house WHERE house_id = ?1", [house_id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Settings --

    pub fn get_house_settings(&self, house_id: HouseId) -> Result<Vec<HouseSetting>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name, house_id, selected FROM house_setting
                 WHERE house_id = ?1 ORDER BY name",
            )?;
            let rows = stmt
                .query_map([house_id], |row| {
                    Ok(HouseSetting {
                        name: row.get(0)?,
                        house_id: row.get(1)?,
                        selected: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_set_members(
        &self,
        house_id: HouseId,
        name: &str,
    ) -> Result<Vec<SetMember>, DbError> {
        self.with_conn(|conn| {
            if !setting_exists(conn, house_id, name)? {
                return Err(DbError::NotFound);
            }
            query_set_members(conn, house_id, name)
        })
    }

    /// Mark `name` as the selected setting of the house, clearing the flag on
    /// every other setting. Returns the members to apply.
    pub fn select_house_setting(
        &self,
        house_id: HouseId,
        name: &str,
    ) -> Result<Vec<SetMember>, DbError> {
        self.with_tx(|tx| {
            if !setting_exists(tx, house_id, name)? {
                return Err(DbError::NotFound);
            }
            tx.execute(
                "UPDATE house_setting SET selected = (name = ?2) WHERE house_id = ?1",
                params![house_id, name],
            )?;
            query_set_members(tx, house_id, name)
        })
    }

    // -- Activity --

    /// Newest first.
    pub fn get_activity_log(
        &self,
        house_id: HouseId,
        limit: u32,
    ) -> Result<Vec<ActivityLog>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT activity_id, house_id, time, device, type_of_event
                 FROM activity_log
                 WHERE house_id = ?1
                 ORDER BY activity_id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![house_id, limit], |row| {
                    Ok(ActivityLog {
                        activity_id: row.get(0)?,
                        house_id: row.get(1)?,
                        time: row.get(2)?,
                        device: row.get(3)?,
                        type_of_event: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Faces --

    /// Store an encoding and log the enrolment, in one transaction.
    pub fn add_face_encoding_logged(
        &self,
        house_id: HouseId,
        encoding: &str,
        device: &str,
        type_of_event: &str,
    ) -> Result<ActivityLog, DbError> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT OR IGNORE INTO face_encoding (face_encoding, house_id) VALUES (?1, ?2)",
                params![encoding, house_id],
            )?;
            insert_activity(tx, house_id, device, type_of_event)
        })
    }

    pub fn get_face_encodings(&self, house_id: HouseId) -> Result<Vec<String>, DbError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT face_encoding FROM face_encoding WHERE house_id = ?1")?;
            let rows = stmt
                .query_map([house_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Notifications --

    pub fn get_notifications_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Notification>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT n.notification_id, s.house_id, n.title, n.description, n.time
                 FROM notification n
                 JOIN send s ON s.notification_id = n.notification_id
                 WHERE s.user_id = ?1
                 ORDER BY n.time DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(Notification {
                        notification_id: row.get(0)?,
                        house_id: row.get(1)?,
                        title: row.get(2)?,
                        description: row.get(3)?,
                        time: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Out-of-band provisioning --

    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId, DbError> {
        self.with_conn(|conn| provision::create_user(conn, username, password_hash))
    }

    pub fn create_house(&self, name: &str) -> Result<HouseId, DbError> {
        self.with_conn(|conn| provision::create_house(conn, name))
    }

    pub fn grant_ownership(&self, user_id: UserId, house_id: HouseId) -> Result<(), DbError> {
        self.with_conn(|conn| provision::grant_ownership(conn, user_id, house_id))
    }

    pub fn add_device(
        &self,
        house_id: HouseId,
        device_id: DeviceId,
        device_type: &str,
        current_data: f64,
    ) -> Result<(), DbError> {
        self.with_conn(|conn| {
            provision::add_device(conn, house_id, device_id, device_type, current_data)
        })
    }

    pub fn create_setting(&self, house_id: HouseId, name: &str) -> Result<(), DbError> {
        self.with_conn(|conn| provision::create_setting(conn, house_id, name))
    }

    pub fn add_set_member(&self, member: &SetMember) -> Result<(), DbError> {
        self.with_conn(|conn| provision::add_set_member(conn, member))
    }

    /// Store a notification and address it to `user_id` for `house_id`.
    pub fn send_notification(
        &self,
        user_id: UserId,
        house_id: HouseId,
        title: &str,
        description: &str,
        time: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO notification (title, description, time) VALUES (?1, ?2, ?3)",
                params![title, description, time],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO send (notification_id, user_id, house_id) VALUES (?1, ?2, ?3)",
                params![id, user_id, house_id],
            )?;
            Ok(id)
        })
    }
}

fn query_set_members(
    conn: &Connection,
    house_id: HouseId,
    name: &str,
) -> Result<Vec<SetMember>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT house_id, name, device_id, device_data, device_state
         FROM set_member
         WHERE house_id = ?1 AND name = ?2
         ORDER BY device_id",
    )?;
    let rows = stmt
        .query_map(params![house_id, name], |row| {
            Ok(SetMember {
                house_id: row.get(0)?,
                name: row.get(1)?,
                device_id: row.get(2)?,
                device_data: row.get(3)?,
                device_state: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
