use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        // Rolled back on drop if any statement fails.
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(
            "
            CREATE TABLE users (
                user_id     INTEGER PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL
            );

            CREATE TABLE house (
                house_id    INTEGER PRIMARY KEY,
                name        TEXT NOT NULL,
                password    TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE own (
                user_id     INTEGER NOT NULL REFERENCES users(user_id),
                house_id    INTEGER NOT NULL REFERENCES house(house_id),
                PRIMARY KEY (user_id, house_id)
            );

            CREATE TABLE iot_device (
                house_id        INTEGER NOT NULL REFERENCES house(house_id),
                device_id       INTEGER NOT NULL,
                device_type     TEXT NOT NULL,
                current_data    REAL NOT NULL DEFAULT 0,
                PRIMARY KEY (house_id, device_id)
            );

            CREATE INDEX idx_iot_device_type
                ON iot_device(house_id, device_type);

            CREATE TABLE data_record (
                record_id   INTEGER PRIMARY KEY AUTOINCREMENT,
                house_id    INTEGER NOT NULL,
                device_id   INTEGER NOT NULL,
                time        TEXT NOT NULL,
                value       REAL NOT NULL,
                state       INTEGER NOT NULL,
                FOREIGN KEY (house_id, device_id) REFERENCES iot_device(house_id, device_id)
            );

            CREATE TABLE house_setting (
                name        TEXT NOT NULL,
                house_id    INTEGER NOT NULL REFERENCES house(house_id),
                selected    INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (name, house_id)
            );

            CREATE TABLE set_member (
                house_id        INTEGER NOT NULL,
                name            TEXT NOT NULL,
                device_id       INTEGER NOT NULL,
                device_data     REAL NOT NULL DEFAULT 0,
                device_state    INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (house_id, name, device_id),
                FOREIGN KEY (name, house_id) REFERENCES house_setting(name, house_id),
                FOREIGN KEY (house_id, device_id) REFERENCES iot_device(house_id, device_id)
            );

            CREATE TABLE activity_log (
                activity_id     INTEGER PRIMARY KEY AUTOINCREMENT,
                house_id        INTEGER NOT NULL REFERENCES house(house_id),
                time            TEXT NOT NULL,
                device          TEXT NOT NULL,
                type_of_event   TEXT NOT NULL
            );

            CREATE INDEX idx_activity_house
                ON activity_log(house_id, activity_id);

            CREATE TABLE face_encoding (
                face_encoding   TEXT NOT NULL,
                house_id        INTEGER NOT NULL REFERENCES house(house_id),
                PRIMARY KEY (face_encoding, house_id)
            );

            CREATE TABLE notification (
                notification_id INTEGER PRIMARY KEY,
                title           TEXT NOT NULL,
                description     TEXT NOT NULL,
                time            TEXT NOT NULL
            );

            CREATE TABLE send (
                notification_id INTEGER NOT NULL REFERENCES notification(notification_id),
                user_id         INTEGER NOT NULL REFERENCES users(user_id),
                house_id        INTEGER NOT NULL REFERENCES house(house_id),
                PRIMARY KEY (notification_id, user_id, house_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}
