//! Optional first-run provisioning from a JSON file (`HEARTH_SEED_FILE`).
//!
//! Users, houses, devices and settings have no HTTP surface; this is how a
//! fresh database gets them. The seed only applies to a database with no
//! users and no houses.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::info;

use hearth_api::auth::hash_password;
use hearth_db::{Database, provision};
use hearth_types::models::{DeviceId, SetMember};

#[derive(Debug, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub houses: Vec<SeedHouse>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
pub struct SeedHouse {
    pub name: String,
    #[serde(default)]
    pub devices: Vec<SeedDevice>,
    #[serde(default)]
    pub settings: Vec<SeedSetting>,
}

#[derive(Debug, Deserialize)]
pub struct SeedDevice {
    pub device_id: DeviceId,
    pub device_type: String,
    #[serde(default)]
    pub current_data: f64,
}

#[derive(Debug, Deserialize)]
pub struct SeedSetting {
    pub name: String,
    #[serde(default)]
    pub members: Vec<SeedMember>,
}

#[derive(Debug, Deserialize)]
pub struct SeedMember {
    pub device_id: DeviceId,
    #[serde(default)]
    pub device_data: f64,
    #[serde(default)]
    pub device_state: bool,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub username: String,
    /// Plaintext; hashed before it is stored.
    pub password: String,
    /// Names of houses from the same file.
    #[serde(default)]
    pub houses: Vec<String>,
}

pub fn load(path: &Path) -> Result<Seed> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Write the seed into `db` in one transaction. Returns `false` without
/// writing when the database already holds users or houses.
pub fn apply(db: &Database, seed: &Seed) -> Result<bool> {
    if !db.with_conn(provision::is_empty)? {
        info!("Database already provisioned, skipping seed");
        return Ok(false);
    }

    // Everything that can fail outside the store is checked up front.
    let mut users = Vec::with_capacity(seed.users.len());
    for user in &seed.users {
        let mut owned = Vec::with_capacity(user.houses.len());
        for name in &user.houses {
            let index = seed
                .houses
                .iter()
                .position(|h| &h.name == name)
                .ok_or_else(|| anyhow!("user {} owns unknown house {:?}", user.username, name))?;
            owned.push(index);
        }
        let hash = hash_password(&user.password)
            .map_err(|e| anyhow!("hashing password for {}: {}", user.username, e))?;
        users.push((user.username.as_str(), hash, owned));
    }

    let applied = db.with_tx(|tx| {
        if !provision::is_empty(tx)? {
            return Ok(false);
        }

        let mut house_ids = Vec::with_capacity(seed.houses.len());
        for house in &seed.houses {
            let house_id = provision::create_house(tx, &house.name)?;
            for device in &house.devices {
                provision::add_device(
                    tx,
                    house_id,
                    device.device_id,
                    &device.device_type,
                    device.current_data,
                )?;
            }
            for setting in &house.settings {
                provision::create_setting(tx, house_id, &setting.name)?;
                for m in &setting.members {
                    provision::add_set_member(
                        tx,
                        &SetMember {
                            house_id,
                            name: setting.name.clone(),
                            device_id: m.device_id,
                            device_data: m.device_data,
                            device_state: m.device_state,
                        },
                    )?;
                }
            }
            house_ids.push(house_id);
        }

        for (username, hash, owned) in &users {
            let user_id = provision::create_user(tx, username, hash)?;
            for &index in owned {
                provision::grant_ownership(tx, user_id, house_ids[index])?;
            }
        }
        Ok(true)
    })?;

    if applied {
        info!(
            "Seeded {} houses and {} users",
            seed.houses.len(),
            seed.users.len()
        );
    }
    Ok(applied)
}
