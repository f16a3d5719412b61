//! Drive setting members to their commanded value and state, logging each
//! change to the activity log.

use tracing::{debug, warn};

use hearth_db::{Database, DbError, DeviceStateStore};
use hearth_types::models::{ActivityLog, HouseId, SetMember};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApplyMode {
    /// Persist members one by one; a failure is reported and skipped.
    #[default]
    BestEffort,
    /// Persist all members in one transaction or none of them.
    Atomic,
}

#[derive(Debug)]
pub struct MemberFailure {
    /// Position of the member in the submitted list.
    pub index: usize,
    pub error: DbError,
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    /// One activity entry per member that was persisted.
    pub applied: Vec<ActivityLog>,
    pub failures: Vec<MemberFailure>,
}

pub fn apply_many<S: DeviceStateStore + ?Sized>(
    store: &S,
    members: &[SetMember],
    mode: ApplyMode,
) -> Result<ApplyReport, DbError> {
    match mode {
        ApplyMode::BestEffort => Ok(apply_best_effort(store, members)),
        ApplyMode::Atomic => Ok(ApplyReport {
            applied: store.apply_members(members)?,
            failures: Vec::new(),
        }),
    }
}

// Each member is its own transaction, so a member either lands with its
// activity entry or not at all.
fn apply_best_effort<S: DeviceStateStore + ?Sized>(
    store: &S,
    members: &[SetMember],
) -> ApplyReport {
    let mut report = ApplyReport::default();

    for (index, m) in members.iter().enumerate() {
        match store.apply_members(std::slice::from_ref(m)) {
            Ok(entries) => report.applied.extend(entries),
            Err(error) => {
                warn!(
                    "member {} ({} / device {}) not applied: {}",
                    index, m.name, m.device_id, error
                );
                report.failures.push(MemberFailure { index, error });
            }
        }
    }

    debug!(
        "applied {} of {} members",
        report.applied.len(),
        members.len()
    );
    report
}

/// Mark `name` as the house's selected setting, then apply its members
/// best-effort. Unknown setting is `NotFound`.
pub fn select_setting(
    db: &Database,
    house_id: HouseId,
    name: &str,
) -> Result<ApplyReport, DbError> {
    let members = db.select_house_setting(house_id, name)?;
    apply_many(db, &members, ApplyMode::BestEffort)
}
