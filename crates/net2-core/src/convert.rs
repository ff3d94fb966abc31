// ── API-to-domain type conversions ──
//
// Maps net2-api wire types into the canonical domain model, plus the
// query builders that depend on site configuration.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDateTime};
use net2_api::models::DATE_FORMAT;
use net2_api::{
    AccessLevelRecord, AreaRecord, CustomFieldDefinition, DepartmentRecord, DeviceStatusRow,
    DoorRecord, PermissionSet, UserRow,
};
use tracing::debug;

use crate::config::MonitoredDoor;
use crate::model::{AREA_ID_OFFSET, AccessLevel, Department, Door, DoorStatus, User};

/// Access level names starting with this are placeholders for an exact
/// permission set that has to be fetched separately.
pub(crate) const INDIVIDUAL_PREFIX: &str = "Individual: ";

// ── Timestamps ──────────────────────────────────────────────────────

/// Parse a server timestamp. Blank, malformed and year-1 "zero" values
/// all mean "unset".
pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .filter(|dt| dt.year() > 1)
}

// ── Users ───────────────────────────────────────────────────────────

/// SQL column holding the given custom field in `UsersEx`.
pub(crate) fn custom_field_column(field_id: i64) -> String {
    let suffix = match field_id {
        1 | 2 => "100",
        6 | 7 => "60",
        13 => "Memo",
        _ => "50",
    };
    format!("Field{field_id}_{suffix}")
}

/// Find the column for the custom field named `wanted`.
pub(crate) fn local_id_column(fields: &[CustomFieldDefinition], wanted: &str) -> Option<String> {
    if wanted.is_empty() {
        return None;
    }
    fields
        .iter()
        .find(|f| f.name == wanted)
        .map(|f| custom_field_column(f.id))
}

/// Build the `UsersEx` query. A full refresh only reads active users;
/// a single-user refetch reads the user whatever their state.
pub(crate) fn users_query(local_id_column: Option<&str>, user_id: Option<i64>) -> String {
    let select = match local_id_column {
        Some(column) => format!("SELECT *, {column} as LocalID FROM UsersEx"),
        None => "SELECT * FROM UsersEx".to_owned(),
    };
    match user_id {
        Some(id) => format!("{select} WHERE userID={id}"),
        None => format!("{select} WHERE Active=1"),
    }
}

/// Convert a query row. `access_levels` is resolved by the caller since
/// it may need another request.
pub(crate) fn user_from_row(row: UserRow, access_levels: Vec<String>) -> User {
    let departments = match (row.department_id, row.department_name) {
        (Some(id), Some(name)) => vec![Department { id, name }],
        (Some(id), None) => vec![Department {
            id,
            name: String::new(),
        }],
        (None, _) => Vec::new(),
    };
    User {
        id: row.id,
        guid: row.guid.unwrap_or_default(),
        first_name: row.first_name.unwrap_or_default(),
        surname: row.surname.unwrap_or_default(),
        pin: row.pin.filter(|p| !p.is_empty()),
        departments,
        activated: parse_timestamp(row.activate_date.as_deref()),
        expiry: parse_timestamp(row.expiry_date.as_deref()),
        last_access: parse_timestamp(row.last_access_time.as_deref()),
        last_known_location: row.last_known_location.filter(|l| !l.is_empty()),
        local_id: row.local_id.filter(|l| !l.is_empty()),
        access_levels,
    }
}

/// Whether the row's access level is a placeholder for an exact set.
pub(crate) fn needs_permission_set(row: &UserRow) -> bool {
    row.access_level_name
        .as_deref()
        .is_some_and(|name| name.starts_with(INDIVIDUAL_PREFIX))
}

/// Access level names for a row that doesn't need a permission lookup.
pub(crate) fn plain_access_levels(row: &UserRow) -> Vec<String> {
    row.access_level_name
        .iter()
        .filter(|name| !name.is_empty())
        .cloned()
        .collect()
}

/// Resolve a permission set into display names. IDs that no longer
/// exist in `levels` are dropped.
pub(crate) fn resolve_permission_names(
    user_id: i64,
    permissions: &PermissionSet,
    levels: &HashMap<i64, String>,
) -> Vec<String> {
    let level_ids = permissions.access_levels.iter().copied();
    let area_ids = permissions
        .individual_permissions
        .iter()
        .map(|p| AREA_ID_OFFSET + p.area_id);

    level_ids
        .chain(area_ids)
        .filter_map(|id| {
            let name = levels.get(&id).cloned();
            if name.is_none() {
                debug!(user = user_id, level = id, "discarding unknown access level");
            }
            name
        })
        .collect()
}

// ── Access levels & departments ─────────────────────────────────────

/// Union of named levels and remapped areas.
pub(crate) fn merge_access_levels(
    levels: Vec<AccessLevelRecord>,
    areas: Vec<AreaRecord>,
) -> Vec<AccessLevel> {
    levels
        .into_iter()
        .map(|l| AccessLevel {
            id: l.id,
            name: l.name,
        })
        .chain(areas.iter().map(|a| AccessLevel::from_area(a.id, &a.name)))
        .collect()
}

impl From<DepartmentRecord> for Department {
    fn from(d: DepartmentRecord) -> Self {
        Self {
            id: d.id,
            name: d.name,
        }
    }
}

impl From<&Department> for DepartmentRecord {
    fn from(d: &Department) -> Self {
        Self {
            id: d.id,
            name: d.name.clone(),
        }
    }
}

// ── Doors ───────────────────────────────────────────────────────────

/// Join the door list with controller status and monitoring zones.
pub(crate) fn doors_from(
    records: Vec<DoorRecord>,
    status: &[DeviceStatusRow],
    monitored: &[MonitoredDoor],
) -> Vec<Door> {
    let status: HashMap<i64, i64> = status.iter().map(|s| (s.address, s.status_flag)).collect();
    let zones: HashMap<i64, &str> = monitored.iter().map(|m| (m.id, m.zone.as_str())).collect();

    records
        .into_iter()
        .map(|record| {
            let status = DoorStatus(status.get(&record.id).copied().unwrap_or_default());
            Door {
                id: record.id,
                zone: zones.get(&record.id).map(|z| (*z).to_owned()),
                name: record.name,
                alarm: status.intruder_alarm(),
                status,
            }
        })
        .collect()
}
