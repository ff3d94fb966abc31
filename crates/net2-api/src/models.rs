// Wire types for the Net2 REST API
//
// Field names follow the server's JSON exactly (which mixes PascalCase and
// camelCase depending on the endpoint). These are decoded as-is and
// converted into domain types by net2-core.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// One row of the `UsersEx` custom query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRow {
    #[serde(rename = "userID")]
    pub id: i64,
    #[serde(rename = "UserGUID", default)]
    pub guid: Option<String>,
    #[serde(rename = "FirstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "Surname", default)]
    pub surname: Option<String>,
    #[serde(rename = "ActivateDate", default)]
    pub activate_date: Option<String>,
    #[serde(rename = "ExpiryDate", default)]
    pub expiry_date: Option<String>,
    #[serde(rename = "PIN", default, deserialize_with = "lenient_string")]
    pub pin: Option<String>,
    #[serde(rename = "lastKnownLocation", default)]
    pub last_known_location: Option<String>,
    #[serde(rename = "lastAccessTime", default)]
    pub last_access_time: Option<String>,
    #[serde(rename = "DepartmentID", default)]
    pub department_id: Option<i64>,
    #[serde(rename = "DepartmentName", default)]
    pub department_name: Option<String>,
    #[serde(rename = "AccessLevelName", default)]
    pub access_level_name: Option<String>,
    #[serde(rename = "LocalID", default, deserialize_with = "lenient_string")]
    pub local_id: Option<String>,
}

/// Row of `SELECT Address, StatusFlag FROM devices`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DeviceStatusRow {
    #[serde(rename = "Address")]
    pub address: i64,
    #[serde(rename = "StatusFlag", alias = "statusFlag", default)]
    pub status_flag: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoorRecord {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessLevelRecord {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AreaRecord {
    #[serde(rename = "areaID", alias = "areaId")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentRecord {
    #[serde(rename = "Id", alias = "id")]
    pub id: i64,
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldDefinition {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: i64,
    #[serde(default)]
    pub max_length: i64,
}

/// A user's exact door permissions: shared access levels plus
/// individually granted areas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    #[serde(default)]
    pub access_levels: Vec<i64>,
    #[serde(default)]
    pub individual_permissions: Vec<AreaPermission>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaPermission {
    #[serde(rename = "areaId", alias = "id")]
    pub area_id: i64,
}

/// Body of `PUT /api/v1/users/{id}`.
///
/// `ExpiryDate` is always sent; `None` clears the expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserUpdate {
    #[serde(rename = "Id")]
    pub id: i64,
    #[serde(rename = "FirstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(rename = "LastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(rename = "ExpiryDate", serialize_with = "naive_local")]
    pub expiry_date: Option<NaiveDateTime>,
}

/// Door controller relay used for a timed open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Relay {
    #[default]
    Relay1,
    Relay2,
}

/// Format used by the server for local wall-clock timestamps.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[allow(clippy::ref_option)]
fn naive_local<S: serde::Serializer>(
    value: &Option<NaiveDateTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(dt) => serializer.collect_str(&dt.format(DATE_FORMAT)),
        None => serializer.serialize_none(),
    }
}

/// Accepts strings, numbers or null; custom fields come back as either.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
