// ── User domain type ──

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::access::Department;
use crate::clock::midnight;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub guid: String,
    pub first_name: String,
    pub surname: String,
    pub pin: Option<String>,
    pub departments: Vec<Department>,
    pub activated: Option<NaiveDateTime>,
    /// `None` means the user never expires.
    pub expiry: Option<NaiveDateTime>,
    pub last_access: Option<NaiveDateTime>,
    pub last_known_location: Option<String>,
    /// Value of the configured local-identifier custom field.
    pub local_id: Option<String>,
    /// Resolved access level names.
    pub access_levels: Vec<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        match (self.first_name.is_empty(), self.surname.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.surname),
            (false, true) => self.first_name.clone(),
            _ => self.surname.clone(),
        }
    }

    /// Active if the expiry is unset or not before today's midnight.
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        self.expiry.is_none_or(|expiry| expiry >= midnight(now))
    }

    /// Whether the user badged in after today's midnight.
    pub fn accessed_today(&self, now: NaiveDateTime) -> bool {
        self.last_access.is_some_and(|at| at > midnight(now))
    }
}
