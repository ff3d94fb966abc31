// ── Unknown token events ──

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An access attempt by a token the server doesn't recognise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownTokenEvent {
    #[serde(rename = "EventDate")]
    pub date: NaiveDateTime,
    #[serde(rename = "where")]
    pub location: String,
    #[serde(rename = "tokenNumber")]
    pub token: i64,
}
