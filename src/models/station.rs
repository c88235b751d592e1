use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A charging station and the number of vehicles it can serve per slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: String,
    pub total_slots: u32,
    pub updated_at: DateTime<Utc>,
}
