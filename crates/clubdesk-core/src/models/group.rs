use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Group {
    pub id: String,
    pub club_id: String,
    pub title: String,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub coach_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn display_capacity(&self) -> String {
        match self.capacity {
            Some(capacity) => format!("{} places", capacity),
            None => "Unlimited".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coach_user_id: Option<String>,
}
