use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Student {
    pub id: String,
    pub club_id: String,
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_contact: Option<ParentContact>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ParentContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ParentContact {
    /// Best single line to reach the parent.
    pub fn display(&self) -> String {
        let reach = self.phone.as_deref().or(self.email.as_deref());
        match (self.name.as_deref(), reach) {
            (Some(name), Some(reach)) => format!("{} ({})", name, reach),
            (Some(name), None) => name.to_string(),
            (None, Some(reach)) => reach.to_string(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StudentInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub club_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_contact: Option<ParentContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
