//! Training sessions and the public schedule.
//!
//! "Session" here means a scheduled training slot of a group, not the login
//! session held by `auth::Session`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TrainingSession {
    pub id: String,
    pub group_id: String,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TrainingSession {
    pub fn end_at(&self) -> DateTime<Utc> {
        self.start_at + Duration::minutes(i64::from(self.duration_minutes))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrainingSessionInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Weekly sessions generated server-side between two dates.
#[derive(Debug, Clone, Serialize)]
pub struct RecurringSessionsInput {
    /// Local start time, `HH:MM`.
    pub start_time: String,
    /// ISO weekdays, 1 = Monday.
    pub weekdays: Vec<u8>,
    /// `YYYY-MM-DD`
    pub from_date: String,
    /// `YYYY-MM-DD`
    pub to_date: String,
    pub duration_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PublicSchedule {
    pub club: PublicClubInfo,
    #[serde(default)]
    pub groups: Vec<PublicGroupInfo>,
    #[serde(default)]
    pub sessions: Vec<PublicSessionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PublicClubInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PublicGroupInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PublicSessionInfo {
    pub id: String,
    pub group_id: String,
    #[serde(default)]
    pub group_title: String,
    pub start_at: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_public_schedule() {
        let json = r#"{
            "club": {"id": "c1", "name": "Riverside Judo", "currency": "EUR"},
            "groups": [{"id": "g1", "title": "Juniors", "price": 40.0}],
            "sessions": [{"id": "s1", "group_id": "g1", "group_title": "Juniors",
                          "start_at": "2025-12-01T18:00:00Z", "duration_minutes": 90}]
        }"#;
        let schedule: PublicSchedule = serde_json::from_str(json).expect("parse schedule");
        assert_eq!(schedule.club.name, "Riverside Judo");
        assert_eq!(schedule.groups[0].capacity, None);
        assert_eq!(schedule.sessions[0].group_title, "Juniors");
    }

    #[test]
    fn test_session_end_time() {
        let session = TrainingSession {
            id: "s1".into(),
            group_id: "g1".into(),
            start_at: "2025-12-01T18:00:00Z".parse().expect("timestamp"),
            duration_minutes: 90,
            location: None,
            created_at: None,
        };
        assert_eq!(session.end_at().to_rfc3339(), "2025-12-01T19:30:00+00:00");
    }
}
