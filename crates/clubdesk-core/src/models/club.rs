use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Club {
    pub id: String,
    pub owner_user_id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Body for creating or updating a club. Unset fields are left out of the
/// request so updates only touch what was given.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClubInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DashboardStats {
    #[serde(default)]
    pub total_students: u32,
    #[serde(default)]
    pub active_subscriptions: u32,
    #[serde(default)]
    pub upcoming_sessions: u32,
    #[serde(default)]
    pub today_sessions: u32,
    #[serde(default)]
    pub month_revenue: f64,
    #[serde(default)]
    pub pending_payments: u32,
}
