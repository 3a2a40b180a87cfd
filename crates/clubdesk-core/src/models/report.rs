//! Club reports. All numbers are computed by the backend; these types only
//! carry them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lists in reports come back as `null` when a period has no rows.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct FinanceReport {
    #[serde(default)]
    pub total_paid: f64,
    #[serde(default)]
    pub total_refunded: f64,
    #[serde(default)]
    pub net_revenue: f64,
    #[serde(default)]
    pub payment_count: u32,
    #[serde(default)]
    pub avg_payment: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payments_by_method: Vec<PaymentByMethod>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub payments_by_group: Vec<PaymentByGroup>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub daily_revenue: Vec<DailyRevenue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PaymentByMethod {
    pub method: String,
    pub amount: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PaymentByGroup {
    pub group_id: String,
    pub group_title: String,
    pub amount: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DailyRevenue {
    /// `YYYY-MM-DD`
    pub date: String,
    pub amount: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct OccupancyReport {
    /// Percentage, 0-100
    #[serde(default)]
    pub avg_fill_rate: f64,
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub total_attendees: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub group_stats: Vec<GroupOccupancy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct GroupOccupancy {
    pub group_id: String,
    pub group_title: String,
    pub capacity: u32,
    pub session_count: u32,
    pub total_present: u32,
    pub avg_fill_rate: f64,
}

/// Monthly recurring revenue for one month.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct MrrReport {
    /// `YYYY-MM`
    pub month: String,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub new_subscriptions: u32,
    #[serde(default)]
    pub churned_subscriptions: u32,
    #[serde(default)]
    pub active_subscriptions: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct StudentsReport {
    #[serde(default)]
    pub total_students: u32,
    #[serde(default)]
    pub active_students: u32,
    #[serde(default)]
    pub avg_sessions_per_student: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub top_students: Vec<TopStudent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TopStudent {
    pub student_id: String,
    pub student_name: String,
    pub session_count: u32,
    pub present_count: u32,
    pub attendance_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DebtReport {
    #[serde(default)]
    pub total_pending_amount: f64,
    #[serde(default)]
    pub pending_count: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub debtors: Vec<Debtor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Debtor {
    pub student_id: String,
    pub student_name: String,
    #[serde(default)]
    pub parent_phone: Option<String>,
    #[serde(default)]
    pub parent_email: Option<String>,
    pub subscription_id: String,
    pub group_title: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub days_overdue: u32,
}

impl Debtor {
    /// Phone if known, otherwise email, otherwise empty.
    pub fn contact(&self) -> &str {
        self.parent_phone
            .as_deref()
            .or(self.parent_email.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_lists_decode_as_empty() {
        let json = r#"{"total_paid":0,"payment_count":0,"payments_by_method":null,"daily_revenue":null}"#;
        let report: FinanceReport = serde_json::from_str(json).expect("parse");
        assert!(report.payments_by_method.is_empty());
        assert!(report.payments_by_group.is_empty());
        assert!(report.daily_revenue.is_empty());
    }

    #[test]
    fn test_debtor_contact_prefers_phone() {
        let json = r#"{
            "student_id": "s1", "student_name": "Leo", "parent_email": "mum@example.com",
            "subscription_id": "sub1", "group_title": "Juniors", "amount": 45.0,
            "created_at": "2025-11-20T10:00:00Z", "days_overdue": 11
        }"#;
        let mut debtor: Debtor = serde_json::from_str(json).expect("parse");
        assert_eq!(debtor.contact(), "mum@example.com");
        debtor.parent_phone = Some("+49 30 1234".into());
        assert_eq!(debtor.contact(), "+49 30 1234");
    }
}
