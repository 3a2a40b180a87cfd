use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub subscription_id: String,
    pub amount: f64,
    pub currency: String,
    pub method: String,
    pub status: String,
    #[serde(default)]
    pub provider_payment_id: Option<String>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSubscription {
    pub total_sessions: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub group_id: String,
    pub subscription: CheckoutSubscription,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualPaymentRequest {
    pub subscription_id: String,
    pub amount: f64,
    pub method: String,
}
