use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum AttendanceStatus {
    Present,
    Absent,
    Excused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Attendance {
    pub id: String,
    pub session_id: String,
    pub student_id: String,
    #[serde(default)]
    pub subscription_id: Option<String>,
    pub status: AttendanceStatus,
    pub noted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkAttendanceRequest {
    pub session_id: String,
    pub student_id: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkAttendanceItem {
    pub student_id: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkAttendanceRequest {
    pub session_id: String,
    pub attendances: Vec<BulkAttendanceItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkAttendanceResult {
    #[serde(default)]
    pub results: Vec<Attendance>,
}
