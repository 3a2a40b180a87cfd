//! Typed wrappers over the backend's resource endpoints.
//!
//! All of these go through the authenticated request path, so they share its
//! refresh-and-retry-once behavior.

use chrono::NaiveDate;

use super::{ApiClient, ApiError, Page, RequestOptions};
use crate::models::{
    Attendance, AttendanceStatus, BulkAttendanceRequest, BulkAttendanceResult, CheckoutRequest,
    CheckoutSession, Club, ClubInput, DashboardStats, DebtReport, FinanceReport, Group, GroupInput,
    ManualPaymentRequest, MarkAttendanceRequest, MrrReport, OccupancyReport, Payment,
    PublicGroupInfo, PublicSchedule, RecurringSessionsInput,
    Student, StudentInput, StudentsReport, Subscription, SubscriptionInput, SubscriptionStatus, TrainingSession,
    TrainingSessionInput,
};

/// Default page size for student listings
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Largest page size the backend accepts
pub const MAX_PER_PAGE: u32 = 100;

/// Largest number of top students a report returns
pub const MAX_TOP_STUDENTS: u32 = 100;

/// Date range for reports. Without dates the backend covers the last 30 days.
fn date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> RequestOptions {
    RequestOptions::new()
        .query_opt("from", from.map(|d| d.format("%Y-%m-%d")))
        .query_opt("to", to.map(|d| d.format("%Y-%m-%d")))
}

impl ApiClient {
    // ===== Clubs =====

    pub async fn list_clubs(&self) -> Result<Vec<Club>, ApiError> {
        self.get_list("/clubs", RequestOptions::default()).await
    }

    pub async fn get_club(&self, id: &str) -> Result<Club, ApiError> {
        self.get(&format!("/clubs/{}", id)).await
    }

    pub async fn create_club(&self, input: &ClubInput) -> Result<Club, ApiError> {
        self.post("/clubs", input).await
    }

    pub async fn update_club(&self, id: &str, input: &ClubInput) -> Result<Club, ApiError> {
        self.put(&format!("/clubs/{}", id), input).await
    }

    pub async fn delete_club(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/clubs/{}", id)).await
    }

    pub async fn club_dashboard(&self, club_id: &str) -> Result<DashboardStats, ApiError> {
        self.get(&format!("/clubs/{}/dashboard", club_id)).await
    }

    // ===== Reports =====

    pub async fn club_report_finance(
        &self,
        club_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<FinanceReport, ApiError> {
        self.get_with(
            &format!("/clubs/{}/reports/finance", club_id),
            date_range(from, to),
        )
        .await
    }

    pub async fn club_report_occupancy(
        &self,
        club_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<OccupancyReport, ApiError> {
        self.get_with(
            &format!("/clubs/{}/reports/occupancy", club_id),
            date_range(from, to),
        )
        .await
    }

    /// Recurring revenue for the month containing `month`; the current month
    /// when unset.
    pub async fn club_report_mrr(
        &self,
        club_id: &str,
        month: Option<NaiveDate>,
    ) -> Result<MrrReport, ApiError> {
        self.get_with(
            &format!("/clubs/{}/reports/mrr", club_id),
            RequestOptions::new().query_opt("month", month.map(|d| d.format("%Y-%m"))),
        )
        .await
    }

    pub async fn club_report_students(
        &self,
        club_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        limit: Option<u32>,
    ) -> Result<StudentsReport, ApiError> {
        self.get_with(
            &format!("/clubs/{}/reports/students", club_id),
            date_range(from, to).query_opt("limit", limit.map(|l| l.clamp(1, MAX_TOP_STUDENTS))),
        )
        .await
    }

    /// Pending payments older than `min_days_overdue` (backend default 7).
    pub async fn club_report_debt(
        &self,
        club_id: &str,
        min_days_overdue: Option<u32>,
    ) -> Result<DebtReport, ApiError> {
        self.get_with(
            &format!("/clubs/{}/reports/debt", club_id),
            RequestOptions::new().query_opt("days", min_days_overdue.map(|d| d.max(1))),
        )
        .await
    }

    // ===== Groups =====

    pub async fn list_groups(&self, club_id: &str) -> Result<Vec<Group>, ApiError> {
        self.get_list(&format!("/clubs/{}/groups", club_id), RequestOptions::default())
            .await
    }

    pub async fn get_group(&self, id: &str) -> Result<Group, ApiError> {
        self.get(&format!("/groups/{}", id)).await
    }

    pub async fn create_group(&self, input: &GroupInput) -> Result<Group, ApiError> {
        self.post("/groups", input).await
    }

    pub async fn update_group(&self, id: &str, input: &GroupInput) -> Result<Group, ApiError> {
        self.put(&format!("/groups/{}", id), input).await
    }

    pub async fn delete_group(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/groups/{}", id)).await
    }

    // ===== Training sessions =====

    pub async fn list_sessions(&self, group_id: &str) -> Result<Vec<TrainingSession>, ApiError> {
        self.get_list(&format!("/groups/{}/sessions", group_id), RequestOptions::default())
            .await
    }

    pub async fn get_session(&self, id: &str) -> Result<TrainingSession, ApiError> {
        self.get(&format!("/sessions/{}", id)).await
    }

    pub async fn create_session(
        &self,
        group_id: &str,
        input: &TrainingSessionInput,
    ) -> Result<TrainingSession, ApiError> {
        self.post(&format!("/groups/{}/sessions", group_id), input)
            .await
    }

    pub async fn create_recurring_sessions(
        &self,
        group_id: &str,
        input: &RecurringSessionsInput,
    ) -> Result<Vec<TrainingSession>, ApiError> {
        self.post(&format!("/groups/{}/sessions/recurring", group_id), input)
            .await
    }

    pub async fn update_session(
        &self,
        id: &str,
        input: &TrainingSessionInput,
    ) -> Result<TrainingSession, ApiError> {
        self.put(&format!("/sessions/{}", id), input).await
    }

    pub async fn delete_session(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/sessions/{}", id)).await
    }

    // ===== Students =====

    /// One page of a club's students. `page` starts at 1; `per_page` is clamped
    /// to what the backend accepts.
    pub async fn list_students(
        &self,
        club_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Student>, ApiError> {
        let options = RequestOptions::new()
            .query("page", page.max(1))
            .query("per_page", per_page.clamp(1, MAX_PER_PAGE));
        self.get_page(&format!("/clubs/{}/students", club_id), options)
            .await
    }

    pub async fn search_students(
        &self,
        club_id: &str,
        query: &str,
    ) -> Result<Vec<Student>, ApiError> {
        self.get_list(
            &format!("/clubs/{}/students/search", club_id),
            RequestOptions::new().query("q", query),
        )
        .await
    }

    pub async fn get_student(&self, id: &str) -> Result<Student, ApiError> {
        self.get(&format!("/students/{}", id)).await
    }

    pub async fn create_student(&self, input: &StudentInput) -> Result<Student, ApiError> {
        self.post("/students", input).await
    }

    pub async fn update_student(&self, id: &str, input: &StudentInput) -> Result<Student, ApiError> {
        self.put(&format!("/students/{}", id), input).await
    }

    pub async fn delete_student(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/students/{}", id)).await
    }

    // ===== Subscriptions =====

    pub async fn list_club_subscriptions(
        &self,
        club_id: &str,
        status: Option<SubscriptionStatus>,
    ) -> Result<Vec<Subscription>, ApiError> {
        self.get_list(
            &format!("/clubs/{}/subscriptions", club_id),
            RequestOptions::new().query_opt("status", status.map(|s| s.as_str())),
        )
        .await
    }

    pub async fn list_student_subscriptions(
        &self,
        student_id: &str,
    ) -> Result<Vec<Subscription>, ApiError> {
        self.get_list(
            &format!("/students/{}/subscriptions", student_id),
            RequestOptions::default(),
        )
        .await
    }

    pub async fn get_subscription(&self, id: &str) -> Result<Subscription, ApiError> {
        self.get(&format!("/subscriptions/{}", id)).await
    }

    pub async fn create_subscription(
        &self,
        input: &SubscriptionInput,
    ) -> Result<Subscription, ApiError> {
        self.post("/subscriptions", input).await
    }

    pub async fn cancel_subscription(&self, id: &str) -> Result<Subscription, ApiError> {
        self.put_empty(&format!("/subscriptions/{}/cancel", id))
            .await
    }

    // ===== Attendance =====

    pub async fn session_attendance(&self, session_id: &str) -> Result<Vec<Attendance>, ApiError> {
        self.get_list(
            &format!("/sessions/{}/attendance", session_id),
            RequestOptions::default(),
        )
        .await
    }

    pub async fn mark_attendance(
        &self,
        request: &MarkAttendanceRequest,
    ) -> Result<Attendance, ApiError> {
        self.post("/attendance", request).await
    }

    pub async fn bulk_mark_attendance(
        &self,
        request: &BulkAttendanceRequest,
    ) -> Result<Vec<Attendance>, ApiError> {
        let result: BulkAttendanceResult = self.post("/attendance/bulk", request).await?;
        Ok(result.results)
    }

    pub async fn update_attendance(
        &self,
        id: &str,
        status: AttendanceStatus,
    ) -> Result<Attendance, ApiError> {
        #[derive(serde::Serialize)]
        struct StatusUpdate {
            status: AttendanceStatus,
        }

        self.put(&format!("/attendance/{}", id), &StatusUpdate { status })
            .await
    }

    pub async fn delete_attendance(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/attendance/{}", id)).await
    }

    // ===== Payments =====

    pub async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, ApiError> {
        self.post("/payments/create-checkout-session", request)
            .await
    }

    pub async fn create_manual_payment(
        &self,
        request: &ManualPaymentRequest,
    ) -> Result<Payment, ApiError> {
        self.post("/payments/manual", request).await
    }

    // ===== Public =====

    /// Anonymous schedule for a club. Without dates the backend shows the next
    /// 30 days.
    pub async fn public_schedule(
        &self,
        club_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<PublicSchedule, ApiError> {
        self.get_public(&format!("/club/{}/schedule", club_id), date_range(from, to))
            .await
    }

    pub async fn public_groups(&self, club_id: &str) -> Result<Vec<PublicGroupInfo>, ApiError> {
        self.get_public(&format!("/club/{}/groups", club_id), RequestOptions::default())
            .await
    }
}
