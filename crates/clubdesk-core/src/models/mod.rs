//! Data models for clubdesk entities.
//!
//! These mirror the JSON the backend puts inside the `data` field of its
//! response envelope:
//!
//! - `User`, `AuthResponse`, `TokenPair`: accounts and issued tokens
//! - `Club`, `DashboardStats`: clubs and their summary numbers
//! - `Group`, `TrainingSession`: groups and their scheduled sessions
//! - `Student`, `Subscription`, `Attendance`, `Payment`
//! - `FinanceReport`, `OccupancyReport`, `MrrReport`, `StudentsReport`,
//!   `DebtReport`: club reports computed by the backend
//! - `PublicSchedule`: the anonymous schedule view of a club

pub mod attendance;
pub mod club;
pub mod group;
pub mod payment;
pub mod report;
pub mod schedule;
pub mod student;
pub mod subscription;
pub mod user;

pub use attendance::{
    Attendance, AttendanceStatus, BulkAttendanceItem, BulkAttendanceRequest, BulkAttendanceResult,
    MarkAttendanceRequest,
};
pub use club::{Club, ClubInput, DashboardStats};
pub use group::{Group, GroupInput};
pub use payment::{CheckoutRequest, CheckoutSession, CheckoutSubscription, ManualPaymentRequest, Payment};
pub use report::{
    DailyRevenue, DebtReport, Debtor, FinanceReport, GroupOccupancy, MrrReport, OccupancyReport,
    PaymentByGroup, PaymentByMethod, StudentsReport, TopStudent,
};
pub use schedule::{
    PublicClubInfo, PublicGroupInfo, PublicSchedule, PublicSessionInfo, RecurringSessionsInput,
    TrainingSession, TrainingSessionInput,
};
pub use student::{ParentContact, Student, StudentInput};
pub use subscription::{Subscription, SubscriptionInput, SubscriptionStatus};
pub use user::{AuthResponse, LoginRequest, SignupRequest, TokenPair, User};
