//! REST API client module for the clubdesk backend.
//!
//! This module provides the `ApiClient` for talking to the club-management
//! API: clubs, groups, training sessions, students, subscriptions,
//! attendance and payments.
//!
//! The API uses bearer access tokens. An expired access token is renewed
//! transparently through the refresh endpoint, once per request.

pub mod client;
pub mod envelope;
pub mod error;
pub mod resources;

pub use client::{ApiClient, Attempt, PendingRequest, RequestOptions};
pub use envelope::{Envelope, ErrorBody, Meta, Page};
pub use error::ApiError;
