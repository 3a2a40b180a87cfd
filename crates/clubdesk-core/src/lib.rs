//! Core library for clubdesk, a client for a sports-club management backend.
//!
//! The interesting part is the request path in [`api::ApiClient`]: every call
//! carries the current access token, and an expired token is renewed through a
//! single shared refresh before the call is retried once. Everything else is
//! typed plumbing over the REST endpoints.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthService, Session, SessionStatus};
pub use config::Config;
