//! Authentication module for managing user sessions and tokens.
//!
//! This module provides:
//! - `Session`: the single owner of the access/refresh token pair
//! - `TokenStore`: persistence for the token pair (keyring, file, memory)
//! - `RefreshCoordinator`: single-flight token renewal
//! - `AuthService`: login, signup, logout and session restore

pub mod refresh;
pub mod service;
pub mod session;
pub mod store;

pub use refresh::{RefreshCoordinator, RefreshFailure};
pub use service::AuthService;
pub use session::{Credentials, LogoutReason, Session, SessionStatus};
pub use store::{FileStore, KeyringStore, MemoryStore, TokenStore};
