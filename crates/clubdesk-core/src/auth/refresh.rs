//! Single-flight renewal of the access token.
//!
//! At most one refresh call is outstanding at any time. The first request that
//! sees a 401 starts it; every other request that sees a 401 while it runs
//! awaits the same shared future. The slot is emptied once the future settles,
//! so the next expiry starts a fresh refresh.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{Credentials, LogoutReason, Session};
use crate::api::{ApiError, Envelope};
use crate::models::TokenPair;

/// Path of the refresh endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Why a refresh did not produce new tokens. Every failure ends the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// No refresh token is stored; the backend is not called.
    MissingRefreshToken,
    /// The backend refused the refresh token or answered with garbage.
    Rejected(String),
    /// The backend could not be reached or failed on its side.
    Unavailable(String),
    Timeout,
    /// The session was cleared or replaced while the refresh was running.
    Superseded,
}

impl RefreshFailure {
    fn into_api_error(self) -> ApiError {
        let reason = match self {
            RefreshFailure::MissingRefreshToken => "no refresh token stored".to_string(),
            RefreshFailure::Rejected(reason) | RefreshFailure::Unavailable(reason) => reason,
            RefreshFailure::Timeout => "token refresh timed out".to_string(),
            RefreshFailure::Superseded => "session ended during token refresh".to_string(),
        };
        ApiError::SessionExpired(reason)
    }

    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RefreshFailure::Timeout
        } else {
            RefreshFailure::Unavailable(err.to_string())
        }
    }
}

type RefreshFuture = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

struct InFlight {
    id: u64,
    future: RefreshFuture,
}

#[derive(Default)]
struct Slot {
    next_id: u64,
    current: Option<InFlight>,
}

pub struct RefreshCoordinator {
    http: Client,
    endpoint: String,
    session: Arc<Session>,
    timeout: Duration,
    slot: Mutex<Slot>,
}

impl RefreshCoordinator {
    pub fn new(http: Client, base_url: &str, session: Arc<Session>, timeout: Duration) -> Self {
        Self {
            http,
            endpoint: format!("{}{}", base_url, REFRESH_PATH),
            session,
            timeout,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Obtain a fresh access token for a request that was rejected while
    /// carrying `stale_token`.
    ///
    /// If another refresh already replaced that token, the current token is
    /// returned without calling the backend.
    pub async fn refresh(&self, stale_token: Option<&str>) -> Result<String, ApiError> {
        let (id, future) = {
            let mut slot = self.slot.lock().await;

            // A settled future still parked in the slot belongs to a caller that
            // went away before clearing it.
            if slot
                .current
                .as_ref()
                .is_some_and(|f| f.future.peek().is_some())
            {
                slot.current = None;
            }

            let joined = slot.current.as_ref().map(|f| (f.id, f.future.clone()));
            match joined {
                Some((id, future)) => {
                    debug!(refresh_id = id, "Joining in-flight token refresh");
                    (id, future)
                }
                None => {
                    let current = self.session.access_token();
                    if current.is_some() && current.as_deref() != stale_token {
                        debug!("Access token already renewed by another request");
                        return current.ok_or_else(|| {
                            ApiError::SessionExpired("session cleared".to_string())
                        });
                    }

                    slot.next_id += 1;
                    let id = slot.next_id;
                    let future = self.start(id).shared();
                    slot.current = Some(InFlight {
                        id,
                        future: future.clone(),
                    });
                    (id, future)
                }
            }
        };

        let outcome = future.await;

        {
            let mut slot = self.slot.lock().await;
            if slot.current.as_ref().map(|f| f.id) == Some(id) {
                slot.current = None;
            }
        }

        outcome.map_err(RefreshFailure::into_api_error)
    }

    /// True while a refresh call is outstanding.
    pub async fn is_refreshing(&self) -> bool {
        self.slot
            .lock()
            .await
            .current
            .as_ref()
            .is_some_and(|f| f.future.peek().is_none())
    }

    fn start(&self, id: u64) -> BoxFuture<'static, Result<String, RefreshFailure>> {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let session = self.session.clone();
        let timeout = self.timeout;

        // Sampled before the call so a logout that lands meanwhile wins.
        let generation = session.generation();

        async move {
            info!(refresh_id = id, "Refreshing access token");
            let refresh_token = session.refresh_token();
            let outcome = match tokio::time::timeout(
                timeout,
                Self::exchange(&http, &endpoint, refresh_token),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(RefreshFailure::Timeout),
            };

            match outcome {
                Ok(credentials) => {
                    let token = credentials.access_token.clone();
                    // Committed before any waiting request is re-issued.
                    if !session.update_if_current(generation, credentials) {
                        info!(refresh_id = id, "Session changed during refresh, discarding tokens");
                        return Err(RefreshFailure::Superseded);
                    }
                    info!(refresh_id = id, "Access token refreshed");
                    Ok(token)
                }
                Err(failure) => {
                    warn!(refresh_id = id, ?failure, "Token refresh failed, ending session");
                    session.clear_if_current(generation, LogoutReason::RefreshFailed);
                    Err(failure)
                }
            }
        }
        .boxed()
    }

    async fn exchange(
        http: &Client,
        endpoint: &str,
        refresh_token: Option<String>,
    ) -> Result<Credentials, RefreshFailure> {
        let Some(refresh_token) = refresh_token else {
            return Err(RefreshFailure::MissingRefreshToken);
        };

        let response = http
            .post(endpoint)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await
            .map_err(RefreshFailure::from_transport)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(RefreshFailure::from_transport)?;

        if status.is_server_error() {
            return Err(RefreshFailure::Unavailable(
                ApiError::from_status(status, &body).user_message(),
            ));
        }
        if !status.is_success() {
            return Err(RefreshFailure::Rejected(
                ApiError::from_status(status, &body).user_message(),
            ));
        }

        let envelope: Envelope<TokenPair> = serde_json::from_str(&body)
            .map_err(|e| RefreshFailure::Rejected(format!("malformed refresh response: {e}")))?;
        let pair = envelope
            .into_data()
            .map_err(|e| RefreshFailure::Rejected(e.to_string()))?;

        Ok(Credentials::new(pair.access_token, pair.refresh_token))
    }
}
