use std::sync::{Arc, RwLock};

use tokio::sync::watch;
use tracing::{info, warn};

use super::{Credentials, LogoutReason, Session, SessionStatus, TokenStore};
use crate::api::{ApiClient, ApiError, RequestOptions};
use crate::config::Config;
use crate::models::{AuthResponse, LoginRequest, SignupRequest, User};

/// Owns the session for the lifetime of the application and hands the API
/// client out to everything else.
pub struct AuthService {
    client: ApiClient,
    session: Arc<Session>,
    user: RwLock<Option<User>>,
}

impl AuthService {
    /// Build the service with the token store selected in `config`.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let store = config.token_store()?;
        Ok(Self::with_store(config, store)?)
    }

    pub fn with_store(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let session = Arc::new(Session::new(store));
        let client = ApiClient::new(config, session.clone())?;
        Ok(Self {
            client,
            session,
            user: RwLock::new(None),
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.session.subscribe()
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let response: AuthResponse = self
            .client
            .post_with(
                "/auth/login",
                &LoginRequest { email, password },
                RequestOptions::without_refresh(),
            )
            .await?;
        info!(user_id = %response.user.id, "Logged in");
        Ok(self.commit(response))
    }

    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Result<User, ApiError> {
        let response: AuthResponse = self
            .client
            .post_with(
                "/auth/signup",
                &SignupRequest {
                    email,
                    password,
                    name,
                },
                RequestOptions::without_refresh(),
            )
            .await?;
        info!(user_id = %response.user.id, "Signed up");
        Ok(self.commit(response))
    }

    /// The signed-in user, as the backend sees it.
    pub async fn me(&self) -> Result<User, ApiError> {
        let user: User = self.client.get("/auth/me").await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    /// Hydrate the session from the token store and validate it.
    ///
    /// Returns `Ok(None)` when no tokens are stored. Authorization failures
    /// end the session; transport failures keep the stored tokens for a
    /// later attempt.
    pub async fn restore(&self) -> Result<Option<User>, ApiError> {
        let found = self
            .session
            .load()
            .map_err(|e| ApiError::Storage(format!("{e:#}")))?;
        if !found {
            return Ok(None);
        }

        match self.me().await {
            Ok(user) => {
                info!(user_id = %user.id, "Session restored");
                Ok(Some(user))
            }
            Err(err @ ApiError::Unauthorized(_)) => {
                warn!("Stored session rejected");
                self.end_session(LogoutReason::RestoreFailed);
                Err(err)
            }
            Err(err) => {
                if err.requires_login() {
                    self.set_user(None);
                }
                Err(err)
            }
        }
    }

    /// Forget the session and its stored tokens. Safe to call repeatedly.
    pub fn logout(&self) {
        self.end_session(LogoutReason::UserRequested);
    }

    fn commit(&self, response: AuthResponse) -> User {
        self.session.update(Credentials::new(
            response.access_token,
            response.refresh_token,
        ));
        self.set_user(Some(response.user.clone()));
        response.user
    }

    fn end_session(&self, reason: LogoutReason) {
        self.session.clear(reason);
        self.set_user(None);
    }

    fn set_user(&self, user: Option<User>) {
        *self.user.write().unwrap_or_else(|e| e.into_inner()) = user;
    }
}
