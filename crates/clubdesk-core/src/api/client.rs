//! API client for communicating with the clubdesk REST backend.
//!
//! Every request carries the current bearer token. A 401 on a request's first
//! attempt triggers one (coalesced) token refresh followed by exactly one
//! retry; everything else is returned to the caller as-is.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{ApiError, Envelope, Page};
use crate::auth::{RefreshCoordinator, Session};
use crate::config::Config;

/// Which send this is for a given request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    /// Re-issued once after a token refresh. Never retried again.
    Retry,
}

#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    /// Do not refresh on 401; used by the auth endpoints themselves.
    pub skip_refresh: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present.
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_refresh() -> Self {
        Self {
            skip_refresh: true,
            ..Self::default()
        }
    }
}

/// A request as issued by a caller, replayable at most once.
#[derive(Clone)]
pub struct PendingRequest {
    attempt: Attempt,
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    options: RequestOptions,
}

impl PendingRequest {
    pub fn new(
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        options: RequestOptions,
    ) -> Self {
        Self {
            attempt: Attempt::First,
            method,
            path: path.to_string(),
            body,
            options,
        }
    }

    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The same request marked as its single retry, or `None` if it may not be
    /// retried (already retried, or refresh disabled for it).
    pub fn into_retry(self) -> Option<Self> {
        match self.attempt {
            Attempt::First if !self.options.skip_refresh => Some(Self {
                attempt: Attempt::Retry,
                ..self
            }),
            _ => None,
        }
    }
}

/// API client for the clubdesk backend.
/// Clone is cheap - the reqwest client, session and refresh guard are shared.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    public_url: String,
    session: Arc<Session>,
    refresher: Arc<RefreshCoordinator>,
}

impl ApiClient {
    /// Create a client bound to `session`.
    pub fn new(config: &Config, session: Arc<Session>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let base_url = config.api_base_url();

        let refresher = Arc::new(RefreshCoordinator::new(
            http.clone(),
            &base_url,
            session.clone(),
            config.refresh_timeout(),
        ));

        Ok(Self {
            http,
            base_url,
            public_url: config.public_base_url(),
            session,
            refresher,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and decode the response envelope.
    ///
    /// `path` is relative to `<api-root>/api/v1` and starts with `/`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        options: RequestOptions,
    ) -> Result<Envelope<T>, ApiError> {
        let response = self
            .execute(PendingRequest::new(method, path, body, options))
            .await?;
        Self::decode(response).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get_with(path, RequestOptions::default()).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, options)
            .await?
            .into_data()
    }

    /// GET a list. A missing or null `data` is an empty list.
    pub async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Vec<T>, ApiError> {
        self.request(Method::GET, path, None, options)
            .await?
            .into_data_or_default()
    }

    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Page<T>, ApiError> {
        self.request::<Vec<T>>(Method::GET, path, None, options)
            .await?
            .into_page()
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.post_with(path, body, RequestOptions::default()).await
    }

    pub async fn post_with<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(Self::to_json(body)?), options)
            .await?
            .into_data()
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(Self::to_json(body)?), RequestOptions::default())
            .await?
            .into_data()
    }

    /// PUT without a body, e.g. state transitions like cancel.
    pub async fn put_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::PUT, path, None, RequestOptions::default())
            .await?
            .into_data()
    }

    /// DELETE. The backend answers 204 with no body, so nothing is decoded.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(PendingRequest::new(
            Method::DELETE,
            path,
            None,
            RequestOptions::default(),
        ))
        .await?;
        Ok(())
    }

    /// GET an anonymous endpoint under `<api-root>/public`. No token is sent
    /// and a 401 is never refreshed.
    pub async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.public_url, path);
        let mut builder = self.http.get(&url);
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let response = Self::check_response(builder.send().await?).await?;
        Self::decode::<T>(response).await?.into_data()
    }

    /// Send `pending`, refreshing and retrying once on a first-attempt 401.
    async fn execute(&self, mut pending: PendingRequest) -> Result<Response, ApiError> {
        loop {
            let token = self.session.access_token();
            let response = self.send_once(&pending, token.as_deref()).await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }
            if status != StatusCode::UNAUTHORIZED {
                return Err(Self::error_from(response).await);
            }

            let attempt = pending.attempt();
            let Some(retry) = pending.into_retry() else {
                debug!(?attempt, "Unauthorized, not retrying");
                return Err(Self::error_from(response).await);
            };

            debug!(
                method = %retry.method,
                path = %retry.path,
                had_token = token.is_some(),
                "Access token rejected, refreshing"
            );
            self.refresher.refresh(token.as_deref()).await?;
            pending = retry;
        }
    }

    async fn send_once(
        &self,
        pending: &PendingRequest,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, pending.path);
        debug!(method = %pending.method, url = %url, attempt = ?pending.attempt, "Sending request");

        let mut builder = self
            .http
            .request(pending.method.clone(), &url)
            .headers(Self::auth_headers(token)?);
        if !pending.options.query.is_empty() {
            builder = builder.query(&pending.options.query);
        }
        if let Some(ref body) = pending.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = pending.options.timeout {
            builder = builder.timeout(timeout);
        }

        builder.send().await.map_err(|err| {
            warn!(method = %pending.method, url = %url, error = %err, "Request failed");
            ApiError::from(err)
        })
    }

    fn auth_headers(token: Option<&str>) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::Storage("access token is not a valid header value".into()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ApiError::from_status(status, &body)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<Envelope<T>, ApiError> {
        let url = response.url().to_string();
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e))
        })
    }

    fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::{MemoryStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
    use crate::auth::{LogoutReason, SessionStatus};
    use mockito::{Matcher, Mock, Server, ServerGuard};
    use serde_json::json;

    const CLUBS_PATH: &str = "/api/v1/clubs";
    const REFRESH_PATH: &str = "/api/v1/auth/refresh";

    fn clubs_body() -> String {
        json!({
            "success": true,
            "data": [{
                "id": "c1",
                "owner_user_id": "u1",
                "name": "Riverside Judo",
                "currency": "EUR",
                "created_at": "2025-01-10T09:00:00Z"
            }]
        })
        .to_string()
    }

    fn unauthorized_body() -> String {
        json!({"success": false, "error": {"code": "UNAUTHORIZED", "message": "invalid or expired token"}})
            .to_string()
    }

    fn client_with(
        server: &ServerGuard,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> (ApiClient, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_tokens(access, refresh));
        let session = Arc::new(Session::new(store.clone()));
        session.load().expect("load session");
        let client = ApiClient::new(&Config::for_api_root(&server.url()), session)
            .expect("build client");
        (client, store)
    }

    async fn refresh_mock(server: &mut ServerGuard, from: &str, access: &str, refresh: &str) -> Mock {
        server
            .mock("POST", REFRESH_PATH)
            .match_body(Matcher::Json(json!({"refresh_token": from})))
            .with_status(200)
            .with_body(
                json!({"success": true, "data": {"access_token": access, "refresh_token": refresh}})
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_valid_token_passes_through() {
        let mut server = Server::new_async().await;
        let clubs = server
            .mock("GET", CLUBS_PATH)
            .match_header("authorization", "Bearer A1")
            .with_status(200)
            .with_body(clubs_body())
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .expect(0)
            .create_async()
            .await;

        let (client, _) = client_with(&server, Some("A1"), Some("R1"));
        let envelope: Envelope<Vec<crate::models::Club>> = client
            .request(Method::GET, "/clubs", None, RequestOptions::default())
            .await
            .expect("request");
        assert!(envelope.success);
        assert_eq!(envelope.data.expect("data")[0].name, "Riverside Judo");

        clubs.assert_async().await;
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_and_retries_once() {
        let mut server = Server::new_async().await;
        let expired = server
            .mock("GET", CLUBS_PATH)
            .match_header("authorization", "Bearer A1")
            .with_status(401)
            .with_body(unauthorized_body())
            .expect(1)
            .create_async()
            .await;
        let refresh = refresh_mock(&mut server, "R1", "A2", "R2").await;
        let retried = server
            .mock("GET", CLUBS_PATH)
            .match_header("authorization", "Bearer A2")
            .with_status(200)
            .with_body(clubs_body())
            .expect(1)
            .create_async()
            .await;

        let (client, store) = client_with(&server, Some("A1"), Some("R1"));
        let clubs: Vec<crate::models::Club> = client.get("/clubs").await.expect("clubs");
        assert_eq!(clubs.len(), 1);

        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("A2"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).as_deref(), Some("R2"));
        expired.assert_async().await;
        refresh.assert_async().await;
        retried.assert_async().await;
    }

    #[tokio::test]
    async fn test_second_unauthorized_is_returned_without_refreshing_again() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", CLUBS_PATH)
            .with_status(401)
            .with_body(unauthorized_body())
            .expect(2)
            .create_async()
            .await;
        let refresh = refresh_mock(&mut server, "R1", "A2", "R2").await;

        let (client, _) = client_with(&server, Some("A1"), Some("R1"));
        let err = client
            .get::<Vec<crate::models::Club>>("/clubs")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "invalid or expired token"));
        assert!(!err.requires_login());
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_session() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", CLUBS_PATH)
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("POST", REFRESH_PATH)
            .with_status(401)
            .with_body(
                json!({"success": false, "error": {"code": "UNAUTHORIZED", "message": "invalid or expired refresh token"}})
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let (client, store) = client_with(&server, Some("A1"), Some("R1"));
        let mut status = client.session().subscribe();

        let err = client
            .get::<Vec<crate::models::Club>>("/clubs")
            .await
            .unwrap_err();

        assert!(err.requires_login());
        assert!(store.is_empty());
        assert!(!client.session().is_authenticated());
        assert_eq!(
            *status.borrow_and_update(),
            SessionStatus::LoggedOut(LogoutReason::RefreshFailed)
        );
    }

    #[tokio::test]
    async fn test_anonymous_request_without_refresh_token_goes_to_login() {
        let mut server = Server::new_async().await;
        let clubs = server
            .mock("GET", CLUBS_PATH)
            .match_header("authorization", Matcher::Missing)
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .expect(0)
            .create_async()
            .await;

        let (client, store) = client_with(&server, None, None);
        let err = client
            .get::<Vec<crate::models::Club>>("/clubs")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::SessionExpired(_)));
        assert!(store.is_empty());
        assert_eq!(
            client.session().status(),
            SessionStatus::LoggedOut(LogoutReason::RefreshFailed)
        );
        clubs.assert_async().await;
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_unauthorized_requests_share_one_refresh() {
        const REQUESTS: usize = 5;

        let mut server = Server::new_async().await;
        server
            .mock("GET", CLUBS_PATH)
            .match_header("authorization", "Bearer A1")
            .with_status(401)
            .expect_at_least(1)
            .create_async()
            .await;
        let refresh = refresh_mock(&mut server, "R1", "A2", "R2").await;
        let fresh = server
            .mock("GET", CLUBS_PATH)
            .match_header("authorization", "Bearer A2")
            .with_status(200)
            .with_body(clubs_body())
            .expect(REQUESTS)
            .create_async()
            .await;

        let (client, _) = client_with(&server, Some("A1"), Some("R1"));
        let results = futures::future::join_all(
            (0..REQUESTS).map(|_| client.get::<Vec<crate::models::Club>>("/clubs")),
        )
        .await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(client.session().access_token().as_deref(), Some("A2"));
        refresh.assert_async().await;
        fresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_business_errors_are_surfaced_verbatim() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/subscriptions")
            .with_status(422)
            .with_body(
                json!({"success": false, "error": {"code": "UNPROCESSABLE_ENTITY", "message": "group is full"}})
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .expect(0)
            .create_async()
            .await;

        let (client, _) = client_with(&server, Some("A1"), Some("R1"));
        let err = client
            .post::<serde_json::Value, _>("/subscriptions", &json!({"student_id": "s1"}))
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "group is full");
        assert!(matches!(err, ApiError::Rejected { status: 422, .. }));
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_requests_without_refresh_fail_on_first_unauthorized() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/auth/login")
            .with_status(401)
            .with_body(
                json!({"success": false, "error": {"code": "UNAUTHORIZED", "message": "invalid email or password"}})
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .expect(0)
            .create_async()
            .await;

        let (client, store) = client_with(&server, Some("A1"), Some("R1"));
        let err = client
            .post_with::<serde_json::Value, _>(
                "/auth/login",
                &json!({"email": "a@b.c", "password": "x"}),
                RequestOptions::without_refresh(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "invalid email or password");
        assert!(!store.is_empty());
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/v1/groups/g1")
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let (client, _) = client_with(&server, Some("A1"), Some("R1"));
        client.delete("/groups/g1").await.expect("delete");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_public_requests_carry_no_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/public/club/c1/groups")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(json!({"success": true, "data": []}).to_string())
            .expect(1)
            .create_async()
            .await;

        let (client, _) = client_with(&server, Some("A1"), Some("R1"));
        let groups: Vec<crate::models::PublicGroupInfo> = client
            .get_public("/club/c1/groups", RequestOptions::default())
            .await
            .expect("groups");
        assert!(groups.is_empty());
        mock.assert_async().await;
    }

    #[test]
    fn test_pending_request_retries_at_most_once() {
        let first = PendingRequest::new(Method::GET, "/clubs", None, RequestOptions::default());
        assert_eq!(first.attempt(), Attempt::First);

        let retry = first.into_retry().expect("first attempt may retry");
        assert_eq!(retry.attempt(), Attempt::Retry);
        assert!(retry.into_retry().is_none());

        let login = PendingRequest::new(
            Method::POST,
            "/auth/login",
            None,
            RequestOptions::without_refresh(),
        );
        assert!(login.into_retry().is_none());
    }

    #[test]
    fn test_request_options_query_opt() {
        let options = RequestOptions::new()
            .query("page", 2)
            .query_opt("status", None::<&str>)
            .query_opt("q", Some("ana"));
        assert_eq!(
            options.query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("q".to_string(), "ana".to_string())
            ]
        );
    }
}
