use thiserror::Error;

use super::envelope::ErrorBody;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The session could not be renewed and has been cleared.
    /// Callers should send the user back to the login entry point.
    #[error("Session expired - please log in again")]
    SessionExpired(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// A 4xx the backend explained, or `success: false` on a 2xx.
    #[error("{message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(err)
        }
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Build an error from a non-success status and its raw body.
    ///
    /// The backend wraps failures as `{ success: false, error: { code, message } }`;
    /// when that envelope is present its message is surfaced verbatim, otherwise
    /// the (truncated) raw body is used.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed = ErrorBody::from_response_body(body);
        let message = parsed
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| Self::truncate_body(body));

        match status.as_u16() {
            401 => ApiError::Unauthorized(message),
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited(message),
            400..=499 => ApiError::Rejected {
                status: status.as_u16(),
                code: parsed
                    .map(|e| e.code)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("ERROR").to_string()),
                message,
            },
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, message)),
        }
    }

    /// True when the caller must treat the user as logged out.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::SessionExpired(_))
    }

    /// The message to show inline to a user.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized(m)
            | ApiError::AccessDenied(m)
            | ApiError::NotFound(m)
            | ApiError::RateLimited(m)
            | ApiError::ServerError(m) => m.clone(),
            ApiError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_uses_envelope_message() {
        let body = r#"{"success":false,"error":{"code":"CONFLICT","message":"email already registered"}}"#;
        match ApiError::from_status(StatusCode::CONFLICT, body) {
            ApiError::Rejected { status, code, message } => {
                assert_eq!(status, 409);
                assert_eq!(code, "CONFLICT");
                assert_eq!(message, "email already registered");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_status_maps_common_codes() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, "nope"),
            ApiError::AccessDenied(m) if m == "nope"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            ApiError::RateLimited(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream"),
            ApiError::ServerError(_)
        ));
    }

    #[test]
    fn test_rate_limit_keeps_backend_message() {
        let body = r#"{"success":false,"error":{"code":"RATE_LIMITED","message":"too many login attempts"}}"#;
        let err = ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(err.user_message(), "too many login attempts");
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(MAX_ERROR_BODY_LENGTH);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated"));
        assert!(truncated.contains(&format!("{} total bytes", body.len())));
    }

    #[test]
    fn test_user_message_is_verbatim_for_rejections() {
        let err = ApiError::Rejected {
            status: 422,
            code: "UNPROCESSABLE_ENTITY".to_string(),
            message: "group is full".to_string(),
        };
        assert_eq!(err.user_message(), "group is full");
        assert!(!err.requires_login());
        assert!(ApiError::SessionExpired("x".into()).requires_login());
    }
}
