//! The uniform response envelope used by every backend endpoint.

use serde::{Deserialize, Serialize};

use super::ApiError;

/// `{ success, data, error?, meta? }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Pagination info attached to paged list responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub total_pages: u32,
}

/// A page of results together with its pagination info.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: Meta,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.meta.page < self.meta.total_pages
    }
}

impl ErrorBody {
    /// Extract the error object from a raw failure body, if it is an envelope.
    pub(crate) fn from_response_body(body: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct Failure {
            error: Option<ErrorBody>,
        }

        serde_json::from_str::<Failure>(body).ok().and_then(|f| f.error)
    }
}

impl<T> Envelope<T> {
    /// Turn the envelope into its payload, treating `success: false` as an error.
    pub fn into_data(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(self.failure());
        }
        self.data
            .ok_or_else(|| ApiError::InvalidResponse("response envelope has no data".to_string()))
    }

    /// Error for a `success: false` envelope that arrived with a 2xx status.
    pub(crate) fn failure(&self) -> ApiError {
        match &self.error {
            Some(err) => ApiError::Rejected {
                status: 200,
                code: err.code.clone(),
                message: err.message.clone(),
            },
            None => ApiError::InvalidResponse("request was not successful".to_string()),
        }
    }
}

impl<T: Default> Envelope<T> {
    /// Like `into_data`, but a successful response without data yields the
    /// default (the backend omits empty lists).
    pub fn into_data_or_default(self) -> Result<T, ApiError> {
        if !self.success {
            return Err(self.failure());
        }
        Ok(self.data.unwrap_or_default())
    }
}

impl<T> Envelope<Vec<T>> {
    pub fn into_page(self) -> Result<Page<T>, ApiError> {
        let meta = self.meta.unwrap_or_default();
        let items = self.into_data_or_default()?;
        Ok(Page { items, meta })
    }
}
