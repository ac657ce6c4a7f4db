//! Response envelope and pagination.
//!
//! Every endpoint answers with the same JSON shape:
//!
//! ```json
//! {"status": "success", "message": "Products retrieved", "data": [...],
//!  "pagination": {"current_page": 1, "per_page": 15, "total": 42, "last_page": 3}}
//! ```
//!
//! `pagination` only appears on paginated lists. Errors use the same envelope
//! with `"status": "error"` and `"data": null`.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_RANGE},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::config::FilterConfig;
use crate::models::FilterRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    pub message: String,
    #[serialize_always]
    pub data: Option<T>,
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            data: Some(data),
            pagination: None,
        }
    }

    pub fn paginated(message: impl Into<String>, data: T, pagination: Pagination) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            data: Some(data),
            pagination: Some(pagination),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            data: None,
            pagination: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
}

impl Pagination {
    /// `last_page` is at least 1, also for an empty result.
    #[must_use]
    pub fn new(current_page: u64, per_page: u64, total: u64) -> Self {
        let per_page = per_page.max(1);
        Self {
            current_page,
            per_page,
            total,
            last_page: total.div_ceil(per_page).max(1),
        }
    }

    /// `Content-Range: <resource> <first>-<last>/<total>` for clients that
    /// read pagination from headers.
    #[must_use]
    pub fn content_range_headers(&self, resource_name: &str) -> HeaderMap {
        let first = self.current_page.saturating_sub(1).saturating_mul(self.per_page);
        let last = first
            .saturating_add(self.per_page)
            .min(self.total)
            .saturating_sub(1)
            .max(first);
        let name = sanitize_resource_name(resource_name);

        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!("{name} {first}-{last}/{}", self.total)) {
            headers.insert(CONTENT_RANGE, value);
        }
        headers
    }
}

/// Strip characters that cannot appear in a header value.
fn sanitize_resource_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

/// Page and page size of a request, clamped to the configured bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    /// Page defaults to 1, size to `config.default_per_page`; size is clamped
    /// to `1..=config.max_per_page`.
    #[must_use]
    pub fn from_request(request: &FilterRequest, config: &FilterConfig) -> Self {
        let max = config.max_per_page.max(1);
        Self {
            page: request.page.unwrap_or(1).max(1),
            per_page: request
                .per_page
                .unwrap_or(config.default_per_page)
                .clamp(1, max),
        }
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.per_page
    }

    #[must_use]
    pub fn pagination(&self, total: u64) -> Pagination {
        Pagination::new(self.page, self.per_page, total)
    }
}
