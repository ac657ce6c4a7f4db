//! # Error Handling
//!
//! Two layers:
//!
//! - [`FilterError`]: what the filter compiler rejects. Every variant names the
//!   offending key so a client can fix its request.
//! - [`ApiError`]: what a handler returns. It maps to an HTTP status, renders
//!   the standard response envelope, and logs internal details through
//!   `tracing` without sending them to the client.
//!
//! ```rust,ignore
//! async fn list(
//!     State(db): State<DatabaseConnection>,
//!     Query(query): Query<FilterQuery>,
//! ) -> Result<ApiResponse<Vec<product::Model>>, ApiError> {
//!     let request = FilterRequest::try_from(query)?;
//!     let (rows, pagination) = Product::paginate_filtered(&db, &request, &FilterConfig::default()).await?;
//!     Ok(ApiResponse::paginated("Products retrieved", rows, pagination))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use std::fmt;
use thiserror::Error;

use crate::response::ApiResponse;

/// Rejections raised while compiling a filter request.
///
/// Under [`FilterPolicy::Silent`](crate::FilterPolicy::Silent) these are logged
/// and dropped instead of returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("filtering on '{field}' is not allowed")]
    DisallowedField { field: String },

    #[error("filtering on relation '{relation}' is not allowed")]
    DisallowedRelation { relation: String },

    #[error("filtering on '{relation}.{field}' is not allowed")]
    DisallowedRelationField { relation: String, field: String },

    #[error("ordering by '{field}' is not allowed")]
    DisallowedOrderField { field: String },

    #[error("custom filter '{method}' is not defined on {handler}")]
    UnknownCustomFilter { method: String, handler: String },

    #[error("invalid value for '{key}': {reason}")]
    MalformedValue { key: String, reason: String },
}

impl FilterError {
    /// The request key this error is about.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::DisallowedField { field } | Self::DisallowedOrderField { field } => field.clone(),
            Self::DisallowedRelation { relation } => relation.clone(),
            Self::DisallowedRelationField { relation, field } => format!("{relation}.{field}"),
            Self::UnknownCustomFilter { method, .. } => method.clone(),
            Self::MalformedValue { key, .. } => key.clone(),
        }
    }
}

/// API error type with automatic logging and sanitized responses.
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found
    NotFound {
        resource: String,
        id: Option<String>,
    },

    /// 400 Bad Request - invalid input from the client
    BadRequest { message: String },

    /// 400 Bad Request - the filter compiler rejected the request
    Filter(FilterError),

    /// 500 - database error (details logged, not exposed)
    Database { message: String, internal: DbErr },

    /// 500 - anything else internal
    Internal {
        message: String,
        internal: Option<String>,
    },
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Wrap a database error. The details are logged but never sent to the client.
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } | Self::Filter(_) => StatusCode::BAD_REQUEST,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The sanitized message sent to the client.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::BadRequest { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
            Self::Filter(err) => err.to_string(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            Self::Filter(err) => {
                tracing::warn!(key = %err.key(), error = %err, "Filter rejected");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();
        let body: ApiResponse<()> = ApiResponse::error(self.user_message());
        (self.status_code(), Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// `DbErr::RecordNotFound` becomes 404, everything else a sanitized 500.
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::database(err),
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        Self::Filter(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_error_messages_name_the_key() {
        let err = FilterError::DisallowedField {
            field: "password".into(),
        };
        assert_eq!(err.to_string(), "filtering on 'password' is not allowed");
        assert_eq!(err.key(), "password");

        let err = FilterError::DisallowedRelationField {
            relation: "provider".into(),
            field: "secret".into(),
        };
        assert_eq!(err.key(), "provider.secret");

        let err = FilterError::UnknownCustomFilter {
            method: "stock".into(),
            handler: "ProductFilters".into(),
        };
        assert_eq!(
            err.to_string(),
            "custom filter 'stock' is not defined on ProductFilters"
        );
    }

    #[test]
    fn test_filter_error_is_bad_request() {
        let err: ApiError = FilterError::DisallowedOrderField {
            field: "secret".into(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "ordering by 'secret' is not allowed");
    }

    #[test]
    fn test_not_found_with_and_without_id() {
        let err = ApiError::not_found("Product", Some("7".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "Product with ID '7' not found");
        assert_eq!(ApiError::not_found("Product", None).user_message(), "Product not found");
    }

    #[test]
    fn test_database_error_is_sanitized() {
        let err = ApiError::database(DbErr::Custom("secret connection string".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "A database error occurred");
    }

    #[test]
    fn test_dberr_conversion() {
        let err: ApiError = DbErr::RecordNotFound("Product not found".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: ApiError = DbErr::Type("Type error".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_into_response_uses_envelope() {
        let response = ApiError::bad_request("bad page").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "bad page");
        assert!(json["data"].is_null());
        assert!(json.get("pagination").is_none());
    }
}
