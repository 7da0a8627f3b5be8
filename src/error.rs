//! Service error taxonomy.
//!
//! Every handler returns `Result<ApiResponse, ServiceError>`. Failures are
//! rendered as HTTP 200 with `{success: false, message}`; storage and provider
//! details are logged here and replaced by a fixed message.

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::response::ApiResponse;
use crate::domain::aggregates::{OrderError, ProductError, RatingError};
use crate::domain::value_objects::IdError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Payment provider error: {0}")]
    UpstreamFailure(String),
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidRequest(msg.into()) }
    pub fn unauthorized(msg: impl Into<String>) -> Self { Self::Unauthorized(msg.into()) }
    pub fn not_found(what: &str) -> Self { Self::NotFound(format!("{what} not found")) }

    /// Message safe to show to the caller.
    pub fn client_message(&self) -> String {
        match self {
            Self::Storage(_) => "Something went wrong, please try again".to_string(),
            Self::UpstreamFailure(_) => "Payment provider unavailable, please try again".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { collection, .. } => Self::Conflict(format!("Duplicate entry in {collection}")),
            other => Self::Storage(other),
        }
    }
}

impl From<OrderError> for ServiceError {
    fn from(e: OrderError) -> Self { Self::InvalidRequest(e.to_string()) }
}

impl From<ProductError> for ServiceError {
    fn from(e: ProductError) -> Self { Self::InvalidRequest(e.to_string()) }
}

impl From<RatingError> for ServiceError {
    fn from(e: RatingError) -> Self { Self::InvalidRequest(e.to_string()) }
}

impl From<IdError> for ServiceError {
    fn from(e: IdError) -> Self { Self::InvalidRequest(e.to_string()) }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(e: validator::ValidationErrors) -> Self {
        let mut fields: Vec<&str> = e.field_errors().keys().copied().collect();
        fields.sort_unstable();
        Self::InvalidRequest(format!("Invalid or missing fields: {}", fields.join(", ")))
    }
}

impl From<axum::extract::rejection::JsonRejection> for ServiceError {
    fn from(e: axum::extract::rejection::JsonRejection) -> Self { Self::InvalidRequest(e.body_text()) }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match &self {
            Self::Storage(e) => tracing::error!(error = %e, "Storage failure"),
            Self::UpstreamFailure(e) => tracing::error!(error = %e, "Payment provider failure"),
            other => tracing::debug!(error = %other, "Request rejected"),
        }
        ApiResponse::failure(self.client_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = ServiceError::from(StoreError::Backend("connection refused to 10.0.0.3".into()));
        assert!(!err.client_message().contains("10.0.0.3"));
        let err = ServiceError::UpstreamFailure("stripe: 500".into());
        assert!(!err.client_message().contains("stripe"));
    }

    #[test]
    fn test_conflict_mapping() {
        let err = ServiceError::from(StoreError::Conflict { collection: "ratings", id: "x".into() });
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_failures_use_envelope_with_200() {
        let response = ServiceError::not_found("Order").into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "message": "Order not found" }));
    }
}
