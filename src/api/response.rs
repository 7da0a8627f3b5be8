//! Uniform `{success, message?, ...payload}` envelope.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(flatten)]
    data: Map<String, Value>,
}

impl ApiResponse {
    pub fn ok() -> Self { Self { success: true, message: None, data: Map::new() } }
    pub fn message(message: impl Into<String>) -> Self { Self { message: Some(message.into()), ..Self::ok() } }
    pub fn failure(message: impl Into<String>) -> Self { Self { success: false, message: Some(message.into()), data: Map::new() } }

    /// Adds a payload field next to `success`.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| {
            tracing::error!(error = %e, field = key, "Failed to serialize response field");
            Value::Null
        });
        self.data.insert(key.to_string(), value);
        self
    }

    /// Adds every field of a serialized struct next to `success`.
    pub fn with_fields(mut self, fields: impl Serialize) -> Self {
        match serde_json::to_value(fields) {
            Ok(Value::Object(map)) => self.data.extend(map),
            Ok(other) => tracing::error!(value = %other, "Response fields are not an object"),
            Err(e) => tracing::error!(error = %e, "Failed to serialize response fields"),
        }
        self
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response { Json(self).into_response() }
}
