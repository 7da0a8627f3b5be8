//! Payment provider webhook.
//!
//! Needs the raw body for signature verification. Answers 400 to anything it
//! cannot authenticate or parse, and 500 when reconciliation hits a storage or
//! provider failure so the provider redelivers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::payments::stripe::verify_webhook_signature;
use crate::payments::{WebhookError, WebhookEvent};
use crate::state::AppState;

fn authenticate(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<WebhookEvent, WebhookError> {
    let payments = &state.config().payments;
    let secret = payments.webhook_secret.as_deref().ok_or(WebhookError::NotConfigured)?;
    let header = headers.get("stripe-signature").and_then(|v| v.to_str().ok()).ok_or(WebhookError::MissingSignature)?;
    verify_webhook_signature(body, header, secret, payments.webhook_tolerance_secs, chrono::Utc::now().timestamp())?;
    WebhookEvent::parse(body)
}

pub async fn stripe_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let event = match authenticate(&state, &headers, &body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected webhook");
            return (StatusCode::BAD_REQUEST, format!("Webhook Error: {e}")).into_response();
        }
    };
    tracing::info!(event_id = %event.id, event_type = %event.kind, "Received payment webhook");

    match state.reconciler().handle(&event).await {
        Ok(outcome) => {
            tracing::debug!(event_id = %event.id, outcome = ?outcome, "Webhook processed");
            Json(serde_json::json!({ "received": true })).into_response()
        }
        Err(e) => {
            tracing::error!(event_id = %event.id, error = %e, "Webhook reconciliation failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
