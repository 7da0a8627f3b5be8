//! Stripe via the REST API (no SDK dependency).

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use super::{CheckoutRequest, CheckoutSession, PaymentError, PaymentGateway, PaymentMetadata};

const API_BASE: &str = "https://api.stripe.com";

pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    currency: String,
    api_base: String,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>, currency: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), secret_key: secret_key.into(), currency: currency.into(), api_base: API_BASE.to_string() }
    }

    /// Form fields for a one-off payment session. Correlation metadata is set
    /// on both the session and its payment intent.
    fn checkout_form(&self, request: &CheckoutRequest) -> Vec<(String, String)> {
        let order_id = request.order_id.to_string();
        let user_id = request.user_id.to_string();
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            ("metadata[orderId]".to_string(), order_id.clone()),
            ("metadata[userId]".to_string(), user_id.clone()),
            ("payment_intent_data[metadata][orderId]".to_string(), order_id),
            ("payment_intent_data[metadata][userId]".to_string(), user_id),
        ];
        for (i, line) in request.lines.iter().enumerate() {
            let key = |field: &str| format!("line_items[{i}]{field}");
            form.push((key("[price_data][currency]"), self.currency.clone()));
            form.push((key("[price_data][product_data][name]"), line.name.clone()));
            form.push((key("[price_data][unit_amount]"), line.unit_amount.to_string()));
            form.push((key("[quantity]"), line.quantity.to_string()));
        }
        form
    }
}

fn provider_error(resp: &serde_json::Value) -> PaymentError {
    let message = resp["error"]["message"].as_str().unwrap_or("unexpected response");
    PaymentError::Provider(message.to_string())
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        let resp: serde_json::Value = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&self.checkout_form(&request))
            .send()
            .await?
            .json()
            .await?;

        match (resp["id"].as_str(), resp["url"].as_str()) {
            (Some(id), Some(url)) => {
                tracing::info!(order_id = %request.order_id, session_id = id, "Checkout session created");
                Ok(CheckoutSession { id: id.to_string(), url: url.to_string() })
            }
            _ => Err(provider_error(&resp)),
        }
    }

    async fn session_metadata(&self, payment_intent_id: &str) -> Result<Option<PaymentMetadata>, PaymentError> {
        let resp: serde_json::Value = self
            .client
            .get(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&[("payment_intent", payment_intent_id)])
            .send()
            .await?
            .json()
            .await?;

        let Some(sessions) = resp["data"].as_array() else {
            return Err(provider_error(&resp));
        };
        Ok(sessions.first().map(|s| PaymentMetadata {
            order_id: s["metadata"]["orderId"].as_str().map(String::from),
            user_id: s["metadata"]["userId"].as_str().map(String::from),
        }))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Missing Stripe-Signature header")]
    MissingSignature,
    #[error("Invalid Stripe-Signature header")]
    MalformedHeader,
    #[error("Webhook signature mismatch")]
    SignatureMismatch,
    #[error("Webhook timestamp outside tolerance")]
    StaleTimestamp,
    #[error("Webhook secret not configured")]
    NotConfigured,
    #[error("Invalid webhook payload")]
    InvalidPayload,
}

/// Verifies a `Stripe-Signature` header (`t=...,v1=...`) against the raw body.
///
/// Any `v1` entry may match; comparison is constant time. Timestamps further
/// than `tolerance_secs` from `now` are rejected.
pub fn verify_webhook_signature(payload: &[u8], header: &str, secret: &str, tolerance_secs: i64, now: i64) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }
    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    let ts: i64 = timestamp.parse().map_err(|_| WebhookError::MalformedHeader)?;

    let mac = {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::NotConfigured)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac
    };
    let matched = signatures
        .iter()
        .filter_map(|s| hex::decode(s).ok())
        .any(|sig| mac.clone().verify_slice(&sig).is_ok());
    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    if (now - ts).abs() > tolerance_secs {
        return Err(WebhookError::StaleTimestamp);
    }
    Ok(())
}

/// The subset of a Stripe event envelope this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: EventObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventObject {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(payload).map_err(|_| WebhookError::InvalidPayload)
    }

    /// Correlation metadata carried on the event object itself, if any.
    pub fn metadata(&self) -> Option<PaymentMetadata> {
        let m = &self.data.object.metadata;
        let order_id = m.get("orderId").cloned();
        let user_id = m.get("userId").cloned();
        (order_id.is_some() || user_id.is_some()).then_some(PaymentMetadata { order_id, user_id })
    }
}

#[cfg(test)]
pub(crate) fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{OrderId, UserId};
    use crate::payments::CheckoutLine;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_1","metadata":{"orderId":"o","userId":"u"}}}}"#;

    #[test]
    fn test_valid_signature() {
        let header = sign_payload(BODY, SECRET, 1_700_000_000);
        assert_eq!(verify_webhook_signature(BODY, &header, SECRET, 300, 1_700_000_100), Ok(()));
    }

    #[test]
    fn test_any_v1_may_match() {
        let signed = sign_payload(BODY, SECRET, 1_700_000_000);
        let v1 = signed.split(",v1=").nth(1).unwrap();
        let header = format!("t=1700000000,v1={},v1={v1}", "00".repeat(32));
        assert!(verify_webhook_signature(BODY, &header, SECRET, 300, 1_700_000_000).is_ok());
    }

    #[test]
    fn test_rejections() {
        let header = sign_payload(BODY, SECRET, 1_700_000_000);
        assert_eq!(verify_webhook_signature(b"{}", &header, SECRET, 300, 1_700_000_000), Err(WebhookError::SignatureMismatch));
        assert_eq!(verify_webhook_signature(BODY, &header, "whsec_other", 300, 1_700_000_000), Err(WebhookError::SignatureMismatch));
        assert_eq!(verify_webhook_signature(BODY, &header, SECRET, 300, 1_700_000_301), Err(WebhookError::StaleTimestamp));
        assert_eq!(verify_webhook_signature(BODY, "v1=abcd", SECRET, 300, 0), Err(WebhookError::MalformedHeader));
        assert_eq!(verify_webhook_signature(BODY, "t=1700000000", SECRET, 300, 0), Err(WebhookError::MalformedHeader));
    }

    #[test]
    fn test_event_metadata() {
        let event = WebhookEvent::parse(BODY).unwrap();
        assert_eq!(event.kind, "payment_intent.succeeded");
        assert_eq!(event.data.object.id, "pi_1");
        assert_eq!(event.metadata().unwrap().order_id.as_deref(), Some("o"));

        let bare = WebhookEvent::parse(br#"{"id":"evt_2","type":"charge.refunded","data":{"object":{"id":"ch_1"}}}"#).unwrap();
        assert!(bare.metadata().is_none());
        assert_eq!(WebhookEvent::parse(b"not json").unwrap_err(), WebhookError::InvalidPayload);
    }

    #[test]
    fn test_checkout_form_fields() {
        let gateway = StripeGateway::new("sk_test", "usd");
        let order_id = OrderId::new();
        let request = CheckoutRequest {
            order_id,
            user_id: UserId::new(),
            lines: vec![CheckoutLine { name: "Apples".into(), unit_amount: 2000, quantity: 2 }],
            success_url: "https://shop.test/loader?next=my-orders".into(),
            cancel_url: "https://shop.test/cart".into(),
        };
        let form: HashMap<String, String> = gateway.checkout_form(&request).into_iter().collect();
        assert_eq!(form["mode"], "payment");
        assert_eq!(form["metadata[orderId]"], order_id.to_string());
        assert_eq!(form["payment_intent_data[metadata][orderId]"], order_id.to_string());
        assert_eq!(form["line_items[0][price_data][unit_amount]"], "2000");
        assert_eq!(form["line_items[0][price_data][currency]"], "usd");
        assert_eq!(form["line_items[0][quantity]"], "2");
    }
}
