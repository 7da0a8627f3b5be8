//! Payment provider seam.
//!
//! Orders talk to the provider through `PaymentGateway`; the Stripe REST
//! client is the production implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::value_objects::{OrderId, UserId};
use crate::error::ServiceError;

pub mod stripe;

pub use stripe::{StripeGateway, WebhookError, WebhookEvent};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Online payments are not configured")]
    NotConfigured,
    #[error("Provider rejected request: {0}")]
    Provider(String),
    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<PaymentError> for ServiceError {
    fn from(e: PaymentError) -> Self { ServiceError::UpstreamFailure(e.to_string()) }
}

/// One checkout line, priced in minor units including tax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<CheckoutLine>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Correlation metadata attached to a checkout session. Values are raw
/// strings as stored by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentMetadata {
    pub order_id: Option<String>,
    pub user_id: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, PaymentError>;

    /// Metadata of the checkout session that produced `payment_intent_id`.
    async fn session_metadata(&self, payment_intent_id: &str) -> Result<Option<PaymentMetadata>, PaymentError>;
}

/// Used when no provider key is configured; COD keeps working.
pub struct DisabledGateway;

#[async_trait]
impl PaymentGateway for DisabledGateway {
    async fn create_checkout_session(&self, _request: CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        Err(PaymentError::NotConfigured)
    }

    async fn session_metadata(&self, _payment_intent_id: &str) -> Result<Option<PaymentMetadata>, PaymentError> {
        Err(PaymentError::NotConfigured)
    }
}
