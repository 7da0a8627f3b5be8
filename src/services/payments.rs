//! Payment reconciliation from provider webhook events.
//!
//! Events arrive at least once and possibly out of order, so every effect is
//! idempotent: paying a paid order changes nothing and deleting a missing
//! order is a no-op. A failure event never removes a paid order. Signature
//! verification happens before this layer.

use std::sync::Arc;

use crate::domain::aggregates::{Order, User};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{OrderId, UserId};
use crate::error::Result;
use crate::payments::{PaymentGateway, PaymentMetadata, WebhookEvent};
use crate::publisher::EventPublisher;
use crate::services::cart::CartSync;
use crate::services::saga::{PendingStep, SagaLog};
use crate::store::Repository;

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Paid,
    Removed,
    /// Valid event that referenced nothing this service can act on.
    Unmatched,
    Ignored,
}

#[derive(Clone)]
pub struct PaymentReconciler {
    repo: Repository,
    gateway: Arc<dyn PaymentGateway>,
    carts: CartSync,
    events: EventPublisher,
    saga: SagaLog,
}

impl PaymentReconciler {
    pub fn new(repo: Repository, gateway: Arc<dyn PaymentGateway>, carts: CartSync, events: EventPublisher, saga: SagaLog) -> Self {
        Self { repo, gateway, carts, events, saga }
    }

    pub async fn handle(&self, event: &WebhookEvent) -> Result<Reconciled> {
        let succeeded = match event.kind.as_str() {
            PAYMENT_SUCCEEDED => true,
            PAYMENT_FAILED => false,
            other => {
                tracing::debug!(event_type = other, event_id = %event.id, "Unhandled webhook event type");
                return Ok(Reconciled::Ignored);
            }
        };

        let metadata = self.correlate(event).await?;
        let Some(order_id) = metadata.order_id.as_deref().and_then(|id| id.parse::<OrderId>().ok()) else {
            tracing::warn!(event_id = %event.id, payment_intent = %event.data.object.id, "Payment event without a usable order id");
            return Ok(Reconciled::Unmatched);
        };
        let user_id = metadata.user_id.as_deref().and_then(|id| id.parse::<UserId>().ok());

        if succeeded {
            self.payment_succeeded(order_id, user_id).await
        } else {
            self.payment_failed(order_id).await
        }
    }

    /// Metadata from the event object, else from the session that created the intent.
    async fn correlate(&self, event: &WebhookEvent) -> Result<PaymentMetadata> {
        if let Some(metadata) = event.metadata() {
            return Ok(metadata);
        }
        Ok(self.gateway.session_metadata(&event.data.object.id).await?.unwrap_or_default())
    }

    /// Marks the order paid, then clears the shopper's cart. The cart clear is
    /// a second write; its failure leaves a reconciliation task. A redelivered
    /// event for an order already paid changes nothing.
    async fn payment_succeeded(&self, order_id: OrderId, user_id: Option<UserId>) -> Result<Reconciled> {
        let paid = self
            .repo
            .update::<Order, _, _>(&order_id, |order| {
                let changed = order.mark_paid();
                (changed, order.take_events())
            })
            .await?;

        let owner = match paid {
            Some((order, (true, events))) => {
                tracing::info!(order_id = %order_id, "Order marked paid");
                self.events.publish(events).await;
                Some(order.user_id())
            }
            Some((_, (false, _))) => {
                tracing::debug!(order_id = %order_id, "Duplicate payment event, order already paid");
                return Ok(Reconciled::Paid);
            }
            None => {
                tracing::warn!(order_id = %order_id, "Payment succeeded for an order that no longer exists");
                None
            }
        };

        let Some(user_id) = user_id.or(owner) else {
            return Ok(Reconciled::Paid);
        };
        self.carts.discard(&user_id).await;
        match self.repo.update::<User, _, _>(&user_id, User::clear_cart).await {
            Ok(Some(_)) => tracing::debug!(user_id = %user_id, "Cart cleared after payment"),
            Ok(None) => tracing::warn!(user_id = %user_id, "Paying user no longer exists"),
            Err(e) => self.saga.record(PendingStep::ClearCart { user_id }, &e).await,
        }
        Ok(Reconciled::Paid)
    }

    /// Removes the pending order. A paid order is kept: the failure belongs to
    /// an earlier attempt that a later one superseded.
    async fn payment_failed(&self, order_id: OrderId) -> Result<Reconciled> {
        match self.repo.delete_if::<Order, _>(&order_id, |order| !order.is_paid()).await? {
            Some(true) => {
                tracing::info!(order_id = %order_id, "Unpaid order removed after failed payment");
                self.events.publish(vec![DomainEvent::Order(OrderEvent::Deleted { order_id })]).await;
                Ok(Reconciled::Removed)
            }
            Some(false) => {
                tracing::warn!(order_id = %order_id, "Failed payment event for an order already paid, keeping it");
                Ok(Reconciled::Ignored)
            }
            None => {
                tracing::debug!(order_id = %order_id, "Failed payment for an order already removed");
                Ok(Reconciled::Removed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{address::sample_postal, Address, Cart, PaymentType, PricedLine};
    use crate::domain::value_objects::{Money, ProductId, Quantity};
    use crate::payments::fake::FakeGateway;
    use crate::store::FlakyStore;

    struct Fixture {
        repo: Repository,
        reconciler: PaymentReconciler,
        gateway: Arc<FakeGateway>,
        saga: SagaLog,
        user: User,
        order: Order,
    }

    async fn fixture() -> Fixture { fixture_on(Repository::in_memory()).await }

    async fn fixture_on(repo: Repository) -> Fixture {
        let mut user = User::register("Asha", "asha@example.com", "hash");
        user.replace_cart(Cart::from_snapshot([(ProductId::new(), 2)]));
        repo.insert(&user).await.unwrap();
        let address = Address::new(user.id(), sample_postal());
        let line = PricedLine { product_id: ProductId::new(), quantity: Quantity::ONE, unit_price: Money::from_major(50) };
        let order = Order::place(user.id(), address.id(), PaymentType::Online, vec![line]).unwrap();
        repo.insert(&order).await.unwrap();

        let gateway = Arc::new(FakeGateway::default());
        let carts = CartSync::spawn(repo.clone());
        let saga = SagaLog::new(repo.clone(), carts.clone());
        let reconciler = PaymentReconciler::new(repo.clone(), gateway.clone(), carts, EventPublisher::disabled(), saga.clone());
        Fixture { repo, reconciler, gateway, saga, user, order }
    }

    fn event(kind: &str, metadata: serde_json::Value) -> WebhookEvent {
        serde_json::from_value(serde_json::json!({
            "id": "evt_1",
            "type": kind,
            "data": { "object": { "id": "pi_1", "metadata": metadata } }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_success_marks_paid_and_clears_cart() {
        let f = fixture().await;
        let meta = serde_json::json!({ "orderId": f.order.id().to_string(), "userId": f.user.id().to_string() });
        for _ in 0..2 {
            let outcome = f.reconciler.handle(&event(PAYMENT_SUCCEEDED, meta.clone())).await.unwrap();
            assert_eq!(outcome, Reconciled::Paid);
        }
        let order: Order = f.repo.find(&f.order.id()).await.unwrap().unwrap();
        assert!(order.is_paid());
        let user: User = f.repo.find(&f.user.id()).await.unwrap().unwrap();
        assert!(user.cart().is_empty());
    }

    #[tokio::test]
    async fn test_failure_deletes_order_once() {
        let f = fixture().await;
        let meta = serde_json::json!({ "orderId": f.order.id().to_string() });
        assert_eq!(f.reconciler.handle(&event(PAYMENT_FAILED, meta.clone())).await.unwrap(), Reconciled::Removed);
        assert!(f.repo.find::<Order>(&f.order.id()).await.unwrap().is_none());
        assert_eq!(f.reconciler.handle(&event(PAYMENT_FAILED, meta)).await.unwrap(), Reconciled::Removed);
    }

    #[tokio::test]
    async fn test_falls_back_to_session_lookup() {
        let f = fixture().await;
        f.gateway.sessions.lock().unwrap().push((
            "pi_1".to_string(),
            PaymentMetadata { order_id: Some(f.order.id().to_string()), user_id: Some(f.user.id().to_string()) },
        ));
        let outcome = f.reconciler.handle(&event(PAYMENT_SUCCEEDED, serde_json::json!({}))).await.unwrap();
        assert_eq!(outcome, Reconciled::Paid);
        let order: Order = f.repo.find(&f.order.id()).await.unwrap().unwrap();
        assert!(order.is_paid());
    }

    #[tokio::test]
    async fn test_unrelated_and_uncorrelated_events() {
        let f = fixture().await;
        let outcome = f.reconciler.handle(&event("charge.refunded", serde_json::json!({}))).await.unwrap();
        assert_eq!(outcome, Reconciled::Ignored);
        let outcome = f.reconciler.handle(&event(PAYMENT_FAILED, serde_json::json!({}))).await.unwrap();
        assert_eq!(outcome, Reconciled::Unmatched);
        assert!(f.repo.find::<Order>(&f.order.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_late_failure_keeps_paid_order() {
        let f = fixture().await;
        let meta = serde_json::json!({ "orderId": f.order.id().to_string(), "userId": f.user.id().to_string() });
        assert_eq!(f.reconciler.handle(&event(PAYMENT_SUCCEEDED, meta.clone())).await.unwrap(), Reconciled::Paid);
        assert_eq!(f.reconciler.handle(&event(PAYMENT_FAILED, meta)).await.unwrap(), Reconciled::Ignored);
        let order: Order = f.repo.find(&f.order.id()).await.unwrap().unwrap();
        assert!(order.is_paid());
    }

    #[tokio::test]
    async fn test_redelivered_success_keeps_new_cart() {
        let f = fixture().await;
        let meta = serde_json::json!({ "orderId": f.order.id().to_string(), "userId": f.user.id().to_string() });
        f.reconciler.handle(&event(PAYMENT_SUCCEEDED, meta.clone())).await.unwrap();

        let fresh = ProductId::new();
        f.repo.update::<User, _, _>(&f.user.id(), |u| u.replace_cart(Cart::from_snapshot([(fresh, 3)]))).await.unwrap();
        assert_eq!(f.reconciler.handle(&event(PAYMENT_SUCCEEDED, meta)).await.unwrap(), Reconciled::Paid);

        let user: User = f.repo.find(&f.user.id()).await.unwrap().unwrap();
        assert_eq!(user.cart().quantity_of(&fresh), 3);
    }

    #[tokio::test]
    async fn test_cart_clear_failure_records_task() {
        let store = Arc::new(FlakyStore::default());
        let f = fixture_on(Repository::new(store.clone())).await;
        store.fail_writes_to("users");

        let meta = serde_json::json!({ "orderId": f.order.id().to_string(), "userId": f.user.id().to_string() });
        assert_eq!(f.reconciler.handle(&event(PAYMENT_SUCCEEDED, meta)).await.unwrap(), Reconciled::Paid);

        let order: Order = f.repo.find(&f.order.id()).await.unwrap().unwrap();
        assert!(order.is_paid());
        let tasks = f.saga.pending().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].step(), &PendingStep::ClearCart { user_id: f.user.id() });
    }
}
