//! Order lifecycle engine.
//!
//! `amount` is frozen at placement from the offer prices of that moment.
//! Read views re-resolve product names, images and prices against the current
//! catalog for display only.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::Principal;
use crate::domain::aggregates::{Address, DeliveryPerson, Order, OrderError, OrderStatus, PaymentType, PricedLine, Product, User};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{DeliveryPersonId, Money, OrderId, ProductId, Quantity, UserId};
use crate::error::{Result, ServiceError};
use crate::payments::{CheckoutLine, CheckoutRequest, CheckoutSession, PaymentGateway};
use crate::publisher::EventPublisher;
use crate::services::parse_id;
use crate::services::saga::{PendingStep, SagaLog};
use crate::store::Repository;

/// One requested line as sent by the client.
#[derive(Debug, Clone)]
pub struct ItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// An order line resolved against the current catalog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub product_id: ProductId,
    pub name: String,
    pub image: String,
    pub price: Money,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItemView>,
    pub total_amount: Money,
    pub address: Option<Address>,
    pub status: OrderStatus,
    pub payment_method: PaymentType,
    pub payment: bool,
    pub is_approved: bool,
    pub is_rejected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_person_id: Option<DeliveryPersonId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct OrderService {
    repo: Repository,
    payments: Arc<dyn PaymentGateway>,
    events: EventPublisher,
    saga: SagaLog,
}

impl OrderService {
    pub fn new(repo: Repository, payments: Arc<dyn PaymentGateway>, events: EventPublisher, saga: SagaLog) -> Self {
        Self { repo, payments, events, saga }
    }

    /// Places a cash-on-delivery order.
    pub async fn place_cod(&self, principal: &Principal, items: Vec<ItemRequest>, address_id: Option<String>) -> Result<Order> {
        let (order, _) = self.place_order(principal, items, address_id, PaymentType::Cod).await?;
        Ok(order)
    }

    /// Places an online order and opens a provider checkout session for it.
    ///
    /// The order is stored unpaid before the redirect; if the shopper never
    /// pays it stays that way until a payment-failed event removes it.
    pub async fn place_online(
        &self,
        principal: &Principal,
        items: Vec<ItemRequest>,
        address_id: Option<String>,
        origin: &str,
    ) -> Result<(Order, CheckoutSession)> {
        let (order, lines) = self.place_order(principal, items, address_id, PaymentType::Online).await?;
        let session = self.initiate_online_payment(&order, lines, origin).await?;
        Ok((order, session))
    }

    pub async fn place_order(
        &self,
        principal: &Principal,
        items: Vec<ItemRequest>,
        address_id: Option<String>,
        payment_type: PaymentType,
    ) -> Result<(Order, Vec<CheckoutLine>)> {
        let user_id = principal.user_id()?;
        let address_id = match address_id.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() && !items.is_empty() => parse_id(raw, "Address")?,
            _ => return Err(ServiceError::invalid("Invalid data")),
        };

        let user: User = self.repo.find(&user_id).await?.ok_or_else(|| ServiceError::not_found("User"))?;
        if user.is_blocked() {
            return Err(ServiceError::unauthorized("Your account has been blocked"));
        }
        let address: Address = self.repo.find(&address_id).await?.ok_or_else(|| ServiceError::not_found("Address"))?;
        if !address.is_owned_by(&user_id) {
            return Err(ServiceError::unauthorized("Address does not belong to this user"));
        }

        let mut priced = Vec::with_capacity(items.len());
        let mut checkout = Vec::with_capacity(items.len());
        for item in items {
            let product_id: ProductId = parse_id(&item.product_id, "Product")?;
            let quantity = Quantity::from_signed(item.quantity).ok_or_else(|| ServiceError::invalid("Quantity must be positive"))?;
            let product: Product = self.repo.find(&product_id).await?.ok_or_else(|| ServiceError::not_found("Product"))?;
            checkout.push(CheckoutLine {
                name: product.name().to_string(),
                unit_amount: product.offer_price().taxed_minor_units(),
                quantity: quantity.value(),
            });
            priced.push(PricedLine { product_id, quantity, unit_price: product.offer_price() });
        }

        let mut order = Order::place(user_id, address_id, payment_type, priced)?;
        let events = order.take_events();
        self.repo.insert(&order).await?;
        tracing::info!(order_id = %order.id(), user_id = %user_id, amount = %order.amount(), payment_type = ?payment_type, "Order placed");
        self.events.publish(events).await;
        Ok((order, checkout))
    }

    /// Opens a checkout session correlated to the order by `{orderId, userId}` metadata.
    pub async fn initiate_online_payment(&self, order: &Order, lines: Vec<CheckoutLine>, origin: &str) -> Result<CheckoutSession> {
        let origin = origin.trim_end_matches('/');
        let request = CheckoutRequest {
            order_id: order.id(),
            user_id: order.user_id(),
            lines,
            success_url: format!("{origin}/loader?next=my-orders"),
            cancel_url: format!("{origin}/cart"),
        };
        self.payments.create_checkout_session(request).await.map_err(|e| {
            tracing::warn!(order_id = %order.id(), error = %e, "Checkout session failed, order left unpaid");
            ServiceError::from(e)
        })
    }

    pub async fn approve(&self, principal: &Principal, order_id: &str) -> Result<Order> {
        principal.require_admin()?;
        self.apply(order_id, Order::approve).await
    }

    pub async fn reject(&self, principal: &Principal, order_id: &str, reason: Option<String>) -> Result<Order> {
        principal.require_admin()?;
        self.apply(order_id, move |o| o.reject(reason)).await
    }

    pub async fn update_status(&self, principal: &Principal, order_id: &str, status: &str) -> Result<Order> {
        principal.require_admin()?;
        if status.trim().is_empty() {
            return Err(ServiceError::invalid("Order ID and status are required"));
        }
        let target = OrderStatus::parse(status).ok_or_else(|| ServiceError::invalid(format!("Unknown order status: {status}")))?;
        self.apply(order_id, move |o| o.transition_to(target)).await
    }

    /// Step 1 sets the order's delivery person; step 2 adds the order to the
    /// person's roster. A step 2 failure is recorded for reconciliation.
    pub async fn assign_delivery_person(&self, principal: &Principal, order_id: &str, delivery_person_id: &str) -> Result<Order> {
        principal.require_admin()?;
        let delivery_person_id: DeliveryPersonId = parse_id(delivery_person_id, "Delivery person")?;
        let person: DeliveryPerson =
            self.repo.find(&delivery_person_id).await?.ok_or_else(|| ServiceError::not_found("Delivery person"))?;
        if !person.is_active() {
            return Err(ServiceError::invalid("Delivery person is not active"));
        }

        let order = self
            .apply(order_id, move |o| {
                o.assign_delivery_person(delivery_person_id);
                Ok(())
            })
            .await?;

        let id = order.id();
        match self.repo.update::<DeliveryPerson, _, _>(&delivery_person_id, move |d| d.assign(id)).await {
            Ok(Some(_)) => {}
            Ok(None) => tracing::warn!(order_id = %id, delivery_person_id = %delivery_person_id, "Delivery person removed during assignment"),
            Err(e) => self.saga.record(PendingStep::AssignDelivery { order_id: id, delivery_person_id }, &e).await,
        }
        Ok(order)
    }

    /// Owners may delete their own orders; admins may delete any order.
    pub async fn delete_order(&self, principal: &Principal, order_id: &str) -> Result<()> {
        let id: OrderId = parse_id(order_id, "Order")?;
        let order: Order = self.repo.find(&id).await?.ok_or_else(|| ServiceError::not_found("Order"))?;
        if !principal.is_admin() && order.user_id().to_string() != principal.subject() {
            return Err(ServiceError::unauthorized("Unauthorized to delete this order"));
        }
        if self.repo.delete::<Order>(&id).await? {
            tracing::info!(order_id = %id, by = principal.subject(), "Order deleted");
            self.events.publish(vec![DomainEvent::Order(OrderEvent::Deleted { order_id: id })]).await;
        }
        Ok(())
    }

    /// Visible to the owner and to sellers/admins.
    pub async fn get_order_by_id(&self, principal: &Principal, order_id: &str) -> Result<OrderDetails> {
        let id: OrderId = parse_id(order_id, "Order")?;
        let order: Order = self.repo.find(&id).await?.ok_or_else(|| ServiceError::not_found("Order"))?;
        if principal.require_seller().is_err() && order.user_id().to_string() != principal.subject() {
            return Err(ServiceError::unauthorized("Not Authorized"));
        }
        let mut details = self.resolve(vec![order]).await?;
        details.pop().ok_or_else(|| ServiceError::not_found("Order"))
    }

    /// The caller's settled orders (COD, or paid online), newest first.
    pub async fn list_user_orders(&self, principal: &Principal) -> Result<Vec<OrderDetails>> {
        let user_id = principal.user_id()?;
        let orders = self.repo.find_where::<Order>(|o| o.is_owned_by(&user_id) && o.is_settled()).await?;
        self.resolve(orders).await
    }

    /// All settled orders, for the seller console.
    pub async fn list_settled(&self, principal: &Principal) -> Result<Vec<OrderDetails>> {
        principal.require_seller()?;
        let orders = self.repo.find_where::<Order>(Order::is_settled).await?;
        self.resolve(orders).await
    }

    /// Every order including unpaid online ones.
    pub async fn list_all(&self, principal: &Principal) -> Result<Vec<OrderDetails>> {
        principal.require_admin()?;
        let orders = self.repo.all::<Order>().await?;
        self.resolve(orders).await
    }

    /// Atomically applies a lifecycle operation and publishes its events.
    async fn apply<F>(&self, order_id: &str, op: F) -> Result<Order>
    where
        F: FnOnce(&mut Order) -> std::result::Result<(), OrderError> + Send,
    {
        let id: OrderId = parse_id(order_id, "Order")?;
        let mut events = Vec::new();
        let drained = &mut events;
        let outcome = self
            .repo
            .try_update::<Order, _, OrderError>(&id, move |order| {
                op(order)?;
                *drained = order.take_events();
                Ok(())
            })
            .await?;
        let order = outcome.ok_or_else(|| ServiceError::not_found("Order"))??;
        if !events.is_empty() {
            tracing::info!(order_id = %id, status = %order.status(), "Order updated");
        }
        self.events.publish(events).await;
        Ok(order)
    }

    /// Newest first, with lines resolved against the current catalog.
    async fn resolve(&self, mut orders: Vec<Order>) -> Result<Vec<OrderDetails>> {
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        let products: HashMap<ProductId, Product> = self.repo.all::<Product>().await?.into_iter().map(|p| (p.id(), p)).collect();
        let mut addresses: HashMap<_, Option<Address>> = HashMap::new();
        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            let address_id = order.address_id();
            if !addresses.contains_key(&address_id) {
                addresses.insert(address_id, self.repo.find(&address_id).await?);
            }
            let items = order
                .items()
                .iter()
                .map(|line| {
                    let product = products.get(&line.product_id);
                    OrderItemView {
                        product_id: line.product_id,
                        name: product.map(|p| p.name().to_string()).unwrap_or_else(|| "Product not available".to_string()),
                        image: product.and_then(Product::primary_image).unwrap_or_default().to_string(),
                        price: product.map(Product::offer_price).unwrap_or(Money::ZERO),
                        quantity: line.quantity.value(),
                    }
                })
                .collect();
            details.push(OrderDetails {
                id: order.id(),
                user_id: order.user_id(),
                items,
                total_amount: order.amount(),
                address: addresses.get(&address_id).cloned().flatten(),
                status: order.status(),
                payment_method: order.payment_type(),
                payment: order.is_paid(),
                is_approved: order.is_approved(),
                is_rejected: order.is_rejected(),
                rejection_reason: order.rejection_reason().map(String::from),
                delivery_person_id: order.delivery_person_id(),
                created_at: order.created_at(),
            });
        }
        Ok(details)
    }
}
