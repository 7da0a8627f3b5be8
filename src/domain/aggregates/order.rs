//! Order Aggregate
//!
//! `amount` is computed once from the priced lines at placement and never
//! recomputed. `is_approved` and `is_rejected` are never both true.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{AddressId, DeliveryPersonId, Money, OrderId, ProductId, Quantity, UserId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    items: Vec<OrderLine>,
    amount: Money,
    address_id: AddressId,
    payment_type: PaymentType,
    is_paid: bool,
    is_approved: bool,
    is_rejected: bool,
    status: OrderStatus,
    delivery_person_id: Option<DeliveryPersonId>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine { pub product_id: ProductId, pub quantity: Quantity }

/// A line resolved against the catalog at checkout time.
#[derive(Clone, Debug)] pub struct PricedLine { pub product_id: ProductId, pub quantity: Quantity, pub unit_price: Money }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentType { #[serde(rename = "COD")] Cod, Online }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Order Placed")] OrderPlaced,
    Approved,
    Rejected,
    Packing,
    Shipped,
    #[serde(rename = "Out for delivery")] OutForDelivery,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        Self::OrderPlaced, Self::Approved, Self::Rejected, Self::Packing,
        Self::Shipped, Self::OutForDelivery, Self::Delivered,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::OrderPlaced => "Order Placed",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Packing => "Packing",
            Self::Shipped => "Shipped",
            Self::OutForDelivery => "Out for delivery",
            Self::Delivered => "Delivered",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label().eq_ignore_ascii_case(label.trim()))
    }

    /// Statuses in which the admin decision can still be made or reversed.
    pub fn is_decision(&self) -> bool { matches!(self, Self::OrderPlaced | Self::Approved | Self::Rejected) }

    fn fulfillment_rank(&self) -> Option<u8> {
        match self {
            Self::Packing => Some(1),
            Self::Shipped => Some(2),
            Self::OutForDelivery => Some(3),
            Self::Delivered => Some(4),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.label()) }
}

impl Order {
    pub fn place(user_id: UserId, address_id: AddressId, payment_type: PaymentType, lines: Vec<PricedLine>) -> Result<Self, OrderError> {
        if lines.is_empty() { return Err(OrderError::NoItems); }
        let subtotal = lines.iter().fold(Money::ZERO, |acc, l| acc.add(&l.unit_price.multiply(l.quantity.value())));
        let now = Utc::now();
        let mut order = Self {
            id: OrderId::new(), user_id,
            items: lines.into_iter().map(|l| OrderLine { product_id: l.product_id, quantity: l.quantity }).collect(),
            amount: subtotal.with_tax(), address_id, payment_type,
            is_paid: false, is_approved: false, is_rejected: false, status: OrderStatus::OrderPlaced,
            delivery_person_id: None, rejection_reason: None, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(OrderEvent::Placed {
            order_id: order.id, user_id, amount: order.amount, online: payment_type == PaymentType::Online,
        });
        Ok(order)
    }

    pub fn id(&self) -> OrderId { self.id }
    pub fn user_id(&self) -> UserId { self.user_id }
    pub fn items(&self) -> &[OrderLine] { &self.items }
    pub fn amount(&self) -> Money { self.amount }
    pub fn address_id(&self) -> AddressId { self.address_id }
    pub fn payment_type(&self) -> PaymentType { self.payment_type }
    pub fn is_paid(&self) -> bool { self.is_paid }
    pub fn is_approved(&self) -> bool { self.is_approved }
    pub fn is_rejected(&self) -> bool { self.is_rejected }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn delivery_person_id(&self) -> Option<DeliveryPersonId> { self.delivery_person_id }
    pub fn rejection_reason(&self) -> Option<&str> { self.rejection_reason.as_deref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool { self.user_id == *user_id }

    /// COD orders and paid online orders; unpaid online orders are still pending checkout.
    pub fn is_settled(&self) -> bool { self.payment_type == PaymentType::Cod || self.is_paid }

    pub fn approve(&mut self) -> Result<(), OrderError> {
        self.ensure_decision_open(OrderStatus::Approved)?;
        if self.is_approved && self.status == OrderStatus::Approved { return Ok(()); }
        self.is_approved = true;
        self.is_rejected = false;
        self.rejection_reason = None;
        self.status = OrderStatus::Approved;
        self.touch();
        self.raise_event(OrderEvent::Approved { order_id: self.id });
        Ok(())
    }

    pub fn reject(&mut self, reason: Option<String>) -> Result<(), OrderError> {
        self.ensure_decision_open(OrderStatus::Rejected)?;
        let reason = reason.filter(|r| !r.trim().is_empty()).unwrap_or_else(|| "Order rejected by admin".to_string());
        if self.is_rejected && self.rejection_reason.as_deref() == Some(reason.as_str()) { return Ok(()); }
        self.is_rejected = true;
        self.is_approved = false;
        self.status = OrderStatus::Rejected;
        self.rejection_reason = Some(reason.clone());
        self.touch();
        self.raise_event(OrderEvent::Rejected { order_id: self.id, reason });
        Ok(())
    }

    /// Moves the order along the fulfillment chain. Decision statuses are
    /// routed through `approve`/`reject` so the flags stay exclusive.
    pub fn transition_to(&mut self, target: OrderStatus) -> Result<(), OrderError> {
        if target == self.status { return Ok(()); }
        match target {
            OrderStatus::Approved => return self.approve(),
            OrderStatus::Rejected => return self.reject(None),
            OrderStatus::OrderPlaced => return Err(self.invalid(target)),
            _ => {}
        }
        if !self.is_approved { return Err(OrderError::NotApproved); }
        let current = self.status.fulfillment_rank().unwrap_or(0);
        let next = target.fulfillment_rank().unwrap_or(0);
        if next <= current { return Err(self.invalid(target)); }
        self.status = target;
        self.touch();
        self.raise_event(OrderEvent::StatusChanged { order_id: self.id, status: target.label().to_string() });
        Ok(())
    }

    /// Returns false when the order was already paid.
    pub fn mark_paid(&mut self) -> bool {
        if self.is_paid { return false; }
        self.is_paid = true;
        self.touch();
        self.raise_event(OrderEvent::Paid { order_id: self.id });
        true
    }

    pub fn assign_delivery_person(&mut self, delivery_person_id: DeliveryPersonId) {
        self.delivery_person_id = Some(delivery_person_id);
        self.touch();
        self.raise_event(OrderEvent::DeliveryAssigned { order_id: self.id, delivery_person_id });
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn ensure_decision_open(&self, target: OrderStatus) -> Result<(), OrderError> {
        if self.status.is_decision() { Ok(()) } else { Err(self.invalid(target)) }
    }
    fn invalid(&self, to: OrderStatus) -> OrderError { OrderError::InvalidTransition { from: self.status, to } }
    fn raise_event(&mut self, e: OrderEvent) { self.events.push(DomainEvent::Order(e)); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError { NoItems, NotApproved, InvalidTransition { from: OrderStatus, to: OrderStatus } }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "Order has no items"),
            Self::NotApproved => write!(f, "Order must be approved first"),
            Self::InvalidTransition { from, to } => write!(f, "Cannot move order from {from} to {to}"),
        }
    }
}
