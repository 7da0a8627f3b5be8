//! Domain events
use crate::domain::value_objects::{DeliveryPersonId, Money, OrderId, ProductId, UserId};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Rating(RatingEvent),
}

impl DomainEvent {
    /// Subject the event is published on, e.g. `grocery.order.placed`.
    pub fn subject(&self) -> String {
        let (aggregate, name) = match self {
            Self::Order(e) => ("order", e.name()),
            Self::Rating(e) => ("rating", e.name()),
        };
        format!("grocery.{aggregate}.{name}")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: OrderId, user_id: UserId, amount: Money, online: bool },
    Approved { order_id: OrderId },
    Rejected { order_id: OrderId, reason: String },
    StatusChanged { order_id: OrderId, status: String },
    DeliveryAssigned { order_id: OrderId, delivery_person_id: DeliveryPersonId },
    Paid { order_id: OrderId },
    Deleted { order_id: OrderId },
}

impl OrderEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "placed",
            Self::Approved { .. } => "approved",
            Self::Rejected { .. } => "rejected",
            Self::StatusChanged { .. } => "status_changed",
            Self::DeliveryAssigned { .. } => "delivery_assigned",
            Self::Paid { .. } => "paid",
            Self::Deleted { .. } => "deleted",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RatingEvent {
    Recomputed {
        product_id: ProductId,
        #[serde(with = "rust_decimal::serde::float")]
        average_rating: Decimal,
        total_ratings: u32,
    },
}

impl RatingEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Recomputed { .. } => "recomputed",
        }
    }
}
