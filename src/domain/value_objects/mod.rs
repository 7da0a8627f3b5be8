//! Value Objects for the grocery domain

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Defines a UUID-backed identifier that cannot be mixed up with other entity ids.
macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self { Self(Uuid::now_v7()) }
            pub fn from_uuid(id: Uuid) -> Self { Self(id) }
            pub fn as_uuid(&self) -> &Uuid { &self.0 }
        }

        impl Default for $name { fn default() -> Self { Self::new() } }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl FromStr for $name {
            type Err = IdError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|_| IdError(s.to_string()))
            }
        }
    };
}

entity_id!(UserId);
entity_id!(ProductId);
entity_id!(OrderId);
entity_id!(AddressId);
entity_id!(RatingId);
entity_id!(DeliveryPersonId);
entity_id!(CategoryId);
entity_id!(TaskId);

/// Raised when a client-supplied identifier is not a well-formed id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdError(pub String);
impl std::error::Error for IdError {}
impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Invalid identifier: {}", self.0) }
}

/// Money value object. Amounts are plain decimals in the store currency,
/// carried as JSON numbers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn from_major(units: i64) -> Self { Self(Decimal::from(units)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_negative(&self) -> bool { self.0 < Decimal::ZERO }
    pub fn add(&self, other: &Money) -> Money { Money(self.0 + other.0) }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// Flat 2% tax, floored to a whole unit.
    pub fn tax(&self) -> Money { Money((self.0 * tax_rate()).floor()) }
    pub fn with_tax(&self) -> Money { self.add(&self.tax()) }

    /// Truncates to two decimal places, the precision shown to shoppers.
    pub fn floor_cents(&self) -> Money { Money(self.0.round_dp_with_strategy(2, RoundingStrategy::ToZero)) }

    /// Unit price charged by the payment provider, in minor units: floor(price * 1.02) * 100.
    pub fn taxed_minor_units(&self) -> i64 {
        let taxed = (self.0 + self.0 * tax_rate()).floor() * Decimal::ONE_HUNDRED;
        taxed.to_i64().unwrap_or(i64::MAX)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

fn tax_rate() -> Decimal { Decimal::new(2, 2) }

/// Strictly positive item quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> Option<Self> { (value > 0).then_some(Self(value)) }
    /// Non-positive input means "no quantity" rather than an error.
    pub fn from_signed(value: i64) -> Option<Self> {
        u32::try_from(value).ok().and_then(Self::new)
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn decrement(&self) -> Option<Self> { Self::new(self.0 - 1) }
}

impl TryFrom<u32> for Quantity {
    type Error = String;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "quantity must be positive".to_string())
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> u32 { q.0 }
}
