//! Application services. Each takes the caller's `Principal` explicitly and
//! returns `ServiceError` from the fixed taxonomy.

use std::str::FromStr;

use crate::domain::value_objects::IdError;
use crate::error::{Result, ServiceError};

pub mod addresses;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod payments;
pub mod ratings;
pub mod saga;

pub use addresses::AddressService;
pub use admin::AdminService;
pub use cart::{CartService, CartSync};
pub use catalog::CatalogService;
pub use orders::OrderService;
pub use payments::PaymentReconciler;
pub use ratings::RatingService;
pub use saga::SagaLog;

/// Parses a client-supplied id; `what` names the entity in the message.
pub(crate) fn parse_id<T: FromStr<Err = IdError>>(raw: &str, what: &str) -> Result<T> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ServiceError::invalid(format!("{what} ID is required")));
    }
    raw.parse().map_err(|_| ServiceError::invalid(format!("Invalid {what} ID format")))
}
