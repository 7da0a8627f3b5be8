//! Aggregates module
pub mod address;
pub mod cart;
pub mod delivery;
pub mod order;
pub mod product;
pub mod rating;
pub mod user;

pub use address::{Address, PostalAddress};
pub use cart::Cart;
pub use delivery::{Category, ContactDetails, DeliveryPerson};
pub use order::{Order, OrderError, OrderLine, OrderStatus, PaymentType, PricedLine};
pub use product::{Product, ProductDetails, ProductError};
pub use rating::{Rating, RatingError, Stars};
pub use user::{User, UserView};
