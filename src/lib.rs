//! Grocery Commerce Platform
//!
//! Backend for a grocery storefront, its seller console and back-office.
//!
//! ## Features
//! - Server-side cart with a coalescing write-behind queue
//! - Order lifecycle: COD and online placement, approval, status transitions
//! - Payment webhook reconciliation
//! - Product rating aggregation
//! - Address book, catalog, categories, delivery staff, user moderation

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod payments;
pub mod publisher;
pub mod services;
pub mod state;
pub mod store;

pub use config::AppConfig;
pub use error::{Result, ServiceError};
pub use state::AppState;
