//! HTTP surface.
//!
//! Every route answers with the `{success, message?, ...}` envelope, domain
//! failures included. The payment webhook is the one exception: it speaks
//! plain status codes to the provider.

use axum::extract::FromRequest;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};

use crate::error::ServiceError;
use crate::state::AppState;

pub mod addresses;
pub mod admin;
pub mod cart;
pub mod orders;
pub mod products;
pub mod ratings;
pub mod response;
pub mod webhook;

/// JSON body extractor whose rejections use the response envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct ApiJson<T>(pub T);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({ "status": "healthy", "service": "grocery-commerce" })) }))
        .route("/stripe", post(webhook::stripe_webhook))
        // Storefront
        .route("/product/list", get(products::list))
        .route("/product/:id", get(products::get))
        .route("/cart", get(cart::summary))
        .route("/cart/add", post(cart::add))
        .route("/cart/set", post(cart::set))
        .route("/cart/remove", post(cart::remove))
        .route("/cart/update", post(cart::update))
        .route("/address/add", post(addresses::add))
        .route("/address/get", post(addresses::list))
        .route("/address/delete", post(addresses::delete))
        .route("/order/cod", post(orders::place_cod))
        .route("/order/stripe", post(orders::place_online))
        .route("/order/user", get(orders::user_orders))
        .route("/order/seller", get(orders::seller_orders))
        .route("/order/delete", post(orders::delete))
        .route("/order/:order_id", get(orders::get_by_id))
        .route("/rating/add", post(ratings::add))
        .route("/rating/delete", post(ratings::delete))
        .route("/rating/product/:id", get(ratings::for_product))
        .route("/rating/user/:product_id/:user_id", get(ratings::for_user))
        // Seller console
        .route("/product/add", post(products::add))
        .route("/product/stock", post(products::set_stock))
        .route("/product/edit", post(products::edit))
        .route("/product/delete", post(products::delete))
        // Back-office
        .route("/admin/orders", get(orders::all_orders))
        .route("/admin/order/approve", put(orders::approve))
        .route("/admin/order/reject", put(orders::reject))
        .route("/admin/order/update-status", put(orders::update_status))
        .route("/admin/order/assign-delivery", put(orders::assign_delivery))
        .route("/admin/reconcile", get(admin::pending_tasks).post(admin::reconcile))
        .route("/admin/categories", get(admin::categories))
        .route("/admin/category/add", post(admin::add_category))
        .route("/admin/category/update", put(admin::update_category))
        .route("/admin/category/delete", delete(admin::delete_category))
        .route("/admin/delivery-persons", get(admin::delivery_persons))
        .route("/admin/delivery-person/add", post(admin::add_delivery_person))
        .route("/admin/delivery-person/update", put(admin::update_delivery_person))
        .route("/admin/delivery-person/delete", delete(admin::delete_delivery_person))
        .route("/admin/users", get(admin::users))
        .route("/admin/user/delete", delete(admin::delete_user))
        .route("/admin/user/block", put(admin::block_user))
        .route("/admin/products", get(admin::products))
        .route("/admin/product/edit", put(products::edit))
        .route("/admin/product/delete", delete(products::delete))
        .route("/admin/ratings", get(ratings::all))
        .route("/admin/rating/delete", delete(ratings::admin_delete))
        .with_state(state)
}
