use std::collections::HashMap;

use axum::extract::State;
use serde::Deserialize;

use crate::api::response::ApiResponse;
use crate::api::ApiJson;
use crate::auth::Principal;
use crate::domain::value_objects::ProductId;
use crate::error::Result;
use crate::services::parse_id;
use crate::state::AppState;

#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct ItemRequest { #[serde(default)] pub product_id: String }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct SetQuantityRequest { #[serde(default)] pub product_id: String, pub quantity: i64 }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct UpdateCartRequest { #[serde(default)] pub cart_items: HashMap<String, i64> }

pub async fn summary(State(s): State<AppState>, principal: Principal) -> Result<ApiResponse> {
    let summary = s.carts().summary(&principal.user_id()?).await?;
    Ok(ApiResponse::ok().with("cartItems", summary.cart_items).with("totalCount", summary.total_count).with("totalAmount", summary.total_amount))
}

pub async fn add(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<ItemRequest>) -> Result<ApiResponse> {
    let product_id: ProductId = parse_id(&r.product_id, "Product")?;
    let cart = s.carts().add_item(principal.user_id()?, product_id).await?;
    Ok(ApiResponse::message("Added to Cart").with("cartItems", cart))
}

pub async fn set(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<SetQuantityRequest>) -> Result<ApiResponse> {
    let product_id: ProductId = parse_id(&r.product_id, "Product")?;
    let cart = s.carts().set_quantity(principal.user_id()?, product_id, r.quantity).await?;
    Ok(ApiResponse::message("Cart Updated").with("cartItems", cart))
}

pub async fn remove(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<ItemRequest>) -> Result<ApiResponse> {
    let product_id: ProductId = parse_id(&r.product_id, "Product")?;
    let cart = s.carts().remove_one(principal.user_id()?, product_id).await?;
    Ok(ApiResponse::message("Removed from Cart").with("cartItems", cart))
}

/// Replaces the whole cart with the client's snapshot.
pub async fn update(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<UpdateCartRequest>) -> Result<ApiResponse> {
    let cart = s.carts().replace(principal.user_id()?, r.cart_items).await?;
    Ok(ApiResponse::message("Cart Updated").with("cartItems", cart))
}
