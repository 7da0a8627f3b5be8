use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use serde::Deserialize;

use crate::api::response::ApiResponse;
use crate::api::ApiJson;
use crate::auth::Principal;
use crate::error::Result;
use crate::services::orders::ItemRequest;
use crate::state::AppState;

#[derive(Debug, Deserialize)] pub struct OrderLine { #[serde(default)] pub product: String, #[serde(default)] pub quantity: i64 }

/// `userId` in the body is accepted for compatibility and ignored; the owner
/// is always the authenticated caller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)] pub items: Vec<OrderLine>,
    pub address: Option<String>,
    pub user_id: Option<String>,
}

impl PlaceOrderRequest {
    fn into_parts(self) -> (Vec<ItemRequest>, Option<String>) {
        let items = self.items.into_iter().map(|l| ItemRequest { product_id: l.product, quantity: l.quantity }).collect();
        (items, self.address)
    }
}

#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct OrderIdRequest { #[serde(default)] pub order_id: String }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct RejectRequest { #[serde(default)] pub order_id: String, pub reason: Option<String> }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct StatusRequest { #[serde(default)] pub order_id: String, #[serde(default)] pub status: String }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct AssignRequest { #[serde(default)] pub order_id: String, #[serde(default)] pub delivery_person_id: String }

pub async fn place_cod(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<PlaceOrderRequest>) -> Result<ApiResponse> {
    let (items, address) = r.into_parts();
    let order = s.orders().place_cod(&principal, items, address).await?;
    Ok(ApiResponse::message("Order Placed Successfully").with("orderId", order.id()))
}

pub async fn place_online(State(s): State<AppState>, headers: HeaderMap, principal: Principal, ApiJson(r): ApiJson<PlaceOrderRequest>) -> Result<ApiResponse> {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()).map(str::to_string).unwrap_or_else(|| s.config().public_url.clone());
    let (items, address) = r.into_parts();
    let (order, session) = s.orders().place_online(&principal, items, address, &origin).await?;
    Ok(ApiResponse::ok().with("url", session.url).with("orderId", order.id()))
}

pub async fn user_orders(State(s): State<AppState>, principal: Principal) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("orders", s.orders().list_user_orders(&principal).await?))
}

pub async fn seller_orders(State(s): State<AppState>, principal: Principal) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("orders", s.orders().list_settled(&principal).await?))
}

pub async fn all_orders(State(s): State<AppState>, principal: Principal) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("orders", s.orders().list_all(&principal).await?))
}

pub async fn get_by_id(State(s): State<AppState>, principal: Principal, Path(order_id): Path<String>) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("order", s.orders().get_order_by_id(&principal, &order_id).await?))
}

pub async fn delete(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<OrderIdRequest>) -> Result<ApiResponse> {
    s.orders().delete_order(&principal, &r.order_id).await?;
    Ok(ApiResponse::message("Order deleted successfully"))
}

pub async fn approve(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<OrderIdRequest>) -> Result<ApiResponse> {
    let order = s.orders().approve(&principal, &r.order_id).await?;
    Ok(ApiResponse::message("Order approved").with("order", order))
}

pub async fn reject(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<RejectRequest>) -> Result<ApiResponse> {
    let order = s.orders().reject(&principal, &r.order_id, r.reason).await?;
    Ok(ApiResponse::message("Order rejected").with("order", order))
}

pub async fn update_status(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<StatusRequest>) -> Result<ApiResponse> {
    let order = s.orders().update_status(&principal, &r.order_id, &r.status).await?;
    Ok(ApiResponse::message("Order status updated").with("order", order))
}

pub async fn assign_delivery(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<AssignRequest>) -> Result<ApiResponse> {
    let order = s.orders().assign_delivery_person(&principal, &r.order_id, &r.delivery_person_id).await?;
    Ok(ApiResponse::message("Delivery person assigned").with("order", order))
}
