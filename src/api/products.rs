use axum::extract::{Path, State};
use serde::Deserialize;
use validator::Validate;

use crate::api::response::ApiResponse;
use crate::api::ApiJson;
use crate::auth::Principal;
use crate::domain::aggregates::ProductDetails;
use crate::domain::value_objects::Money;
use crate::error::Result;
use crate::state::AppState;

/// Catalog fields as sent by the seller console. Images are already-hosted URLs.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    #[validate(length(min = 1))] pub name: String,
    #[serde(default)] pub description: Vec<String>,
    #[validate(length(min = 1))] pub category: String,
    pub price: Money,
    pub offer_price: Money,
    #[serde(default)] pub best_seller: bool,
}

impl From<ProductData> for ProductDetails {
    fn from(d: ProductData) -> Self {
        Self { name: d.name, description: d.description, category: d.category, price: d.price, offer_price: d.offer_price, best_seller: d.best_seller }
    }
}

#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct AddProductRequest { pub product_data: ProductData, #[serde(default)] pub images: Vec<String> }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct EditProductRequest { #[serde(alias = "productId", default)] pub id: String, pub product_data: ProductData, pub images: Option<Vec<String>> }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct StockRequest { #[serde(alias = "productId", default)] pub id: String, pub in_stock: bool }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct ProductIdRequest { #[serde(alias = "productId", default)] pub id: String }

pub async fn list(State(s): State<AppState>) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("products", s.catalog().list().await?))
}

pub async fn get(State(s): State<AppState>, Path(id): Path<String>) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("product", s.catalog().get(&id).await?))
}

pub async fn add(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<AddProductRequest>) -> Result<ApiResponse> {
    r.product_data.validate()?;
    let product = s.catalog().add(&principal, r.product_data.into(), r.images).await?;
    Ok(ApiResponse::message("Product Added").with("product", product))
}

pub async fn set_stock(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<StockRequest>) -> Result<ApiResponse> {
    s.catalog().set_stock(&principal, &r.id, r.in_stock).await?;
    Ok(ApiResponse::message("Stock Updated"))
}

pub async fn edit(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<EditProductRequest>) -> Result<ApiResponse> {
    r.product_data.validate()?;
    let product = s.catalog().edit(&principal, &r.id, r.product_data.into(), r.images).await?;
    Ok(ApiResponse::message("Product updated successfully").with("product", product))
}

pub async fn delete(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<ProductIdRequest>) -> Result<ApiResponse> {
    s.catalog().delete(&principal, &r.id).await?;
    Ok(ApiResponse::message("Product deleted successfully"))
}
