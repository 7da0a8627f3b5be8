use axum::extract::State;
use serde::Deserialize;
use validator::Validate;

use crate::api::response::ApiResponse;
use crate::api::ApiJson;
use crate::auth::Principal;
use crate::domain::aggregates::ContactDetails;
use crate::error::Result;
use crate::services::admin::CategoryChanges;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AddCategoryRequest {
    #[validate(length(min = 1))] pub name: String,
    #[serde(default)] pub description: String,
    #[serde(default)] pub image: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[serde(default)] pub category_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPersonRequest {
    #[serde(default)] pub delivery_person_id: String,
    #[validate(length(min = 1))] pub name: String,
    #[validate(email)] pub email: String,
    #[validate(length(min = 5))] pub phone: String,
    #[validate(length(min = 1))] pub address: String,
    pub is_active: Option<bool>,
}

impl DeliveryPersonRequest {
    fn contact(&self) -> ContactDetails {
        ContactDetails { name: self.name.clone(), email: self.email.clone(), phone: self.phone.clone(), address: self.address.clone() }
    }
}

#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct CategoryIdRequest { #[serde(default)] pub category_id: String }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct DeliveryPersonIdRequest { #[serde(default)] pub delivery_person_id: String }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct UserIdRequest { #[serde(default)] pub user_id: String }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct BlockUserRequest { #[serde(default)] pub user_id: String, pub is_blocked: bool }

pub async fn categories(State(s): State<AppState>, principal: Principal) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("categories", s.admin().categories(&principal).await?))
}

pub async fn add_category(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<AddCategoryRequest>) -> Result<ApiResponse> {
    r.validate()?;
    let category = s.admin().add_category(&principal, &r.name, &r.description, &r.image).await?;
    Ok(ApiResponse::message("Category added successfully").with("category", category))
}

pub async fn update_category(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<UpdateCategoryRequest>) -> Result<ApiResponse> {
    let changes = CategoryChanges { name: r.name, description: r.description, image: r.image, is_active: r.is_active };
    let category = s.admin().update_category(&principal, &r.category_id, changes).await?;
    Ok(ApiResponse::message("Category updated successfully").with("category", category))
}

pub async fn delete_category(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<CategoryIdRequest>) -> Result<ApiResponse> {
    s.admin().delete_category(&principal, &r.category_id).await?;
    Ok(ApiResponse::message("Category deleted successfully"))
}

pub async fn delivery_persons(State(s): State<AppState>, principal: Principal) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("deliveryPersons", s.admin().delivery_persons(&principal).await?))
}

pub async fn add_delivery_person(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<DeliveryPersonRequest>) -> Result<ApiResponse> {
    r.validate()?;
    let person = s.admin().add_delivery_person(&principal, r.contact()).await?;
    Ok(ApiResponse::message("Delivery person added successfully").with("deliveryPerson", person))
}

pub async fn update_delivery_person(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<DeliveryPersonRequest>) -> Result<ApiResponse> {
    r.validate()?;
    let person = s.admin().update_delivery_person(&principal, &r.delivery_person_id, r.contact(), r.is_active).await?;
    Ok(ApiResponse::message("Delivery person updated successfully").with("deliveryPerson", person))
}

pub async fn delete_delivery_person(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<DeliveryPersonIdRequest>) -> Result<ApiResponse> {
    s.admin().delete_delivery_person(&principal, &r.delivery_person_id).await?;
    Ok(ApiResponse::message("Delivery person deleted successfully"))
}

pub async fn users(State(s): State<AppState>, principal: Principal) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("users", s.admin().users(&principal).await?))
}

pub async fn delete_user(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<UserIdRequest>) -> Result<ApiResponse> {
    s.admin().delete_user(&principal, &r.user_id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}

pub async fn block_user(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<BlockUserRequest>) -> Result<ApiResponse> {
    let user = s.admin().set_blocked(&principal, &r.user_id, r.is_blocked).await?;
    let message = if r.is_blocked { "User blocked successfully" } else { "User unblocked successfully" };
    Ok(ApiResponse::message(message).with("user", user))
}

/// Same listing as the storefront, behind the admin check.
pub async fn products(State(s): State<AppState>, principal: Principal) -> Result<ApiResponse> {
    principal.require_admin()?;
    Ok(ApiResponse::ok().with("products", s.catalog().list().await?))
}

pub async fn pending_tasks(State(s): State<AppState>, principal: Principal) -> Result<ApiResponse> {
    principal.require_admin()?;
    Ok(ApiResponse::ok().with("tasks", s.saga().pending().await?))
}

/// Replays follow-up steps that failed after their primary write.
pub async fn reconcile(State(s): State<AppState>, principal: Principal) -> Result<ApiResponse> {
    principal.require_admin()?;
    let report = s.saga().replay().await?;
    Ok(ApiResponse::ok().with("resolved", report.resolved).with("remaining", report.remaining))
}
