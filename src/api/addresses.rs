use axum::extract::State;
use serde::Deserialize;

use crate::api::response::ApiResponse;
use crate::api::ApiJson;
use crate::auth::Principal;
use crate::domain::aggregates::PostalAddress;
use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Deserialize)] pub struct AddAddressRequest { pub address: PostalAddress }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAddressRequest {
    #[serde(default)] pub address_id: String,
    /// The address currently selected at checkout, if any.
    pub selected_address_id: Option<String>,
}

pub async fn add(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<AddAddressRequest>) -> Result<ApiResponse> {
    let address = s.addresses().add(&principal, r.address).await?;
    Ok(ApiResponse::message("Address added successfully").with("address", address))
}

pub async fn list(State(s): State<AppState>, principal: Principal) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("addresses", s.addresses().list(&principal).await?))
}

pub async fn delete(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<DeleteAddressRequest>) -> Result<ApiResponse> {
    let selected = s.addresses().delete(&principal, &r.address_id, r.selected_address_id.as_deref()).await?;
    Ok(ApiResponse::message("Address deleted successfully").with("selectedAddressId", selected))
}
