use axum::extract::{Path, State};
use serde::Deserialize;

use crate::api::response::ApiResponse;
use crate::api::ApiJson;
use crate::auth::Principal;
use crate::error::Result;
use crate::services::ratings::{RatingSummary, SubmitRating};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRatingRequest {
    #[serde(default)] pub product_id: String,
    pub rating: Option<i64>,
    pub review: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct RemoveRatingRequest { #[serde(default)] pub product_id: String }
#[derive(Debug, Deserialize)] #[serde(rename_all = "camelCase")] pub struct RatingIdRequest { #[serde(default)] pub rating_id: String }

fn with_summary(response: ApiResponse, summary: RatingSummary) -> ApiResponse {
    response.with_fields(summary)
}

pub async fn add(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<AddRatingRequest>) -> Result<ApiResponse> {
    let input = SubmitRating { product_id: r.product_id, rating: r.rating, review: r.review, user_name: r.user_name };
    let (updated, summary) = s.ratings().submit(&principal, input).await?;
    let message = if updated { "Rating updated successfully" } else { "Rating added successfully" };
    Ok(with_summary(ApiResponse::message(message), summary))
}

pub async fn delete(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<RemoveRatingRequest>) -> Result<ApiResponse> {
    let summary = s.ratings().remove(&principal, &r.product_id).await?;
    Ok(with_summary(ApiResponse::message("Rating deleted successfully"), summary))
}

pub async fn for_product(State(s): State<AppState>, Path(product_id): Path<String>) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("ratings", s.ratings().for_product(&product_id).await?))
}

pub async fn for_user(State(s): State<AppState>, Path((product_id, user_id)): Path<(String, String)>) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("rating", s.ratings().for_user(&product_id, &user_id).await?))
}

pub async fn all(State(s): State<AppState>, principal: Principal) -> Result<ApiResponse> {
    Ok(ApiResponse::ok().with("ratings", s.ratings().list_all(&principal).await?))
}

pub async fn admin_delete(State(s): State<AppState>, principal: Principal, ApiJson(r): ApiJson<RatingIdRequest>) -> Result<ApiResponse> {
    let summary = s.ratings().remove_by_id(&principal, &r.rating_id).await?;
    Ok(with_summary(ApiResponse::message("Rating deleted successfully"), summary))
}
