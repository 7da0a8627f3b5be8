//! Rating aggregation.
//!
//! `averageRating`/`totalRatings` on the product are recomputed from the full
//! rating set after every add, update or delete.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::auth::Principal;
use crate::domain::aggregates::rating::summarize;
use crate::domain::aggregates::{Product, Rating, Stars};
use crate::domain::events::{DomainEvent, RatingEvent};
use crate::domain::value_objects::{ProductId, RatingId, UserId};
use crate::error::{Result, ServiceError};
use crate::publisher::EventPublisher;
use crate::services::parse_id;
use crate::store::{Repository, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub average_rating: Decimal,
    pub total_ratings: u32,
}

#[derive(Debug, Clone)]
pub struct SubmitRating {
    pub product_id: String,
    pub rating: Option<i64>,
    pub review: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Clone)]
pub struct RatingService {
    repo: Repository,
    events: EventPublisher,
}

impl RatingService {
    pub fn new(repo: Repository, events: EventPublisher) -> Self { Self { repo, events } }

    /// Upserts the caller's rating. Returns whether an existing rating was
    /// updated, and the product's new aggregate.
    pub async fn submit(&self, principal: &Principal, input: SubmitRating) -> Result<(bool, RatingSummary)> {
        let user_id = principal.user_id()?;
        let (Some(raw), false) = (input.rating, input.product_id.trim().is_empty()) else {
            return Err(ServiceError::invalid("Missing required fields"));
        };
        let stars = Stars::new(raw).map_err(|_| ServiceError::invalid("Rating must be between 1 and 5"))?;
        let product_id: ProductId = parse_id(&input.product_id, "Product")?;
        if self.repo.find::<Product>(&product_id).await?.is_none() {
            return Err(ServiceError::not_found("Product"));
        }

        let id = RatingId::for_pair(&product_id, &user_id);
        let review = input.review.unwrap_or_default();
        let resubmitted = review.clone();
        let updated = self.repo.update::<Rating, _, _>(&id, move |r| r.resubmit(stars, resubmitted)).await?.is_some();
        if !updated {
            let rating = Rating::create(product_id, user_id, stars, review, input.user_name.unwrap_or_default());
            match self.repo.insert(&rating).await {
                Ok(()) => {}
                Err(StoreError::Conflict { .. }) => {
                    tracing::warn!(product_id = %product_id, user_id = %user_id, "Concurrent first rating, keeping the stored one");
                    return Err(ServiceError::Conflict("Rating already submitted".to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }
        tracing::info!(product_id = %product_id, user_id = %user_id, stars = stars.value(), updated, "Rating saved");

        let summary = self.recompute(product_id).await?;
        Ok((updated, summary))
    }

    /// Removes the caller's rating for a product.
    pub async fn remove(&self, principal: &Principal, product_id: &str) -> Result<RatingSummary> {
        let user_id = principal.user_id()?;
        let product_id: ProductId = parse_id(product_id, "Product")?;
        self.delete_rating(RatingId::for_pair(&product_id, &user_id), product_id).await
    }

    /// Back-office removal by rating id.
    pub async fn remove_by_id(&self, principal: &Principal, rating_id: &str) -> Result<RatingSummary> {
        principal.require_admin()?;
        let id: RatingId = parse_id(rating_id, "Rating")?;
        let rating: Rating = self.repo.find(&id).await?.ok_or_else(|| ServiceError::not_found("Rating"))?;
        self.delete_rating(id, rating.product_id()).await
    }

    /// Newest first.
    pub async fn for_product(&self, product_id: &str) -> Result<Vec<Rating>> {
        let product_id: ProductId = parse_id(product_id, "Product")?;
        let mut ratings = self.repo.find_where::<Rating>(|r| r.product_id() == product_id).await?;
        ratings.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(ratings)
    }

    pub async fn for_user(&self, product_id: &str, user_id: &str) -> Result<Option<Rating>> {
        let product_id: ProductId = parse_id(product_id, "Product")?;
        let user_id: UserId = parse_id(user_id, "User")?;
        Ok(self.repo.find(&RatingId::for_pair(&product_id, &user_id)).await?)
    }

    pub async fn list_all(&self, principal: &Principal) -> Result<Vec<Rating>> {
        principal.require_admin()?;
        let mut ratings = self.repo.all::<Rating>().await?;
        ratings.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(ratings)
    }

    async fn delete_rating(&self, id: RatingId, product_id: ProductId) -> Result<RatingSummary> {
        if !self.repo.delete::<Rating>(&id).await? {
            return Err(ServiceError::not_found("Rating"));
        }
        tracing::info!(rating_id = %id, product_id = %product_id, "Rating deleted");
        self.recompute(product_id).await
    }

    /// Recomputes the aggregate from every rating of the product and stores it.
    async fn recompute(&self, product_id: ProductId) -> Result<RatingSummary> {
        let ratings = self.repo.find_where::<Rating>(|r| r.product_id() == product_id).await?;
        let (average_rating, total_ratings) = summarize(&ratings);
        let stored = self
            .repo
            .update::<Product, _, _>(&product_id, move |p| p.set_rating_summary(average_rating, total_ratings))
            .await?;
        if stored.is_none() {
            tracing::warn!(product_id = %product_id, "Rated product no longer exists, aggregate not stored");
        }
        self.events
            .publish(vec![DomainEvent::Rating(RatingEvent::Recomputed { product_id, average_rating, total_ratings })])
            .await;
        Ok(RatingSummary { average_rating, total_ratings })
    }
}
