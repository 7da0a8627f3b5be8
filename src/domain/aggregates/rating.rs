//! Rating Aggregate
//!
//! One rating per (product, user). The rating id is derived from that pair, so
//! the store key itself enforces the uniqueness.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{ProductId, RatingId, UserId};

const RATING_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a0e_8d3b_4c57_9a41_52e3_b7d0_c9f8);

impl RatingId {
    pub fn for_pair(product_id: &ProductId, user_id: &UserId) -> Self {
        let mut name = [0u8; 32];
        name[..16].copy_from_slice(product_id.as_uuid().as_bytes());
        name[16..].copy_from_slice(user_id.as_uuid().as_bytes());
        Self::from_uuid(Uuid::new_v5(&RATING_NAMESPACE, &name))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    id: RatingId,
    product_id: ProductId,
    user_id: UserId,
    rating: Stars,
    review: String,
    user_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Integer score in 1..=5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Stars(u8);

impl Stars {
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value).ok().filter(|v| (1..=5).contains(v)).map(Self).ok_or(RatingError::OutOfRange(value))
    }
    pub fn value(&self) -> u8 { self.0 }
}

impl TryFrom<u8> for Stars {
    type Error = RatingError;
    fn try_from(value: u8) -> Result<Self, Self::Error> { Self::new(i64::from(value)) }
}

impl From<Stars> for u8 {
    fn from(s: Stars) -> u8 { s.0 }
}

impl Rating {
    pub fn create(product_id: ProductId, user_id: UserId, rating: Stars, review: String, user_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: RatingId::for_pair(&product_id, &user_id), product_id, user_id, rating,
            review, user_name, created_at: now, updated_at: now,
        }
    }

    pub fn id(&self) -> RatingId { self.id }
    pub fn product_id(&self) -> ProductId { self.product_id }
    pub fn user_id(&self) -> UserId { self.user_id }
    pub fn stars(&self) -> Stars { self.rating }
    pub fn review(&self) -> &str { &self.review }
    pub fn user_name(&self) -> &str { &self.user_name }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Resubmission overwrites score and review in place; the author name snapshot is kept.
    pub fn resubmit(&mut self, rating: Stars, review: String) {
        self.rating = rating;
        self.review = review;
        self.updated_at = Utc::now();
    }
}

/// Mean score rounded to one decimal, plus the count. Empty input yields 0/0.
pub fn summarize<'a>(ratings: impl IntoIterator<Item = &'a Rating>) -> (Decimal, u32) {
    let (sum, count) = ratings.into_iter().fold((0u64, 0u32), |(sum, n), r| (sum + u64::from(r.rating.value()), n + 1));
    if count == 0 { return (Decimal::ZERO, 0); }
    let mean = Decimal::from(sum) / Decimal::from(count);
    (mean.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero), count)
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum RatingError { OutOfRange(i64) }
impl std::error::Error for RatingError {}
impl std::fmt::Display for RatingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::OutOfRange(_) => write!(f, "Rating must be between 1 and 5") }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rated(stars: i64) -> Rating {
        Rating::create(ProductId::new(), UserId::new(), Stars::new(stars).unwrap(), String::new(), "Asha".into())
    }

    #[test]
    fn test_stars_range() {
        assert!(Stars::new(0).is_err());
        assert!(Stars::new(6).is_err());
        assert!(Stars::new(-1).is_err());
        assert_eq!(Stars::new(5).unwrap().value(), 5);
    }

    #[test]
    fn test_id_is_stable_per_pair() {
        let (p, u) = (ProductId::new(), UserId::new());
        assert_eq!(RatingId::for_pair(&p, &u), RatingId::for_pair(&p, &u));
        assert_ne!(RatingId::for_pair(&p, &u), RatingId::for_pair(&p, &UserId::new()));
    }

    #[test]
    fn test_summary_rounds_to_one_decimal() {
        let ratings = [rated(5), rated(4), rated(4)];
        let (avg, total) = summarize(&ratings);
        assert_eq!(total, 3);
        assert_eq!(avg, Decimal::new(43, 1));
        let none: [Rating; 0] = [];
        assert_eq!(summarize(&none), (Decimal::ZERO, 0));
    }

    #[test]
    fn test_resubmit_overwrites() {
        let mut r = rated(2);
        r.resubmit(Stars::new(5).unwrap(), "Much better".into());
        assert_eq!(r.stars().value(), 5);
        assert_eq!(r.review(), "Much better");
    }
}
