//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Money, ProductId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    name: String,
    description: Vec<String>,
    category: String,
    price: Money,
    offer_price: Money,
    images: Vec<String>,
    in_stock: bool,
    best_seller: bool,
    #[serde(with = "rust_decimal::serde::float")]
    average_rating: Decimal,
    total_ratings: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Mutable catalog fields supplied by the seller console.
#[derive(Clone, Debug)]
pub struct ProductDetails {
    pub name: String,
    pub description: Vec<String>,
    pub category: String,
    pub price: Money,
    pub offer_price: Money,
    pub best_seller: bool,
}

impl ProductDetails {
    fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() { return Err(ProductError::MissingName); }
        if self.price.is_negative() || self.offer_price.is_negative() { return Err(ProductError::NegativePrice); }
        if self.offer_price > self.price { return Err(ProductError::OfferAbovePrice); }
        Ok(())
    }
}

impl Product {
    pub fn create(details: ProductDetails, images: Vec<String>) -> Result<Self, ProductError> {
        details.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: ProductId::new(), name: details.name, description: details.description,
            category: details.category, price: details.price, offer_price: details.offer_price,
            images, in_stock: true, best_seller: details.best_seller,
            average_rating: Decimal::ZERO, total_ratings: 0, created_at: now, updated_at: now,
        })
    }

    pub fn id(&self) -> ProductId { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn category(&self) -> &str { &self.category }
    pub fn price(&self) -> Money { self.price }
    pub fn offer_price(&self) -> Money { self.offer_price }
    pub fn images(&self) -> &[String] { &self.images }
    pub fn primary_image(&self) -> Option<&str> { self.images.first().map(String::as_str) }
    pub fn is_in_stock(&self) -> bool { self.in_stock }
    pub fn average_rating(&self) -> Decimal { self.average_rating }
    pub fn total_ratings(&self) -> u32 { self.total_ratings }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Replaces catalog fields. Images are only replaced when provided.
    pub fn edit(&mut self, details: ProductDetails, images: Option<Vec<String>>) -> Result<(), ProductError> {
        details.validate()?;
        self.name = details.name;
        self.description = details.description;
        self.category = details.category;
        self.price = details.price;
        self.offer_price = details.offer_price;
        self.best_seller = details.best_seller;
        if let Some(images) = images { self.images = images; }
        self.touch();
        Ok(())
    }

    pub fn set_in_stock(&mut self, in_stock: bool) { self.in_stock = in_stock; self.touch(); }

    pub fn set_rating_summary(&mut self, average: Decimal, total: u32) {
        self.average_rating = average;
        self.total_ratings = total;
        self.touch();
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum ProductError { MissingName, NegativePrice, OfferAbovePrice }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Product name is required"),
            Self::NegativePrice => write!(f, "Prices cannot be negative"),
            Self::OfferAbovePrice => write!(f, "Offer price cannot exceed price"),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_details(name: &str, price: i64, offer_price: i64) -> ProductDetails {
    ProductDetails {
        name: name.into(), description: vec!["Fresh".into()], category: "Vegetables".into(),
        price: Money::from_major(price), offer_price: Money::from_major(offer_price), best_seller: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_create() {
        let p = Product::create(sample_details("Potato 500g", 25, 20), vec!["potato.png".into()]).unwrap();
        assert_eq!(p.name(), "Potato 500g");
        assert!(p.is_in_stock());
        assert_eq!(p.total_ratings(), 0);
        assert_eq!(p.primary_image(), Some("potato.png"));
    }

    #[test]
    fn test_offer_price_cannot_exceed_price() {
        let err = Product::create(sample_details("Tomato", 10, 12), vec![]).unwrap_err();
        assert_eq!(err, ProductError::OfferAbovePrice);
    }

    #[test]
    fn test_edit_keeps_images_when_absent() {
        let mut p = Product::create(sample_details("Onion", 30, 25), vec!["onion.png".into()]).unwrap();
        p.edit(sample_details("Red Onion", 30, 22), None).unwrap();
        assert_eq!(p.name(), "Red Onion");
        assert_eq!(p.offer_price(), Money::from_major(22));
        assert_eq!(p.images(), ["onion.png".to_string()]);
    }
}
