//! Product catalog for the storefront and the seller console.

use crate::auth::Principal;
use crate::domain::aggregates::{Product, ProductDetails};
use crate::domain::value_objects::ProductId;
use crate::error::{Result, ServiceError};
use crate::services::parse_id;
use crate::store::Repository;

#[derive(Clone)]
pub struct CatalogService {
    repo: Repository,
}

impl CatalogService {
    pub fn new(repo: Repository) -> Self { Self { repo } }

    pub async fn add(&self, principal: &Principal, details: ProductDetails, images: Vec<String>) -> Result<Product> {
        principal.require_seller()?;
        let product = Product::create(details, images)?;
        self.repo.insert(&product).await?;
        tracing::info!(product_id = %product.id(), name = product.name(), "Product added");
        Ok(product)
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<Product>> {
        let mut products = self.repo.all::<Product>().await?;
        products.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(products)
    }

    pub async fn get(&self, product_id: &str) -> Result<Product> {
        let id: ProductId = parse_id(product_id, "Product")?;
        self.repo.find(&id).await?.ok_or_else(|| ServiceError::not_found("Product"))
    }

    pub async fn set_stock(&self, principal: &Principal, product_id: &str, in_stock: bool) -> Result<Product> {
        principal.require_seller()?;
        let id: ProductId = parse_id(product_id, "Product")?;
        let (product, ()) = self
            .repo
            .update::<Product, _, _>(&id, move |p| p.set_in_stock(in_stock))
            .await?
            .ok_or_else(|| ServiceError::not_found("Product"))?;
        Ok(product)
    }

    /// Replaces catalog fields. Existing orders keep their frozen amounts.
    pub async fn edit(&self, principal: &Principal, product_id: &str, details: ProductDetails, images: Option<Vec<String>>) -> Result<Product> {
        principal.require_seller()?;
        let id: ProductId = parse_id(product_id, "Product")?;
        let product = self
            .repo
            .try_update::<Product, _, _>(&id, move |p| p.edit(details, images))
            .await?
            .ok_or_else(|| ServiceError::not_found("Product"))??;
        tracing::info!(product_id = %id, "Product updated");
        Ok(product)
    }

    /// Carts and past orders may still reference the product; totals skip it
    /// and order views show it as unavailable.
    pub async fn delete(&self, principal: &Principal, product_id: &str) -> Result<()> {
        principal.require_seller()?;
        let id: ProductId = parse_id(product_id, "Product")?;
        if !self.repo.delete::<Product>(&id).await? {
            return Err(ServiceError::not_found("Product"));
        }
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }
}
