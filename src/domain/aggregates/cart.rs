//! Cart Aggregate
//!
//! A cart is the productId -> quantity mapping owned by a user. Quantities are
//! always positive; an entry that would drop to zero is removed instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Money, ProductId, Quantity};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: BTreeMap<ProductId, Quantity>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    /// Builds a cart from a client snapshot, dropping non-positive quantities.
    pub fn from_snapshot(snapshot: impl IntoIterator<Item = (ProductId, i64)>) -> Self {
        let items = snapshot
            .into_iter()
            .filter_map(|(id, qty)| Quantity::from_signed(qty).map(|q| (id, q)))
            .collect();
        Self { items }
    }

    pub fn quantity_of(&self, product_id: &ProductId) -> u32 {
        self.items.get(product_id).map(Quantity::value).unwrap_or(0)
    }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn add_item(&mut self, product_id: ProductId) {
        self.items
            .entry(product_id)
            .and_modify(|q| *q = q.add(1))
            .or_insert(Quantity::ONE);
    }

    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) {
        match Quantity::from_signed(quantity) {
            Some(q) => { self.items.insert(product_id, q); }
            None => { self.items.remove(&product_id); }
        }
    }

    pub fn remove_one(&mut self, product_id: &ProductId) {
        if let Some(q) = self.items.get(product_id).copied() {
            match q.decrement() {
                Some(next) => { self.items.insert(*product_id, next); }
                None => { self.items.remove(product_id); }
            }
        }
    }

    pub fn clear(&mut self) { self.items.clear(); }

    pub fn total_count(&self) -> u64 {
        self.items.values().map(|q| u64::from(q.value())).sum()
    }

    /// Sums offer price times quantity. Entries whose product no longer
    /// resolves are skipped.
    pub fn total_amount<F>(&self, offer_price: F) -> Money
    where
        F: Fn(&ProductId) -> Option<Money>,
    {
        self.items
            .iter()
            .filter_map(|(id, q)| offer_price(id).map(|price| price.multiply(q.value())))
            .fold(Money::ZERO, |acc, line| acc.add(&line))
            .floor_cents()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_cart_operations() {
        let p1 = ProductId::new();
        let mut cart = Cart::new();
        cart.add_item(p1);
        cart.add_item(p1);
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.quantity_of(&p1), 2);
        cart.remove_one(&p1);
        assert_eq!(cart.quantity_of(&p1), 1);
        cart.remove_one(&p1);
        assert!(cart.is_empty());
        cart.remove_one(&p1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_removes_non_positive() {
        let (a, b) = (ProductId::new(), ProductId::new());
        let mut cart = Cart::from_snapshot([(a, 3), (b, 1)]);
        cart.set_quantity(a, 0);
        cart.set_quantity(b, -5);
        assert!(cart.is_empty());
        cart.set_quantity(a, 7);
        assert_eq!(cart.total_count(), 7);
    }

    #[test]
    fn test_total_amount_skips_missing_products() {
        let (a, b, gone) = (ProductId::new(), ProductId::new(), ProductId::new());
        let prices: HashMap<ProductId, Money> =
            [(a, Money::from_major(20)), (b, Money::from_major(35))].into_iter().collect();
        let cart = Cart::from_snapshot([(a, 2), (b, 1), (gone, 4)]);
        assert_eq!(cart.total_count(), 7);
        let total = cart.total_amount(|id| prices.get(id).copied());
        assert_eq!(total, Money::from_major(75));
        assert_eq!(total.with_tax(), Money::from_major(76));
    }

    #[test]
    fn test_snapshot_serialization() {
        let a = ProductId::new();
        let cart = Cart::from_snapshot([(a, 2), (ProductId::new(), 0)]);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json, serde_json::json!({ a.to_string(): 2 }));
    }
}
