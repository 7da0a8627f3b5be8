//! User Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::cart::Cart;
use crate::domain::value_objects::UserId;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: UserId,
    name: String,
    email: String,
    password: String,
    #[serde(default)]
    cart_items: Cart,
    #[serde(default)]
    is_blocked: bool,
    created_at: DateTime<Utc>,
}

impl User {
    /// `password_hash` must already be hashed; this type never sees plain text.
    pub fn register(name: impl Into<String>, email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: UserId::new(), name: name.into(), email: email.into().trim().to_lowercase(),
            password: password_hash.into(), cart_items: Cart::new(), is_blocked: false, created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> UserId { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn email(&self) -> &str { &self.email }
    pub fn cart(&self) -> &Cart { &self.cart_items }
    pub fn is_blocked(&self) -> bool { self.is_blocked }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn replace_cart(&mut self, cart: Cart) { self.cart_items = cart; }
    pub fn clear_cart(&mut self) { self.cart_items.clear(); }
    pub fn set_blocked(&mut self, blocked: bool) { self.is_blocked = blocked; }
}

/// Public projection of a user. The password hash is never exposed.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub cart_items: Cart,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id, name: u.name.clone(), email: u.email.clone(), cart_items: u.cart_items.clone(),
            is_blocked: u.is_blocked, created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_hides_password() {
        let user = User::register("Asha", " Asha@Example.com ", "$argon2id$hash");
        assert_eq!(user.email(), "asha@example.com");
        let json = serde_json::to_value(UserView::from(&user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["isBlocked"], false);
    }

    #[test]
    fn test_missing_cart_defaults_empty() {
        let user = User::register("Ravi", "ravi@example.com", "hash");
        let mut doc = serde_json::to_value(&user).unwrap();
        doc.as_object_mut().unwrap().remove("cartItems");
        let back: User = serde_json::from_value(doc).unwrap();
        assert!(back.cart().is_empty());
    }
}
