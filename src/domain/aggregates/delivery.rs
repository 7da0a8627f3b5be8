//! Delivery staff and product categories managed from the back-office.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{CategoryId, DeliveryPersonId, OrderId};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPerson {
    id: DeliveryPersonId,
    name: String,
    email: String,
    phone: String,
    address: String,
    is_active: bool,
    assigned_orders: Vec<OrderId>,
    created_at: DateTime<Utc>,
}

/// Contact fields of a delivery person.
#[derive(Clone, Debug)] pub struct ContactDetails { pub name: String, pub email: String, pub phone: String, pub address: String }

impl DeliveryPerson {
    pub fn create(contact: ContactDetails) -> Self {
        Self {
            id: DeliveryPersonId::new(), name: contact.name, email: contact.email.trim().to_lowercase(),
            phone: contact.phone, address: contact.address, is_active: true, assigned_orders: vec![], created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> DeliveryPersonId { self.id }
    pub fn email(&self) -> &str { &self.email }
    pub fn is_active(&self) -> bool { self.is_active }
    pub fn assigned_orders(&self) -> &[OrderId] { &self.assigned_orders }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn update(&mut self, contact: ContactDetails, is_active: Option<bool>) {
        self.name = contact.name;
        self.email = contact.email.trim().to_lowercase();
        self.phone = contact.phone;
        self.address = contact.address;
        if let Some(active) = is_active { self.is_active = active; }
    }

    /// Set semantics: returns false when the order was already assigned.
    pub fn assign(&mut self, order_id: OrderId) -> bool {
        if self.assigned_orders.contains(&order_id) { return false; }
        self.assigned_orders.push(order_id);
        true
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    id: CategoryId,
    name: String,
    description: String,
    image: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl Category {
    pub fn create(name: impl Into<String>, description: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(), name: name.into().trim().to_string(), description: description.into(),
            image: image.into(), is_active: true, created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> CategoryId { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Unique-name comparison ignores case and surrounding whitespace.
    pub fn has_name(&self, name: &str) -> bool { self.name.eq_ignore_ascii_case(name.trim()) }

    pub fn update(&mut self, name: Option<String>, description: Option<String>, image: Option<String>, is_active: Option<bool>) {
        if let Some(name) = name { self.name = name.trim().to_string(); }
        if let Some(description) = description { self.description = description; }
        if let Some(image) = image { self.image = image; }
        if let Some(active) = is_active { self.is_active = active; }
    }
}
