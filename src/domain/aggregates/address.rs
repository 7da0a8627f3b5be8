//! Address Aggregate

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::value_objects::{AddressId, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    #[validate(length(min = 1))] pub first_name: String,
    #[validate(length(min = 1))] pub last_name: String,
    #[validate(email)] pub email: String,
    #[validate(length(min = 1))] pub street: String,
    #[validate(length(min = 1))] pub city: String,
    #[validate(length(min = 1))] pub state: String,
    #[validate(length(min = 1))] pub zipcode: String,
    #[validate(length(min = 1))] pub country: String,
    #[validate(length(min = 5))] pub phone: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    id: AddressId,
    user_id: UserId,
    #[serde(flatten)]
    postal: PostalAddress,
}

impl Address {
    pub fn new(user_id: UserId, postal: PostalAddress) -> Self { Self { id: AddressId::new(), user_id, postal } }
    pub fn id(&self) -> AddressId { self.id }
    pub fn user_id(&self) -> UserId { self.user_id }
    pub fn postal(&self) -> &PostalAddress { &self.postal }
    pub fn is_owned_by(&self, user_id: &UserId) -> bool { self.user_id == *user_id }
}

/// Selection after `deleted` is removed: unchanged unless the deleted address
/// was selected, in which case the first remaining address or none.
pub fn fallback_selection(remaining: &[Address], deleted: AddressId, selected: Option<AddressId>) -> Option<AddressId> {
    match selected {
        Some(id) if id == deleted => remaining.first().map(Address::id),
        other => other,
    }
}

#[cfg(test)]
pub(crate) fn sample_postal() -> PostalAddress {
    PostalAddress {
        first_name: "Asha".into(), last_name: "Rao".into(), email: "asha@example.com".into(),
        street: "12 MG Road".into(), city: "Pune".into(), state: "MH".into(), zipcode: "411001".into(),
        country: "India".into(), phone: "9876543210".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_selection() {
        let user = UserId::new();
        let (a, b) = (Address::new(user, sample_postal()), Address::new(user, sample_postal()));
        let deleted = AddressId::new();
        assert_eq!(fallback_selection(&[a.clone(), b.clone()], deleted, Some(deleted)), Some(a.id()));
        assert_eq!(fallback_selection(&[], deleted, Some(deleted)), None);
        assert_eq!(fallback_selection(&[a.clone()], deleted, Some(b.id())), Some(b.id()));
        assert_eq!(fallback_selection(&[a], deleted, None), None);
    }

    #[test]
    fn test_postal_validation() {
        let mut postal = sample_postal();
        assert!(postal.validate().is_ok());
        postal.email = "not-an-email".into();
        assert!(postal.validate().is_err());
    }

    #[test]
    fn test_flattened_document() {
        let addr = Address::new(UserId::new(), sample_postal());
        let json = serde_json::to_value(&addr).unwrap();
        assert_eq!(json["city"], "Pune");
        assert_eq!(json["userId"], addr.user_id().to_string());
    }
}
