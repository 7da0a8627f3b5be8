//! Shopper address book.

use validator::Validate;

use crate::auth::Principal;
use crate::domain::aggregates::address::fallback_selection;
use crate::domain::aggregates::{Address, PostalAddress};
use crate::domain::value_objects::AddressId;
use crate::error::{Result, ServiceError};
use crate::services::parse_id;
use crate::store::Repository;

#[derive(Clone)]
pub struct AddressService {
    repo: Repository,
}

impl AddressService {
    pub fn new(repo: Repository) -> Self { Self { repo } }

    pub async fn add(&self, principal: &Principal, postal: PostalAddress) -> Result<Address> {
        let user_id = principal.user_id()?;
        postal.validate()?;
        let address = Address::new(user_id, postal);
        self.repo.insert(&address).await?;
        tracing::debug!(address_id = %address.id(), user_id = %user_id, "Address added");
        Ok(address)
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<Address>> {
        let user_id = principal.user_id()?;
        Ok(self.repo.find_where::<Address>(|a| a.is_owned_by(&user_id)).await?)
    }

    /// Deletes an owned address and returns the selection the client should
    /// fall back to when `selected` pointed at the deleted one.
    pub async fn delete(&self, principal: &Principal, address_id: &str, selected: Option<&str>) -> Result<Option<AddressId>> {
        let user_id = principal.user_id()?;
        let id: AddressId = parse_id(address_id, "Address")?;
        let address: Address = self.repo.find(&id).await?.ok_or_else(|| ServiceError::not_found("Address"))?;
        if !address.is_owned_by(&user_id) {
            return Err(ServiceError::unauthorized("Unauthorized to delete this address"));
        }
        self.repo.delete::<Address>(&id).await?;

        let selected = selected.map(str::trim).filter(|s| !s.is_empty()).and_then(|s| s.parse().ok());
        let remaining = self.list(principal).await?;
        Ok(fallback_selection(&remaining, id, selected))
    }
}
