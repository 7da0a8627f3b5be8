//! Back-office management of categories, delivery staff and users.

use crate::auth::Principal;
use crate::domain::aggregates::{Category, ContactDetails, DeliveryPerson, User, UserView};
use crate::domain::value_objects::{CategoryId, DeliveryPersonId, UserId};
use crate::error::{Result, ServiceError};
use crate::services::parse_id;
use crate::store::Repository;

#[derive(Debug, Clone, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct AdminService {
    repo: Repository,
}

impl AdminService {
    pub fn new(repo: Repository) -> Self { Self { repo } }

    // Categories

    pub async fn categories(&self, principal: &Principal) -> Result<Vec<Category>> {
        principal.require_admin()?;
        let mut all = self.repo.all::<Category>().await?;
        all.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(all)
    }

    pub async fn add_category(&self, principal: &Principal, name: &str, description: &str, image: &str) -> Result<Category> {
        principal.require_admin()?;
        if name.trim().is_empty() {
            return Err(ServiceError::invalid("Category name is required"));
        }
        if self.repo.find_where::<Category>(|c| c.has_name(name)).await?.into_iter().next().is_some() {
            return Err(ServiceError::Conflict("Category already exists".to_string()));
        }
        let category = Category::create(name.trim(), description, image);
        self.repo.insert(&category).await?;
        tracing::info!(category_id = %category.id(), name = category.name(), "Category added");
        Ok(category)
    }

    pub async fn update_category(&self, principal: &Principal, category_id: &str, changes: CategoryChanges) -> Result<Category> {
        principal.require_admin()?;
        let id: CategoryId = parse_id(category_id, "Category")?;
        if let Some(name) = changes.name.as_deref() {
            let taken = self.repo.find_where::<Category>(|c| c.id() != id && c.has_name(name)).await?;
            if !taken.is_empty() {
                return Err(ServiceError::Conflict("Category already exists".to_string()));
            }
        }
        let CategoryChanges { name, description, image, is_active } = changes;
        let (category, ()) = self
            .repo
            .update::<Category, _, _>(&id, move |c| c.update(name, description, image, is_active))
            .await?
            .ok_or_else(|| ServiceError::not_found("Category"))?;
        Ok(category)
    }

    pub async fn delete_category(&self, principal: &Principal, category_id: &str) -> Result<()> {
        principal.require_admin()?;
        let id: CategoryId = parse_id(category_id, "Category")?;
        if !self.repo.delete::<Category>(&id).await? {
            return Err(ServiceError::not_found("Category"));
        }
        Ok(())
    }

    // Delivery staff

    pub async fn delivery_persons(&self, principal: &Principal) -> Result<Vec<DeliveryPerson>> {
        principal.require_admin()?;
        let mut all = self.repo.all::<DeliveryPerson>().await?;
        all.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(all)
    }

    pub async fn add_delivery_person(&self, principal: &Principal, contact: ContactDetails) -> Result<DeliveryPerson> {
        principal.require_admin()?;
        self.ensure_unique_email(&contact.email, None).await?;
        let person = DeliveryPerson::create(contact);
        self.repo.insert(&person).await?;
        tracing::info!(delivery_person_id = %person.id(), "Delivery person added");
        Ok(person)
    }

    pub async fn update_delivery_person(
        &self,
        principal: &Principal,
        delivery_person_id: &str,
        contact: ContactDetails,
        is_active: Option<bool>,
    ) -> Result<DeliveryPerson> {
        principal.require_admin()?;
        let id: DeliveryPersonId = parse_id(delivery_person_id, "Delivery person")?;
        self.ensure_unique_email(&contact.email, Some(id)).await?;
        let (person, ()) = self
            .repo
            .update::<DeliveryPerson, _, _>(&id, move |d| d.update(contact, is_active))
            .await?
            .ok_or_else(|| ServiceError::not_found("Delivery person"))?;
        Ok(person)
    }

    pub async fn delete_delivery_person(&self, principal: &Principal, delivery_person_id: &str) -> Result<()> {
        principal.require_admin()?;
        let id: DeliveryPersonId = parse_id(delivery_person_id, "Delivery person")?;
        if !self.repo.delete::<DeliveryPerson>(&id).await? {
            return Err(ServiceError::not_found("Delivery person"));
        }
        Ok(())
    }

    async fn ensure_unique_email(&self, email: &str, except: Option<DeliveryPersonId>) -> Result<()> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ServiceError::invalid("All fields are required"));
        }
        let taken = self.repo.find_where::<DeliveryPerson>(|d| d.email() == email && Some(d.id()) != except).await?;
        if taken.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Conflict("Delivery person with this email already exists".to_string()))
        }
    }

    // Users

    /// Newest first, without password hashes.
    pub async fn users(&self, principal: &Principal) -> Result<Vec<UserView>> {
        principal.require_admin()?;
        let mut users = self.repo.all::<User>().await?;
        users.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(users.iter().map(UserView::from).collect())
    }

    pub async fn delete_user(&self, principal: &Principal, user_id: &str) -> Result<()> {
        principal.require_admin()?;
        let id: UserId = parse_id(user_id, "User")?;
        if !self.repo.delete::<User>(&id).await? {
            return Err(ServiceError::not_found("User"));
        }
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }

    pub async fn set_blocked(&self, principal: &Principal, user_id: &str, blocked: bool) -> Result<UserView> {
        principal.require_admin()?;
        let id: UserId = parse_id(user_id, "User")?;
        let (user, ()) = self
            .repo
            .update::<User, _, _>(&id, move |u| u.set_blocked(blocked))
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        tracing::info!(user_id = %id, blocked, "User block flag changed");
        Ok(UserView::from(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn admin() -> Principal { Principal::new("admin", Role::Admin) }

    fn contact(email: &str) -> ContactDetails {
        ContactDetails { name: "Kiran".into(), email: email.into(), phone: "99999".into(), address: "Depot 4".into() }
    }

    #[tokio::test]
    async fn test_category_names_are_unique() {
        let admin_svc = AdminService::new(Repository::in_memory());
        let fruits = admin_svc.add_category(&admin(), "Fruits", "", "").await.unwrap();
        let err = admin_svc.add_category(&admin(), " fruits ", "", "").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let veg = admin_svc.add_category(&admin(), "Vegetables", "", "").await.unwrap();
        let rename = CategoryChanges { name: Some("Fruits".into()), ..Default::default() };
        assert!(matches!(admin_svc.update_category(&admin(), &veg.id().to_string(), rename).await, Err(ServiceError::Conflict(_))));

        let keep = CategoryChanges { name: Some("Fruits".into()), is_active: Some(false), ..Default::default() };
        admin_svc.update_category(&admin(), &fruits.id().to_string(), keep).await.unwrap();
        admin_svc.delete_category(&admin(), &veg.id().to_string()).await.unwrap();
        assert_eq!(admin_svc.categories(&admin()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_person_email_is_unique() {
        let admin_svc = AdminService::new(Repository::in_memory());
        let kiran = admin_svc.add_delivery_person(&admin(), contact("kiran@example.com")).await.unwrap();
        let err = admin_svc.add_delivery_person(&admin(), contact("KIRAN@example.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let updated = admin_svc
            .update_delivery_person(&admin(), &kiran.id().to_string(), contact("kiran@example.com"), Some(false))
            .await
            .unwrap();
        assert!(!updated.is_active());
    }

    #[tokio::test]
    async fn test_user_management() {
        let repo = Repository::in_memory();
        let admin_svc = AdminService::new(repo.clone());
        let user = User::register("Ravi", "ravi@example.com", "$2b$10$hash");
        repo.insert(&user).await.unwrap();

        let listed = admin_svc.users(&admin()).await.unwrap();
        let json = serde_json::to_value(&listed).unwrap();
        assert!(json[0].get("password").is_none());

        let view = admin_svc.set_blocked(&admin(), &user.id().to_string(), true).await.unwrap();
        assert!(view.is_blocked);

        let shopper = Principal::new(user.id().to_string(), Role::User);
        assert!(matches!(admin_svc.users(&shopper).await, Err(ServiceError::Unauthorized(_))));

        admin_svc.delete_user(&admin(), &user.id().to_string()).await.unwrap();
        assert!(matches!(admin_svc.delete_user(&admin(), &user.id().to_string()).await, Err(ServiceError::NotFound(_))));
    }
}
