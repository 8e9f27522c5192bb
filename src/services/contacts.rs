use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::domain::aggregates::{Contact, User};
use crate::error::{AppError, Result};
use crate::store::Store;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactRequest {
    #[serde(rename = "type")]
    #[validate(length(min = 1))]
    pub kind: String,
    #[validate(length(min = 1))]
    pub value: String,
}

/// Per-user contact directory. Every call is scoped to the caller.
pub struct ContactService {
    store: Arc<dyn Store>,
}

impl ContactService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, user: &User) -> Result<Vec<Contact>> {
        let mut tx = self.store.begin().await?;
        tx.list_contacts(user.id).await
    }

    pub async fn create(&self, user: &User, req: &ContactRequest) -> Result<Contact> {
        req.validate()?;
        let mut tx = self.store.begin().await?;
        let contact = tx.insert_contact(user.id, &req.kind, &req.value).await?;
        tx.commit().await?;
        Ok(contact)
    }

    /// Deletes the caller's contacts matching both type and value.
    pub async fn delete(&self, user: &User, req: &ContactRequest) -> Result<u64> {
        req.validate()?;
        let mut tx = self.store.begin().await?;
        let deleted = tx.delete_contacts(user.id, &req.kind, &req.value).await?;
        if deleted == 0 {
            return Err(AppError::not_found("contact", &req.kind));
        }
        tx.commit().await?;
        tracing::debug!(user_id = user.id, deleted, "Contacts deleted");
        Ok(deleted)
    }
}
