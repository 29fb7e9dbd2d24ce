//! Session-scoped pet operations.

use std::sync::Arc;

use petvault_common::{Pet, PetDraft, PetUpdate};

use crate::auth::SessionManager;

use super::{PetError, PetStore};

/// Pet operations bound to the current session. The session identity's uid
/// is the owner key for every store call; without an authenticated session
/// no operation reaches the store.
pub struct PetService {
    store: Arc<dyn PetStore>,
    session: SessionManager,
}

impl PetService {
    pub fn new(store: Arc<dyn PetStore>, session: SessionManager) -> Self {
        Self { store, session }
    }

    async fn owner_id(&self) -> Result<String, PetError> {
        if !self.session.is_authenticated().await {
            return Err(PetError::NotAuthenticated);
        }
        self.session
            .identity()
            .await
            .map(|identity| identity.uid)
            .ok_or(PetError::NotAuthenticated)
    }

    pub async fn list(&self) -> Result<Vec<Pet>, PetError> {
        let owner_id = self.owner_id().await?;
        self.store.list(&owner_id).await
    }

    pub async fn get(&self, id: &str) -> Result<Pet, PetError> {
        let owner_id = self.owner_id().await?;
        self.store.get(&owner_id, id).await
    }

    /// Create a pet, rejecting a name the owner already uses.
    pub async fn add(&self, draft: PetDraft) -> Result<Pet, PetError> {
        let owner_id = self.owner_id().await?;

        let existing = self.store.list(&owner_id).await?;
        if existing.iter().any(|p| p.name == draft.name) {
            return Err(PetError::DuplicateName);
        }

        self.store.create(&owner_id, draft).await
    }

    /// Update a pet. A renamed pet must not collide with any of the owner's
    /// other pets.
    pub async fn update(&self, id: &str, update: PetUpdate) -> Result<Pet, PetError> {
        let owner_id = self.owner_id().await?;

        if let Some(name) = &update.name {
            let existing = self.store.list(&owner_id).await?;
            if existing.iter().any(|p| p.id != id && &p.name == name) {
                return Err(PetError::DuplicateName);
            }
        }

        self.store.update(&owner_id, id, update).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), PetError> {
        let owner_id = self.owner_id().await?;
        self.store.delete(&owner_id, id).await
    }

    /// Case-insensitive filter of the owner's pets on name or description.
    pub async fn search(&self, query: &str) -> Result<Vec<Pet>, PetError> {
        let pets = self.list().await?;
        let needle = query.to_lowercase();
        Ok(pets
            .into_iter()
            .filter(|pet| {
                pet.name.to_lowercase().contains(&needle)
                    || pet
                        .description
                        .as_ref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .collect())
    }
}
