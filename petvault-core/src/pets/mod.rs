//! Pet records: the document-store boundary and the session-scoped service.

mod rest;
mod service;

use async_trait::async_trait;
use petvault_common::{Pet, PetDraft, PetUpdate};

pub use rest::RestPetStore;
pub use service::PetService;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PetError {
    #[error("User not authenticated")]
    NotAuthenticated,
    #[error("Pet not found")]
    NotFound,
    #[error("Unauthorized")]
    Forbidden,
    #[error("A pet with this name already exists")]
    DuplicateName,
    #[error("Network error occurred. Please check your connection")]
    Network(String),
    #[error("Unexpected pet store error: {0}")]
    Unknown(String),
}

/// Remote document store for pet records. Every operation is scoped to an
/// owner uid; the store never returns another owner's records.
#[async_trait]
pub trait PetStore: Send + Sync {
    async fn list(&self, owner_id: &str) -> Result<Vec<Pet>, PetError>;

    async fn get(&self, owner_id: &str, id: &str) -> Result<Pet, PetError>;

    async fn create(&self, owner_id: &str, draft: PetDraft) -> Result<Pet, PetError>;

    async fn update(&self, owner_id: &str, id: &str, update: PetUpdate) -> Result<Pet, PetError>;

    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), PetError>;
}
