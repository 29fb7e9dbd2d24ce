//! PetVault Common Types
//!
//! Shared types used by the client core and any UI shell on top of it.

pub mod pet;
pub mod user;

pub use pet::{Pet, PetDraft, PetUpdate};
pub use user::{Identity, UserProfile, UserRole};
