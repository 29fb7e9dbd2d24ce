//! PetVault client core.
//!
//! Everything the mobile shell needs below the view layer: the identity
//! provider boundary and its REST implementation, the local session cache,
//! the session reconciler that keeps both in sync, and the pet data service
//! scoped to the current session.

pub mod auth;
pub mod cache;
pub mod config;
pub mod logging;
pub mod pets;
pub mod test_util;

pub use auth::{
    authorize, AuthError, AuthenticatedUser, IdentityProvider, RestIdentityProvider,
    SessionManager, SessionSnapshot, TokenSource,
};
pub use cache::{CacheError, CachedSession, SessionCache, SqliteSessionCache};
pub use config::{ApiConfig, Config};
pub use pets::{PetError, PetService, PetStore, RestPetStore};
