//! Local session cache.
//!
//! A small key-value store persisting the last reconciled identity/profile
//! pair across restarts. The pair is atomic: readers never observe one half
//! without the other.

mod sqlite;

use petvault_common::{Identity, UserProfile};

pub use sqlite::SqliteSessionCache;

/// A persisted identity/profile pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSession {
    pub identity: Identity,
    pub profile: UserProfile,
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Persistent store for the session pair. Write paths must keep the pair
/// atomic; a lone identity or lone profile on disk is corruption.
pub trait SessionCache: Send + Sync {
    /// Load the cached pair. Corrupt or partial entries are cleared and
    /// reported as absent.
    fn load(&self) -> Result<Option<CachedSession>, CacheError>;

    /// Persist the pair as one logical write.
    fn save(&self, identity: &Identity, profile: &UserProfile) -> Result<(), CacheError>;

    /// Remove both halves of the pair.
    fn clear(&self) -> Result<(), CacheError>;
}
