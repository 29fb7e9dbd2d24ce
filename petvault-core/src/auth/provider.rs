//! Identity provider boundary.
//!
//! The provider owns the remote notion of the session: credentials exchange,
//! the profile record in the document store, and a change stream that fires
//! whenever the session changes (sign-in, sign-out, external expiry).

use async_trait::async_trait;
use petvault_common::{Identity, UserProfile};
use tokio::sync::broadcast;

use super::error::AuthError;

/// A session change pushed by the provider. `None` means signed out.
pub type AuthStateChange = Option<Identity>;

/// Success payload of sign-in and sign-up.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub identity: Identity,
    pub profile: UserProfile,
}

/// Remote identity provider operations.
///
/// `current_user_profile` returns `Ok(None)` both when no identity is active
/// and when the active identity has no profile record; a missing record is
/// an expected condition, not an error.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str)
        -> Result<AuthenticatedUser, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthenticatedUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn current_user_profile(&self) -> Result<Option<UserProfile>, AuthError>;

    /// Subscribe to session change notifications. Subscriptions are
    /// additive; dropping the receiver unsubscribes. Implementations may
    /// push the current state immediately after a subscription is created;
    /// consumers must treat repeated notifications as idempotent.
    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;
}

/// Access to the provider's current bearer token, for sibling services that
/// call the document store on behalf of the signed-in user.
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> Option<String>;
}
