//! Authentication: provider boundary, session reconciliation, authorization.

mod error;
mod provider;
mod rest;
mod session;

pub use error::AuthError;
pub use provider::{AuthStateChange, AuthenticatedUser, IdentityProvider, TokenSource};
pub use rest::RestIdentityProvider;
pub use session::{authorize, SessionManager, SessionSnapshot};
