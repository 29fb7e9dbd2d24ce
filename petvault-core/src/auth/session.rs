//! Session reconciliation.
//!
//! `SessionManager` owns the client's view of the authenticated session. On
//! startup it restores the cached identity/profile pair optimistically, then
//! follows the provider's change stream: every notification re-runs the same
//! fetch-or-clear step, so in-memory state and the local cache always
//! converge on the provider's truth. The cache is a mirror of the last
//! successful reconciliation, never an authority of its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use petvault_common::{Identity, UserProfile, UserRole};
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;

use crate::cache::SessionCache;

use super::error::AuthError;
use super::provider::{AuthStateChange, AuthenticatedUser, IdentityProvider};

/// Authorization predicate. False whenever identity or profile is absent;
/// an empty role requirement admits any authenticated session.
pub fn authorize(
    identity: Option<&Identity>,
    profile: Option<&UserProfile>,
    required: &[UserRole],
) -> bool {
    let (Some(_), Some(profile)) = (identity, profile) else {
        return false;
    };
    if required.is_empty() {
        return true;
    }
    required.contains(&profile.role)
}

/// Immutable view of the session at one instant.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub profile: Option<UserProfile>,
    pub is_loading: bool,
    pub is_initializing: bool,
    pub is_authenticated: bool,
}

/// The identity/profile pair. Only ever set or cleared together.
#[derive(Debug, Default)]
struct SessionPair {
    identity: Option<Identity>,
    profile: Option<UserProfile>,
}

struct SessionInner {
    provider: Arc<dyn IdentityProvider>,
    cache: Arc<dyn SessionCache>,
    state: RwLock<SessionPair>,
    loading: AtomicBool,
    init_tx: watch::Sender<bool>,
    init_rx: watch::Receiver<bool>,
}

/// Clears the loading flag on every exit path.
struct LoadingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> LoadingGuard<'a> {
    fn hold(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Stateful orchestrator of the authentication session.
///
/// Cheap to clone; all clones share the same state. Consumers read through
/// the accessor methods and mutate only through the action operations. Call
/// [`SessionManager::shutdown`] when discarding the manager to detach the
/// reconcile loop from the provider's change stream.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
    reconciler: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionManager {
    /// Construct the manager and begin reconciling.
    ///
    /// The cached session (if any) is applied immediately so a returning
    /// user appears signed in before the provider confirms; the first change
    /// notification then settles the real state and flips
    /// `is_initializing` to false for the lifetime of the process.
    pub async fn start(
        provider: Arc<dyn IdentityProvider>,
        cache: Arc<dyn SessionCache>,
    ) -> Self {
        let cached = match cache.load() {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read session cache; starting signed out");
                None
            }
        };

        let initial = match cached {
            Some(entry) => {
                tracing::debug!(uid = %entry.identity.uid, "restored cached session");
                SessionPair {
                    identity: Some(entry.identity),
                    profile: Some(entry.profile),
                }
            }
            None => SessionPair::default(),
        };

        let (init_tx, init_rx) = watch::channel(false);
        let inner = Arc::new(SessionInner {
            provider: provider.clone(),
            cache,
            state: RwLock::new(initial),
            loading: AtomicBool::new(false),
            init_tx,
            init_rx,
        });

        let changes = provider.subscribe();
        let handle = tokio::spawn(reconcile_loop(inner.clone(), changes));

        Self {
            inner,
            reconciler: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Detach from the provider's change stream. Idempotent.
    pub fn shutdown(&self) {
        let mut guard = self.reconciler.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }

    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let _loading = LoadingGuard::hold(&self.inner.loading);
        let authed = self.inner.provider.sign_in(email, password).await?;
        // Apply directly; the change notification will re-apply the same
        // state, which is harmless.
        self.inner
            .set_session(authed.identity.clone(), authed.profile.clone())
            .await;
        Ok(authed)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let _loading = LoadingGuard::hold(&self.inner.loading);
        let authed = self
            .inner
            .provider
            .sign_up(email, password, display_name)
            .await?;
        self.inner
            .set_session(authed.identity.clone(), authed.profile.clone())
            .await;
        Ok(authed)
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let _loading = LoadingGuard::hold(&self.inner.loading);
        self.inner.provider.sign_out().await?;
        self.inner.clear_session().await;
        Ok(())
    }

    /// Re-run fetch-or-clear for the current identity. A missing or
    /// unfetchable profile signs the session out rather than erroring.
    pub async fn refresh(&self) {
        let _loading = LoadingGuard::hold(&self.inner.loading);
        let identity = self.inner.state.read().await.identity.clone();
        match identity {
            Some(identity) => self.inner.reconcile(Some(identity)).await,
            None => self.inner.clear_session().await,
        }
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.inner.state.read().await.identity.clone()
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.inner.state.read().await.profile.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::SeqCst)
    }

    /// True until the first change notification has been processed.
    pub fn is_initializing(&self) -> bool {
        !*self.inner.init_rx.borrow()
    }

    pub async fn is_authenticated(&self) -> bool {
        let state = self.inner.state.read().await;
        state.identity.is_some() && state.profile.is_some()
    }

    pub async fn is_authorized(&self, required: &[UserRole]) -> bool {
        let state = self.inner.state.read().await;
        authorize(state.identity.as_ref(), state.profile.as_ref(), required)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.read().await;
        SessionSnapshot {
            identity: state.identity.clone(),
            profile: state.profile.clone(),
            is_loading: self.is_loading(),
            is_initializing: self.is_initializing(),
            is_authenticated: state.identity.is_some() && state.profile.is_some(),
        }
    }

    /// Wait until the first change notification has been processed.
    pub async fn initialized(&self) {
        let mut rx = self.inner.init_rx.clone();
        // Only fails if the sender is gone, which cannot outlive `inner`.
        let _ = rx.wait_for(|done| *done).await;
    }
}

async fn reconcile_loop(
    inner: Arc<SessionInner>,
    mut changes: broadcast::Receiver<AuthStateChange>,
) {
    loop {
        match changes.recv().await {
            Ok(change) => {
                inner.reconcile(change).await;
                inner.mark_initialized();
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "session change stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

impl SessionInner {
    /// The single convergence point: an identity without a fetchable profile
    /// is not a valid session.
    async fn reconcile(&self, change: AuthStateChange) {
        match change {
            Some(identity) => match self.provider.current_user_profile().await {
                Ok(Some(profile)) => self.set_session(identity, profile).await,
                Ok(None) => {
                    tracing::warn!(uid = %identity.uid, "identity has no profile record; signing out");
                    self.clear_session().await;
                }
                Err(e) => {
                    tracing::warn!(uid = %identity.uid, error = %e, "profile fetch failed; signing out");
                    self.clear_session().await;
                }
            },
            None => self.clear_session().await,
        }
    }

    async fn set_session(&self, identity: Identity, profile: UserProfile) {
        {
            let mut state = self.state.write().await;
            state.identity = Some(identity.clone());
            state.profile = Some(profile.clone());
        }
        if let Err(e) = self.cache.save(&identity, &profile) {
            tracing::warn!(error = %e, "failed to persist session cache");
        }
    }

    async fn clear_session(&self) {
        {
            let mut state = self.state.write().await;
            state.identity = None;
            state.profile = None;
        }
        if let Err(e) = self.cache.clear() {
            tracing::warn!(error = %e, "failed to clear session cache");
        }
    }

    fn mark_initialized(&self) {
        self.init_tx.send_replace(true);
    }
}
