//! REST implementation of the identity provider boundary.
//!
//! Talks to the PetVault identity backend: credential exchange under
//! `/v1/auth/*` and profile records under `/v1/users/{uid}`. The active
//! bearer token lives here; session changes are pushed on a broadcast
//! channel as soon as the credential layer settles, so the reconciler
//! observes the same ordering the backend does.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use petvault_common::{Identity, UserProfile, UserRole};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::error::AuthError;
use super::provider::{AuthStateChange, AuthenticatedUser, IdentityProvider, TokenSource};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Client for the PetVault identity backend.
pub struct RestIdentityProvider {
    http_client: Client,
    base_url: String,
    session: RwLock<Option<ActiveSession>>,
    changes: broadcast::Sender<AuthStateChange>,
}

#[derive(Debug, Clone)]
struct ActiveSession {
    token: String,
    identity: Identity,
}

#[derive(Debug, Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    display_name: &'a str,
}

/// Response of both credential endpoints.
#[derive(Debug, Deserialize)]
struct CredentialResponse {
    token: String,
    user: Identity,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    code: String,
    #[serde(default)]
    message: String,
}

impl RestIdentityProvider {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Build with a preconfigured HTTP client (timeouts, proxies).
    pub fn with_client(http_client: Client, base_url: &str) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
            changes,
        }
    }

    fn notify(&self, change: AuthStateChange) {
        // No receivers is fine; the reconciler may not be attached yet.
        let _ = self.changes.send(change);
    }

    fn set_session(&self, token: String, identity: Identity) {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        *session = Some(ActiveSession { token, identity });
    }

    fn clear_session(&self) {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        *session = None;
    }

    fn active_session(&self) -> Option<ActiveSession> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Exchange credentials at an auth endpoint and install the session.
    async fn exchange_credentials<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Identity, AuthError> {
        let response = self
            .http_client
            .post(format!("{}/v1/auth/{}", self.base_url, endpoint))
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let credentials: CredentialResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unknown(format!("malformed credential response: {e}")))?;

        let identity = credentials.user.clone();
        self.set_session(credentials.token, credentials.user);
        self.notify(Some(identity.clone()));
        Ok(identity)
    }

    async fn fetch_profile(&self, token: &str, uid: &str) -> Result<Option<UserProfile>, AuthError> {
        let response = self
            .http_client
            .get(format!("{}/v1/users/{}", self.base_url, uid))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::warn!(uid = %uid, "no profile record for active identity");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let profile: UserProfile = response
            .json()
            .await
            .map_err(|e| AuthError::Unknown(format!("malformed profile record: {e}")))?;
        Ok(Some(profile))
    }

    /// Record the server-side last-login timestamp. Best effort.
    async fn touch_last_login(&self, token: &str, uid: &str) {
        let result = self
            .http_client
            .post(format!("{}/v1/users/{}/last-login", self.base_url, uid))
            .bearer_auth(token)
            .send()
            .await;
        match result {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(uid = %uid, status = %response.status(), "last-login update rejected");
            }
            Err(e) => {
                tracing::warn!(uid = %uid, error = %e, "last-login update failed");
            }
            Ok(_) => {}
        }
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let identity = self
            .exchange_credentials("sign-in", &SignInRequest { email, password })
            .await?;

        let session = self
            .active_session()
            .ok_or_else(|| AuthError::Unknown("session lost after sign-in".to_string()))?;

        let profile = self
            .fetch_profile(&session.token, &identity.uid)
            .await?
            .ok_or(AuthError::UserDataNotFound)?;

        self.touch_last_login(&session.token, &identity.uid).await;

        Ok(AuthenticatedUser { identity, profile })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let identity = self
            .exchange_credentials(
                "sign-up",
                &SignUpRequest {
                    email,
                    password,
                    display_name,
                },
            )
            .await?;

        let session = self
            .active_session()
            .ok_or_else(|| AuthError::Unknown("session lost after sign-up".to_string()))?;

        let now = Utc::now();
        let profile = UserProfile {
            uid: identity.uid.clone(),
            email: identity.email.clone(),
            display_name: display_name.to_string(),
            role: UserRole::User,
            created_at: now,
            updated_at: now,
            last_login_at: now,
        };

        let response = self
            .http_client
            .put(format!("{}/v1/users/{}", self.base_url, identity.uid))
            .bearer_auth(&session.token)
            .json(&profile)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(AuthenticatedUser { identity, profile })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.active_session() {
            let response = self
                .http_client
                .post(format!("{}/v1/auth/sign-out", self.base_url))
                .bearer_auth(&session.token)
                .send()
                .await
                .map_err(|e| AuthError::Network(e.to_string()))?;

            if !response.status().is_success() {
                return Err(error_from_response(response).await);
            }
        }

        self.clear_session();
        self.notify(None);
        Ok(())
    }

    async fn current_user_profile(&self) -> Result<Option<UserProfile>, AuthError> {
        match self.active_session() {
            Some(session) => self.fetch_profile(&session.token, &session.identity.uid).await,
            None => Ok(None),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        let receiver = self.changes.subscribe();
        // Snapshot-then-follow: a new subscriber learns the current session
        // right away. Other subscribers see a duplicate of their last
        // notification, which reconciliation absorbs.
        self.notify(self.active_session().map(|s| s.identity));
        receiver
    }
}

impl TokenSource for RestIdentityProvider {
    fn access_token(&self) -> Option<String> {
        self.active_session().map(|s| s.token)
    }
}

/// Translate a non-2xx response into an `AuthError`, falling back to the
/// HTTP status when the body is not the structured error shape.
async fn error_from_response(response: Response) -> AuthError {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => AuthError::from_code(&body.error.code, &body.error.message),
        Err(_) => AuthError::Unknown(format!("HTTP {status}")),
    }
}
