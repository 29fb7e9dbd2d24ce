//! REST implementation of the pet document store.

use std::sync::Arc;

use async_trait::async_trait;
use petvault_common::{Pet, PetDraft, PetUpdate};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::auth::TokenSource;

use super::{PetError, PetStore};

/// Client for the PetVault document backend's `/v1/pets` collection.
/// Requests carry the current session's bearer token.
pub struct RestPetStore {
    http_client: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Debug, Deserialize)]
struct PetListResponse {
    pets: Vec<Pet>,
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

impl RestPetStore {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_client(Client::new(), base_url, tokens)
    }

    pub fn with_client(http_client: Client, base_url: &str, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn token(&self) -> Result<String, PetError> {
        self.tokens
            .access_token()
            .ok_or(PetError::NotAuthenticated)
    }
}

#[async_trait]
impl PetStore for RestPetStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Pet>, PetError> {
        let token = self.token()?;
        let response = self
            .http_client
            .get(format!("{}/v1/pets", self.base_url))
            .query(&[("ownerId", owner_id)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PetError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: PetListResponse = response
            .json()
            .await
            .map_err(|e| PetError::Unknown(format!("malformed pet list: {e}")))?;
        Ok(body.pets)
    }

    async fn get(&self, owner_id: &str, id: &str) -> Result<Pet, PetError> {
        let token = self.token()?;
        let response = self
            .http_client
            .get(format!("{}/v1/pets/{}", self.base_url, id))
            .query(&[("ownerId", owner_id)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PetError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| PetError::Unknown(format!("malformed pet record: {e}")))
    }

    async fn create(&self, owner_id: &str, draft: PetDraft) -> Result<Pet, PetError> {
        let token = self.token()?;
        let response = self
            .http_client
            .post(format!("{}/v1/pets", self.base_url))
            .query(&[("ownerId", owner_id)])
            .bearer_auth(token)
            .json(&draft)
            .send()
            .await
            .map_err(|e| PetError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| PetError::Unknown(format!("malformed pet record: {e}")))
    }

    async fn update(&self, owner_id: &str, id: &str, update: PetUpdate) -> Result<Pet, PetError> {
        let token = self.token()?;
        let response = self
            .http_client
            .patch(format!("{}/v1/pets/{}", self.base_url, id))
            .query(&[("ownerId", owner_id)])
            .bearer_auth(token)
            .json(&update)
            .send()
            .await
            .map_err(|e| PetError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| PetError::Unknown(format!("malformed pet record: {e}")))
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), PetError> {
        let token = self.token()?;
        let response = self
            .http_client
            .delete(format!("{}/v1/pets/{}", self.base_url, id))
            .query(&[("ownerId", owner_id)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| PetError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}

async fn error_from_response(response: Response) -> PetError {
    let status = response.status();
    match status {
        StatusCode::NOT_FOUND => return PetError::NotFound,
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => return PetError::Forbidden,
        _ => {}
    }
    match response.json::<ErrorBody>().await {
        Ok(body) => match body.error.code.as_str() {
            "duplicate-name" => PetError::DuplicateName,
            "not-found" => PetError::NotFound,
            "forbidden" => PetError::Forbidden,
            other => PetError::Unknown(format!("{other}: {}", body.error.message)),
        },
        Err(_) => PetError::Unknown(format!("HTTP {status}")),
    }
}
