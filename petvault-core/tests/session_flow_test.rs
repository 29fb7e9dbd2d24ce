//! End-to-end session lifecycle against a mocked backend: REST provider,
//! SQLite cache and the reconciler working together.

use std::sync::Arc;
use std::time::Duration;

use petvault_core::auth::{RestIdentityProvider, SessionManager};
use petvault_core::cache::{SessionCache, SqliteSessionCache};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_backend(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/auth/sign-in"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-1",
            "user": { "uid": "u1", "email": "a@b.com", "displayName": "Alice" },
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/users/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uid": "u1",
            "email": "a@b.com",
            "displayName": "Alice",
            "role": "user",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z",
            "lastLoginAt": "2024-01-01T00:00:00Z"
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/users/u1/last-login"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/sign-out"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

async fn wait_for_cache_state(cache: &SqliteSessionCache, present: bool) {
    for _ in 0..200 {
        if cache.load().unwrap().is_some() == present {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("cache never reached expected state (present = {present})");
}

#[tokio::test]
async fn test_cold_start_settles_signed_out() {
    let server = MockServer::start().await;
    mock_backend(&server).await;

    let provider = Arc::new(RestIdentityProvider::new(&server.uri()));
    let cache = Arc::new(SqliteSessionCache::new(":memory:").unwrap());

    let manager = SessionManager::start(provider, cache).await;
    manager.initialized().await;

    assert!(!manager.is_initializing());
    assert!(!manager.is_authenticated().await);
    manager.shutdown();
}

#[tokio::test]
async fn test_sign_in_then_sign_out_round_trip() {
    let server = MockServer::start().await;
    mock_backend(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db = format!("sqlite:{}", dir.path().join("session.db").display());

    let provider = Arc::new(RestIdentityProvider::new(&server.uri()));
    let cache = Arc::new(SqliteSessionCache::new(&db).unwrap());

    let manager = SessionManager::start(provider, cache.clone()).await;
    manager.initialized().await;

    manager.sign_in("a@b.com", "secret1").await.unwrap();
    assert!(manager.is_authenticated().await);
    assert!(manager.is_authorized(&[]).await);

    wait_for_cache_state(&cache, true).await;
    let entry = cache.load().unwrap().unwrap();
    assert_eq!(entry.identity.uid, "u1");
    assert_eq!(entry.profile.email, "a@b.com");

    manager.sign_out().await.unwrap();

    // The queued sign-in notification may still be reconciling; both paths
    // converge on signed-out once the final notification lands.
    for _ in 0..200 {
        if !manager.is_authenticated().await && cache.load().unwrap().is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(25)).await;
    assert!(!manager.is_authenticated().await);
    assert!(cache.load().unwrap().is_none());
    manager.shutdown();
}

#[tokio::test]
async fn test_restart_with_stale_cache_reconciles_to_signed_out() {
    let server = MockServer::start().await;
    mock_backend(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db = format!("sqlite:{}", dir.path().join("session.db").display());

    // First run signs in and persists the session pair.
    {
        let provider = Arc::new(RestIdentityProvider::new(&server.uri()));
        let cache = Arc::new(SqliteSessionCache::new(&db).unwrap());
        let manager = SessionManager::start(provider, cache.clone()).await;
        manager.sign_in("a@b.com", "secret1").await.unwrap();
        wait_for_cache_state(&cache, true).await;
        manager.shutdown();
    }

    // Second run: the provider holds no server-side session anymore, so the
    // optimistic cached state must give way to signed-out.
    let provider = Arc::new(RestIdentityProvider::new(&server.uri()));
    let cache = Arc::new(SqliteSessionCache::new(&db).unwrap());
    let manager = SessionManager::start(provider, cache.clone()).await;
    manager.initialized().await;

    assert!(!manager.is_authenticated().await);
    wait_for_cache_state(&cache, false).await;
    manager.shutdown();
}
