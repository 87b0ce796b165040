//! Literal end-to-end scenarios from the dead-drop protocol, exercised
//! against the router assembled by `dead_drop_server::dispatch`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use dead_drop_common::crypto::{self, generate_keypair};
use dead_drop_common::wire::{AddKeyPayload, TokenRequestPayload};
use dead_drop_server::auth::Authenticator;
use dead_drop_server::dispatch::{build_router, AppState};
use dead_drop_server::store::ObjectStore;
use tempfile::tempdir;
use tower::ServiceExt;

fn test_state(ttl_min: u64, destructive_read: bool) -> AppState {
    let data_dir = tempdir().unwrap().into_path();
    let keys_dir = tempdir().unwrap().into_path();
    let store = Arc::new(ObjectStore::new(data_dir, ttl_min, destructive_read));
    let auth = Arc::new(Authenticator::new(keys_dir).unwrap());
    AppState { store, auth }
}

async fn token_for(app: &axum::Router, key_name: &str, private_key: &rsa::RsaPrivateKey) -> String {
    let body = serde_json::to_vec(&TokenRequestPayload { key_name: key_name.to_string() }).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/token")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ciphertext = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let plaintext = crypto::decrypt_oaep(private_key, &ciphertext).unwrap();
    String::from_utf8(plaintext).unwrap()
}

// Scenario 1: non-destructive reads return the same bytes every time.
#[tokio::test]
async fn scenario_non_destructive_read_survives_repeated_pulls() {
    let state = test_state(1, false);
    let (private_key, public_key) = generate_keypair().unwrap();
    let pem = crypto::public_key_to_pem(&public_key).unwrap();
    state.auth.add_authorized_key("alice", pem.as_bytes()).unwrap();

    let app = build_router(state);
    let token = token_for(&app, "alice", &private_key).await;

    let drop_request = Request::builder()
        .method("POST")
        .uri("/d")
        .header("Authorization", &token)
        .body(Body::from("hello"))
        .unwrap();
    let drop_response = app.clone().oneshot(drop_request).await.unwrap();
    assert_eq!(drop_response.status(), StatusCode::OK);
    let oid_bytes = axum::body::to_bytes(drop_response.into_body(), usize::MAX).await.unwrap();
    let oid = String::from_utf8(oid_bytes.to_vec()).unwrap();
    assert_eq!(oid.len(), 16);
    assert!(oid.bytes().all(|b| b.is_ascii_lowercase()));

    for _ in 0..2 {
        let pull_request = Request::builder()
            .method("GET")
            .uri(format!("/d/{oid}"))
            .header("Authorization", &token)
            .body(Body::empty())
            .unwrap();
        let pull_response = app.clone().oneshot(pull_request).await.unwrap();
        assert_eq!(pull_response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(pull_response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hello");
    }
}

// Scenario 2: same setup, but destructive-read=true means the second
// pull of the same OID is gone.
#[tokio::test]
async fn scenario_destructive_read_evicts_after_first_pull() {
    let state = test_state(1, true);
    let (private_key, public_key) = generate_keypair().unwrap();
    let pem = crypto::public_key_to_pem(&public_key).unwrap();
    state.auth.add_authorized_key("alice", pem.as_bytes()).unwrap();

    let app = build_router(state);
    let token = token_for(&app, "alice", &private_key).await;

    let drop_request = Request::builder()
        .method("POST")
        .uri("/d")
        .header("Authorization", &token)
        .body(Body::from("hello"))
        .unwrap();
    let drop_response = app.clone().oneshot(drop_request).await.unwrap();
    let oid_bytes = axum::body::to_bytes(drop_response.into_body(), usize::MAX).await.unwrap();
    let oid = String::from_utf8(oid_bytes.to_vec()).unwrap();

    let first_pull = Request::builder()
        .method("GET")
        .uri(format!("/d/{oid}"))
        .header("Authorization", &token)
        .body(Body::empty())
        .unwrap();
    let first_response = app.clone().oneshot(first_pull).await.unwrap();
    assert_eq!(first_response.status(), StatusCode::OK);

    let second_pull = Request::builder()
        .method("GET")
        .uri(format!("/d/{oid}"))
        .header("Authorization", &token)
        .body(Body::empty())
        .unwrap();
    let second_response = app.clone().oneshot(second_pull).await.unwrap();
    assert_eq!(second_response.status(), StatusCode::NOT_FOUND);
}

// Scenario 6: key-name validation at the add-key boundary.
#[tokio::test]
async fn scenario_add_key_rejects_path_traversal_and_accepts_valid_names() {
    let state = test_state(1440, true);
    let (admin_private, admin_public) = generate_keypair().unwrap();
    let admin_pem = crypto::public_key_to_pem(&admin_public).unwrap();
    state.auth.add_authorized_key("admin", admin_pem.as_bytes()).unwrap();

    let app = build_router(state);
    let token = token_for(&app, "admin", &admin_private).await;

    let (_private_key, public_key) = generate_keypair().unwrap();
    let pem = crypto::public_key_to_pem(&public_key).unwrap();

    let bad_payload = AddKeyPayload { key: pem.clone().into_bytes(), key_name: "../etc/passwd".to_string() };
    let bad_body = serde_json::to_vec(&bad_payload).unwrap();
    let bad_request = Request::builder()
        .method("POST")
        .uri("/add-key")
        .header("content-type", "application/json")
        .header("Authorization", &token)
        .body(Body::from(bad_body))
        .unwrap();
    let bad_response = app.clone().oneshot(bad_request).await.unwrap();
    assert_eq!(bad_response.status(), StatusCode::BAD_REQUEST);

    let good_payload = AddKeyPayload { key: pem.into_bytes(), key_name: "valid_name-1".to_string() };
    let good_body = serde_json::to_vec(&good_payload).unwrap();
    let good_request = Request::builder()
        .method("POST")
        .uri("/add-key")
        .header("content-type", "application/json")
        .header("Authorization", &token)
        .body(Body::from(good_body))
        .unwrap();
    let good_response = app.clone().oneshot(good_request).await.unwrap();
    assert_eq!(good_response.status(), StatusCode::OK);
}

// A request carrying no Authorization header at all is always 401.
#[tokio::test]
async fn scenario_missing_authorization_header_is_unauthorized() {
    let state = test_state(1440, true);
    let app = build_router(state);

    let request = Request::builder()
        .method("GET")
        .uri("/d/aaaaaaaaaaaaaaaa")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
