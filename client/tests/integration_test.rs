//! End-to-end driver tests against an in-process dead-drop-server,
//! covering the literal drop/pull/add-key scenarios the protocol
//! promises.

use std::sync::Arc;

use dead_drop_client::driver::Driver;
use dead_drop_common::crypto;
use dead_drop_server::auth::Authenticator;
use dead_drop_server::dispatch::{build_router, AppState};
use dead_drop_server::store::ObjectStore;
use tempfile::tempdir;
use tokio::net::TcpListener;

#[tokio::test]
async fn full_protocol_round_trip_with_preregistered_key() {
    let data_dir = tempdir().unwrap().into_path();
    let keys_dir = tempdir().unwrap().into_path();
    let store = Arc::new(ObjectStore::new(data_dir, 1440, true));
    let auth = Arc::new(Authenticator::new(keys_dir).unwrap());

    let (private_key, public_key) = crypto::generate_keypair().unwrap();
    let pub_pem = crypto::public_key_to_pem(&public_key).unwrap();
    auth.add_authorized_key("alice", pub_pem.as_bytes()).unwrap();

    let state = AppState { store, auth };
    let app = build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let driver = Driver::new(format!("http://{addr}"), "alice".to_string(), private_key);

    let oid = driver.drop(b"hello from the client driver".to_vec()).await.unwrap();
    assert_eq!(oid.len(), 16);

    let bytes = driver.pull(&oid).await.unwrap();
    assert_eq!(bytes, b"hello from the client driver");

    // Destructive read: pulling the same OID again is now 404.
    let err = driver.pull(&oid).await.unwrap_err();
    assert!(matches!(err, dead_drop_common::error::DeadDropError::NotFound));
}

#[tokio::test]
async fn add_key_then_mint_a_token_for_the_new_caller() {
    let data_dir = tempdir().unwrap().into_path();
    let keys_dir = tempdir().unwrap().into_path();
    let store = Arc::new(ObjectStore::new(data_dir, 1440, true));
    let auth = Arc::new(Authenticator::new(keys_dir).unwrap());

    let (admin_private, admin_public) = crypto::generate_keypair().unwrap();
    let admin_pem = crypto::public_key_to_pem(&admin_public).unwrap();
    auth.add_authorized_key("admin", admin_pem.as_bytes()).unwrap();

    let state = AppState { store, auth };
    let app = build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let remote = format!("http://{addr}");
    let admin_driver = Driver::new(remote.clone(), "admin".to_string(), admin_private);

    let (bob_private, bob_public) = crypto::generate_keypair().unwrap();
    let bob_pem = crypto::public_key_to_pem(&bob_public).unwrap();
    admin_driver.add_key("bob", bob_pem.into_bytes()).await.unwrap();

    let bob_driver = Driver::new(remote, "bob".to_string(), bob_private);
    let oid = bob_driver.drop(b"bob's secret".to_vec()).await.unwrap();
    let bytes = bob_driver.pull(&oid).await.unwrap();
    assert_eq!(bytes, b"bob's secret");
}
