//! Library surface for `dead-drop-server`: the object store, the
//! authenticator, the HTTP dispatcher, and config loading, separated
//! from `main.rs` the way the teacher's `28-web-server-axum` lab splits
//! framework-independent logic (`lib.rs`) from the binary entry point.

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod store;
