//! Shared wire contracts and cryptographic primitives for the dead-drop
//! object service: the vocabulary both `dead-drop-server` and
//! `dead-drop-client` speak, defined once so the two sides can't drift.

pub mod crypto;
pub mod error;
pub mod keyname;
pub mod oid;
pub mod wire;

pub use error::DeadDropError;
pub use wire::{AddKeyPayload, TokenClaims, TokenRequestPayload};
