//! The authenticator (C2): authorized-keys directory, rotating HMAC
//! session secret, token minting and validation.
//!
//! Ownership split from `store`: the authenticator owns the keys
//! directory and the session secret exclusively; it never touches the
//! object store, and the object store never touches it. The dispatcher
//! is the only component that talks to both.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dead_drop_common::crypto::{self, SESSION_SECRET_LEN, TOKEN_TTL_SECS};
use dead_drop_common::error::DeadDropError;
use dead_drop_common::keyname::is_valid_key_name;
use dead_drop_common::oid::generate_claim;
use dead_drop_common::wire::TokenClaims;
use rand::RngCore;
use tracing::{info, warn};

const ROTATION_INTERVAL: Duration = Duration::from_secs(16);

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn random_secret() -> Vec<u8> {
    let mut secret = vec![0u8; SESSION_SECRET_LEN];
    rand::rngs::OsRng.fill_bytes(&mut secret);
    secret
}

/// The authorized-keys directory plus the rotating HMAC secret used to
/// sign and verify bearer tokens.
pub struct Authenticator {
    keys_dir: PathBuf,
    session_secret: RwLock<Vec<u8>>,
}

impl Authenticator {
    pub fn new(keys_dir: PathBuf) -> Result<Self, DeadDropError> {
        fs::create_dir_all(&keys_dir)
            .map_err(|e| DeadDropError::internal(format!("failed to create keys dir: {e}")))?;

        Ok(Authenticator {
            keys_dir,
            session_secret: RwLock::new(random_secret()),
        })
    }

    /// Spawns the secret-rotation background thread. Must be called on
    /// an `Arc<Authenticator>` so the thread can outlive the caller.
    pub fn start_background_tasks(self: &Arc<Self>) {
        let auth = Arc::clone(self);
        thread::spawn(move || loop {
            thread::sleep(ROTATION_INTERVAL);
            auth.rotate_secret();
        });
    }

    fn rotate_secret(&self) {
        let mut secret = self.session_secret.write().unwrap();
        *secret = random_secret();
        drop(secret);
        info!("rotated session secret");
    }

    fn key_path(&self, name: &str) -> PathBuf {
        self.keys_dir.join(name)
    }

    /// Writes `pem_public_key` to `<keys_dir>/<name>` with mode 0660.
    /// Rejects `name` that doesn't match the key-name regex. Overwrites
    /// an existing key of the same name without complaint.
    pub fn add_authorized_key(&self, name: &str, pem_public_key: &[u8]) -> Result<(), DeadDropError> {
        if !is_valid_key_name(name) {
            return Err(DeadDropError::bad_request(format!("invalid key name: {name}")));
        }

        let path = self.key_path(name);
        fs::write(&path, pem_public_key)
            .map_err(|e| DeadDropError::internal(format!("failed to write key {name}: {e}")))?;

        let perms = fs::Permissions::from_mode(0o660);
        fs::set_permissions(&path, perms)
            .map_err(|e| DeadDropError::internal(format!("failed to set key permissions: {e}")))?;

        info!(key_name = name, "added authorized key");
        Ok(())
    }

    /// Reads `<keys_dir>/<name>`. Absence is an authentication failure,
    /// not a server error, so it's mapped to `Unauthorized` here rather
    /// than `NotFound`.
    pub fn get_authorized_key(&self, name: &str) -> Result<Vec<u8>, DeadDropError> {
        fs::read(self.key_path(name)).map_err(|_| DeadDropError::Unauthorized)
    }

    /// Generates claims, signs them under the current session secret,
    /// and RSA-OAEP-encrypts the signed token under `pem_public_key`.
    /// A PEM/RSA parse failure on the caller-supplied key is mapped to
    /// the same `Unauthorized` sentinel the dispatcher surfaces as 401;
    /// everything past that point (signing, OAEP encryption) is internal.
    pub fn mint_token(&self, pem_public_key: &[u8]) -> Result<Vec<u8>, DeadDropError> {
        let public_key = crypto::public_key_from_pem(pem_public_key)?;

        let claims = TokenClaims {
            ran: generate_claim(),
            exp: now_unix() + TOKEN_TTL_SECS,
        };

        let secret = self.session_secret.read().unwrap();
        let signed = crypto::sign_claims(&claims, &secret)?;
        drop(secret);

        crypto::encrypt_oaep(&public_key, signed.as_bytes())
    }

    /// True iff `token` verifies under the current session secret and
    /// its `exp` claim is still in the future. Any parse/signature
    /// failure is treated as "not valid", not propagated as an error:
    /// the dispatcher's only use of this is a 401/proceed decision.
    pub fn validate_token(&self, token: &str) -> bool {
        let secret = self.session_secret.read().unwrap();
        let claims = match crypto::verify_claims(token, &secret) {
            Some(claims) => claims,
            None => return false,
        };
        drop(secret);

        if claims.exp <= now_unix() {
            warn!("rejected expired token");
            return false;
        }

        true
    }
}
