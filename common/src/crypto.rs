//! Cryptographic primitives shared by the server authenticator and the
//! client protocol driver, so the wire format is defined in exactly one
//! place.
//!
//! - RSA-4096 keypair generation and PKCS#1 PEM armor (spec ties token
//!   transport to `RSA PRIVATE KEY`/`RSA PUBLIC KEY` headers).
//! - RSA-OAEP encrypt/decrypt with SHA-512 as both the OAEP hash and the
//!   MGF1 digest, under the fixed label `"token"`.
//! - HMAC-SHA-512 signing/verification of token claims, the same
//!   algorithm `original_source/server/auth.go` selects via
//!   `jwt.SigningMethodHS512`, implemented here directly instead of
//!   pulling in a JWT crate since the claim set is fixed and tiny.

use crate::error::DeadDropError;
use crate::wire::TokenClaims;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// RSA modulus size, in bits, used for every generated keypair.
pub const RSA_KEY_BITS: usize = 4096;

/// OAEP label bound into every minted token's encryption.
pub const TOKEN_LABEL: &str = "token";

/// Size, in bytes, of the rotating HMAC session secret.
pub const SESSION_SECRET_LEN: usize = 64;

/// Lifetime of a minted token's `exp` claim, in seconds past issuance.
pub const TOKEN_TTL_SECS: i64 = 1;

fn oaep_padding() -> Oaep {
    Oaep::new_with_label::<Sha512, _>(TOKEN_LABEL)
}

/// Generates a fresh RSA-4096 keypair.
pub fn generate_keypair() -> Result<(RsaPrivateKey, RsaPublicKey), DeadDropError> {
    let mut rng = rand::rngs::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
        .map_err(|e| DeadDropError::internal(format!("failed to generate RSA key: {e}")))?;
    let public_key = RsaPublicKey::from(&private_key);
    Ok((private_key, public_key))
}

/// Encodes a public key as a PKCS#1 `RSA PUBLIC KEY` PEM block.
pub fn public_key_to_pem(key: &RsaPublicKey) -> Result<String, DeadDropError> {
    key.to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
        .map_err(|e| DeadDropError::internal(format!("failed to encode public key: {e}")))
}

/// Encodes a private key as a PKCS#1 `RSA PRIVATE KEY` PEM block.
pub fn private_key_to_pem(key: &RsaPrivateKey) -> Result<String, DeadDropError> {
    let pem = key
        .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
        .map_err(|e| DeadDropError::internal(format!("failed to encode private key: {e}")))?;
    Ok(pem.as_str().to_owned())
}

/// Parses PKCS#1 PEM bytes into a public key. Callers authenticating a
/// client map any failure here to `Unauthorized`, per spec: a stored
/// key that fails to parse is an auth failure, not a server error.
pub fn public_key_from_pem(pem: &[u8]) -> Result<RsaPublicKey, DeadDropError> {
    let pem = std::str::from_utf8(pem).map_err(|_| DeadDropError::Unauthorized)?;
    RsaPublicKey::from_pkcs1_pem(pem).map_err(|_| DeadDropError::Unauthorized)
}

/// Parses PKCS#1 PEM bytes into a private key (client-side only, so
/// parse failures are the caller's own malformed key file).
pub fn private_key_from_pem(pem: &str) -> Result<RsaPrivateKey, DeadDropError> {
    RsaPrivateKey::from_pkcs1_pem(pem)
        .map_err(|e| DeadDropError::internal(format!("failed to parse private key: {e}")))
}

/// Encrypts `plaintext` under `public_key` with RSA-OAEP (SHA-512 /
/// MGF1-SHA-512, label `"token"`).
pub fn encrypt_oaep(public_key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, DeadDropError> {
    let mut rng = rand::rngs::OsRng;
    public_key
        .encrypt(&mut rng, oaep_padding(), plaintext)
        .map_err(|e| DeadDropError::internal(format!("OAEP encryption failed: {e}")))
}

/// Decrypts an RSA-OAEP ciphertext produced by [`encrypt_oaep`].
pub fn decrypt_oaep(private_key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, DeadDropError> {
    private_key
        .decrypt(oaep_padding(), ciphertext)
        .map_err(|e| DeadDropError::internal(format!("OAEP decryption failed: {e}")))
}

/// HMAC-SHA-512-signs `claims` under `secret`, returning a compact
/// `payload.signature` string (base64 JSON payload, hex signature).
pub fn sign_claims(claims: &TokenClaims, secret: &[u8]) -> Result<String, DeadDropError> {
    let payload = serde_json::to_vec(claims)
        .map_err(|e| DeadDropError::internal(format!("failed to serialize claims: {e}")))?;
    let payload_b64 = STANDARD.encode(payload);

    let mut mac = HmacSha512::new_from_slice(secret)
        .map_err(|e| DeadDropError::internal(format!("invalid HMAC key: {e}")))?;
    mac.update(payload_b64.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(format!("{payload_b64}.{signature}"))
}

/// Verifies and parses a token produced by [`sign_claims`]. Returns
/// `None` if the signature doesn't verify against `secret`, the payload
/// doesn't parse as a `{ran, exp}` claim map, or the token is malformed.
/// Does not check expiry; callers compare `TokenClaims::exp` themselves.
pub fn verify_claims(token: &str, secret: &[u8]) -> Option<TokenClaims> {
    let (payload_b64, signature_hex) = token.split_once('.')?;

    let mut mac = HmacSha512::new_from_slice(secret).ok()?;
    mac.update(payload_b64.as_bytes());
    let signature = hex::decode(signature_hex).ok()?;
    mac.verify_slice(&signature).ok()?;

    let payload = STANDARD.decode(payload_b64).ok()?;
    serde_json::from_slice::<TokenClaims>(&payload).ok()
}
