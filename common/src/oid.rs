//! Random lowercase-letter identifiers: object IDs and token claim nonces.
//!
//! Ports `randomOid` (`original_source/server/db.go`) and `randomClaim`
//! (`original_source/server/auth.go`), which both draw CSPRNG bytes and
//! map each byte onto the 26-letter alphabet by taking `byte % 26`. The
//! alphabet is narrow and its distribution slightly biased (256 isn't a
//! multiple of 26), but at this length the bias doesn't matter for the
//! stated key-space and the alphabet is kept fixed for compatibility
//! with already-persisted object filenames.

use rand::RngCore;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Length of an object identifier, in characters.
pub const OID_LEN: usize = 16;

/// Length of a token claim's random nonce, in characters.
pub const CLAIM_LEN: usize = 32;

fn random_lowercase_string(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes
        .into_iter()
        .map(|b| ALPHABET[(b as usize) % ALPHABET.len()] as char)
        .collect()
}

/// Draws a fresh object identifier: 16 lowercase letters from a CSPRNG.
pub fn generate_oid() -> String {
    random_lowercase_string(OID_LEN)
}

/// Draws a fresh token claim nonce: 32 lowercase letters from a CSPRNG.
pub fn generate_claim() -> String {
    random_lowercase_string(CLAIM_LEN)
}

/// True iff `s` has the exact shape an object ID emitted by `drop` has:
/// 16 characters, all lowercase ASCII letters.
pub fn is_valid_oid(s: &str) -> bool {
    s.len() == OID_LEN && s.bytes().all(|b| b.is_ascii_lowercase())
}
