//! Authorized-key name validation.
//!
//! Ports `lib.KeyNameRegex` from `original_source/lib/common.go`: key
//! names double as filenames under `<keys_dir>/`, so they're restricted
//! to a conservative character set to keep them path-safe.

use regex::Regex;
use std::sync::OnceLock;

static KEY_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn key_name_regex() -> &'static Regex {
    KEY_NAME_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid regex literal"))
}

/// True iff `name` matches `^[A-Za-z0-9_-]{1,64}$`.
pub fn is_valid_key_name(name: &str) -> bool {
    key_name_regex().is_match(name)
}
