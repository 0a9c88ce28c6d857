//! Printer agent credentials.
//!
//! Each printer gets one random key at registration. The plaintext is
//! returned to the caller exactly once; the authority stores only its
//! SHA-256 digest and looks printers up by that digest on every agent call.

use rand::Rng;

/// Length of a generated agent key (alphanumeric characters).
pub const KEY_LENGTH: usize = 48;

/// Leading characters kept in clear for identifying a key in listings.
pub const KEY_PREFIX_LENGTH: usize = 8;

/// Header the agent sends its key in.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// A freshly generated agent key.
pub struct GeneratedApiKey {
    /// Shown to the operator once, never stored.
    pub plaintext: String,
    pub prefix: String,
    /// SHA-256 hex digest, stored on the printer row.
    pub hash: String,
}

/// Generate a new random agent key.
pub fn generate_api_key() -> GeneratedApiKey {
    let key: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(KEY_LENGTH)
        .map(char::from)
        .collect();

    let prefix = extract_prefix(&key).to_string();
    let hash = hash_api_key(&key);

    GeneratedApiKey {
        plaintext: key,
        prefix,
        hash,
    }
}

/// SHA-256 hex digest of a key, used both at registration and on lookup.
pub fn hash_api_key(key: &str) -> String {
    crate::hashing::sha256_hex(key.as_bytes())
}

pub fn extract_prefix(key: &str) -> &str {
    &key[..KEY_PREFIX_LENGTH.min(key.len())]
}
