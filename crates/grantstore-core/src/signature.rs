//! Access token signature hashing.
//!
//! Access token signatures can be large bearer strings; hashing bounds the
//! size of the indexed lookup key. Authorization code and refresh token
//! signatures are short random strings and are stored as given, so this
//! policy is deliberately category-specific. The hash is one-way: lookups
//! re-hash the incoming signature instead of recovering the original.

use sha2::{Digest, Sha384};

/// Hash an access token signature for storage and lookup.
///
/// Deterministic SHA-384 over the UTF-8 bytes, returned as 96 lowercase hex
/// characters regardless of input length.
#[must_use]
pub fn hash_access_token_signature(signature: &str) -> String {
    hex::encode(Sha384::digest(signature.as_bytes()))
}
