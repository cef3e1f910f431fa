//! Refresh-token fingerprints.
//!
//! Refresh tokens are signed and carry a random id, so a fast collision-resistant digest is
//! enough to turn them into lookup keys. Passwords never go through this path.

use sha2::{Digest, Sha256};

/// SHA-256 of the raw token, lower-case hex encoded (64 characters).
pub fn fingerprint(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}
