//! Content fingerprints for configuration and sample documents.
//!
//! Outputs carry the SHA-256 of the documents they were computed from so a
//! rendered figure can be traced back to the exact prior file.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of document content as lowercase hex.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
