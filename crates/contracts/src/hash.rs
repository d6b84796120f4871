//! Data fingerprint derivation.

use sha2::{Digest, Sha256};

/// Derive the fingerprint of a data sample: lowercase hex SHA-256 of the
/// canonical byte encoding. The result is the `key` that identifies the
/// sample everywhere in the graph.
pub fn derive_hash(bytes: &[u8]) -> String {
	let digest = Sha256::digest(bytes);
	hex::encode(digest)
}
