use sha2::{Digest, Sha256};

/// SHA-256 over raw bytes, lowercase hex encoded.
///
/// Every hash in the ledger (block hashes, proof guesses, signature
/// commitments) goes through this one function so that all of them agree
/// on the digest and on the hex alphabet.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
