//! Stable content hashing for findings.

use sha1::{Digest, Sha1};

/// Hashes an ordered tuple of strings into a stable lowercase-hex digest.
///
/// Each item is SHA-1 hashed on its own, the hex digests are joined with
/// `-`, and the joined string is hashed once more. The outer hash keeps the
/// output width fixed, and because it only ever consumes fixed-width hex
/// digests, hyphens inside the items cannot collide with the separator.
///
/// Comparison results depend on this value being byte-for-byte stable
/// across runs and releases; do not change the construction without a
/// format-version bump.
pub fn fingerprint<S: AsRef<str>>(items: &[S]) -> String {
    let digests: Vec<String> = items
        .iter()
        .map(|item| hex::encode(Sha1::digest(item.as_ref().as_bytes())))
        .collect();
    hex::encode(Sha1::digest(digests.join("-").as_bytes()))
}
