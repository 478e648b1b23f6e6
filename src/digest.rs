//! Content digest over a signable's identity data

/// Computes the hex-encoded SHA-256 digest of a signable's identity data.
///
/// Deterministic for a given input; the caller is responsible for producing
/// a stable serialization of its sealed fields.
pub fn compute(identity_data: &str) -> String {
    sha256::digest(identity_data)
}
