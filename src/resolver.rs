//! Sequential signatory resolution over a ledger snapshot
//!
//! These functions are pure given the recorded signatures for one entity.
//! The entity's cached `current_pending_signatory` is a memoization of
//! [`pending_signatory`] and must be refreshed after every ledger mutation.

use super::signature::Signature;

/// Whether the most recent signing decision for the entity was a rejection.
pub fn is_rejected(signatures: &[Signature]) -> bool {
    signatures.last().map(|s| !s.accepted).unwrap_or(false)
}

/// Whether every required signatory has signed.
pub fn is_completely_signed(signatories: &[String], signatures: &[Signature]) -> bool {
    !signatories.is_empty() && signatures.len() >= signatories.len()
}

/// The role expected to sign next, or `None` when the workflow can not
/// advance (empty signatories, rejected, or complete).
///
/// The number of signatures made indexes directly into the ordered
/// signatory list.
pub fn pending_signatory(signatories: &[String], signatures: &[Signature]) -> Option<String> {
    if signatories.is_empty() || is_rejected(signatures) {
        return None;
    }

    signatories.get(signatures.len()).cloned()
}
