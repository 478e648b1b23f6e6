//! The approvable-entity contract
//!
//! A signable is any document requiring sequential multi-role sign-off
//! before being final. Documents embed an [`ApprovalState`] by composition
//! and implement [`Signable`]; the engine never subclasses anything.
//! For the most part, signables can only be created but not modified;
//! modification after sealing invalidates the stored digest.

use super::digest;
use super::error::{SignError, ValidationError};
use super::signature::EntityRef;

/// A workflow is the ordered set of signatory roles that must sign a
/// signable, in order of precedence. Concrete documents decide which
/// workflow applies (e.g. by amount tier); this engine only consumes the
/// resulting role sequence.
pub trait Workflow {
    /// A colloquial name for the workflow.
    fn name(&self) -> &str;
    /// The required roles, in signing order.
    fn signatories(&self) -> Vec<String>;
}

/// Approval bookkeeping embedded in every signable document.
#[derive(Debug, Default, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct ApprovalState {
    /// Hex SHA-256 over the document's identity data, set once at sealing.
    #[n(0)]
    pub digest: Option<String>,
    /// Ordered role tokens fixed at seal time from the workflow.
    #[n(1)]
    pub signatories: Vec<String>,
    /// Cached pointer to the role expected to sign next. A memoization of
    /// the resolver; refreshed after every ledger mutation.
    #[n(2)]
    pub current_pending_signatory: Option<String>,
}

impl ApprovalState {
    pub fn is_sealed(&self) -> bool {
        self.digest.is_some()
    }
}

/// The capability contract every signable document type implements.
pub trait Signable {
    /// Polymorphic reference to this document; the `kind` doubles as the
    /// grant namespace.
    fn entity_ref(&self) -> EntityRef;

    /// Stable serialization of the fields that define the sealed content.
    /// Must be deterministic for a given document state.
    fn identity_data(&self) -> anyhow::Result<String>;

    fn approval(&self) -> &ApprovalState;
    fn approval_mut(&mut self) -> &mut ApprovalState;

    /// The workflow definition applicable to this document.
    fn workflow(&self) -> Box<dyn Workflow>;

    /// Called once when the approval workflow starts (after sealing).
    fn on_workflow_start(&self) {}
    /// Called when the workflow advances to the next signatory.
    fn on_workflow_next(&self) {}
    /// Called when the workflow ends (completely signed or rejected).
    fn on_workflow_end(&self) {}
}

/// Seals a document: fixes its signatories from the workflow and stores the
/// digest of its identity data. Sealing twice fails with the same
/// immutability error as any post-seal mutation.
pub fn seal(doc: &mut dyn Signable) -> Result<(), SignError> {
    if doc.approval().is_sealed() {
        return Err(ValidationError::Immutable.into());
    }

    let signatories = doc.workflow().signatories();
    if signatories.is_empty() {
        return Err(ValidationError::EmptySignatories.into());
    }

    // Signatories are part of the sealed content, so they must be in place
    // before the identity data is hashed.
    let state = doc.approval_mut();
    state.current_pending_signatory = signatories.first().cloned();
    state.signatories = signatories;

    let identity = match doc.identity_data() {
        Ok(identity) => identity,
        Err(e) => {
            *doc.approval_mut() = ApprovalState::default();
            return Err(ValidationError::MalformedIdentity(e.to_string()).into());
        }
    };
    doc.approval_mut().digest = Some(digest::compute(&identity));

    Ok(())
}

/// Recomputes the digest from the document's current identity data and
/// compares it to the sealed digest. Must be invoked whenever the document
/// is materialized from storage; `false` means the persisted state diverged
/// from what was sealed and must be surfaced as a data-integrity error.
///
/// An unsealed document trivially verifies.
pub fn verify_on_load(doc: &dyn Signable) -> Result<bool, SignError> {
    let Some(sealed) = doc.approval().digest.as_ref() else {
        return Ok(true);
    };

    let identity = doc
        .identity_data()
        .map_err(|e| ValidationError::MalformedIdentity(e.to_string()))?;

    Ok(*sealed == digest::compute(&identity))
}
