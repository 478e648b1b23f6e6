//! Error taxonomy for the approval engine

/// Validation failures on caller-supplied input or signable state.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A signing decision requires a non-empty comment")]
    MissingComment,
    #[error("The workflow produced an empty signatory list")]
    EmptySignatories,
    #[error("Signable identity data is malformed: {0}")]
    MalformedIdentity(String),
    #[error("Signable is sealed and can not be modified")]
    Immutable,
}

/// Failures raised by the sled-backed signature ledger.
#[derive(thiserror::Error, Debug)]
pub enum LedgerError {
    #[error("Ledger database error: {0}")]
    Db(#[from] sled::Error),
    #[error("Failed to encode signature chain: {0}")]
    Encode(String),
    #[error("Failed to decode signature chain: {0}")]
    Decode(String),
}

/// Errors surfaced by the workflow controller to callers of
/// [`crate::service::ApprovalService`].
#[derive(thiserror::Error, Debug)]
pub enum SignError {
    #[error("Stored content of {entity} diverges from its sealed digest")]
    IntegrityViolation { entity: String },
    #[error("This signable has been rejected")]
    AlreadyRejected,
    #[error("This signable has been completely signed")]
    AlreadyComplete,
    #[error("No signatory is pending for this signable")]
    NoPendingSignatory,
    #[error("Signing requires the '{required}' role")]
    NotAuthorized { required: String },
    #[error("The pending slot was signed concurrently, retry with fresh state")]
    ConcurrentModification,
    #[error("No signable type registered under '{0}'")]
    UnknownSignableType(String),
    #[error("No {kind} found with id {id}")]
    NotFound { kind: String, id: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Signable store error: {0}")]
    Store(String),
}
