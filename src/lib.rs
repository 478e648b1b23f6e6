//! A sequential multi-party approval engine for sealed documents.
//!
//! Any document type can take part in approval workflows by embedding an
//! [`signable::ApprovalState`] and implementing [`signable::Signable`]. At
//! finalization the document is sealed: its required signatory roles are
//! fixed from a [`signable::Workflow`] and a SHA-256 digest is taken over
//! its identity data, so any out-of-band mutation is detected on load. Each
//! signing decision is appended to a per-entity hash chain in the sled
//! ledger; [`service::ApprovalService`] gates every attempt on the entity's
//! terminal state, the sequentially resolved pending role, and the actor's
//! role grants.

pub mod authorize;
pub mod digest;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod resolver;
pub mod service;
pub mod signable;
pub mod signature;
pub mod timestamp;
pub mod utils;
