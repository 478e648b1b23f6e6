//! Immutable signature records and their polymorphic entity reference

use super::timestamp::TimeStamp;
use chrono::Utc;

/// A `(type tag, id)` reference to the signable a signature belongs to.
///
/// The tag doubles as the document-type namespace that scopes role grants;
/// the id is opaque and assigned by the owning document store.
#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub struct EntityRef {
    #[n(0)]
    pub kind: String,
    #[n(1)]
    pub id: String,
}

impl EntityRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// The ledger key under which this entity's signature chain is stored.
    pub fn key(&self) -> String {
        format!("{}/{}", self.kind, self.id)
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// One recorded signing decision. Created exactly once, never updated.
///
/// A signature has no id field; its id *is* the hash of its CBOR encoding.
/// Because `predecessor` holds the previous signature's hash, each entity's
/// ledger forms a singly-linked hash chain independent of storage order.
#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub struct Signature {
    #[n(0)]
    pub entity: EntityRef,
    #[n(1)]
    pub signer: String,
    #[n(2)]
    pub role_acted_as: String,
    #[n(3)]
    pub accepted: bool,
    #[n(4)]
    pub comment: String,
    #[n(5)]
    pub signed_at: TimeStamp<Utc>,
    #[n(6)]
    pub predecessor: Option<String>, // hash id of the previous signature
    #[n(7)]
    pub evidence: String, // opaque actor-supplied token, audit note only
}

impl Signature {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        entity: EntityRef,
        signer: String,
        role_acted_as: String,
        accepted: bool,
        comment: String,
        signed_at: TimeStamp<Utc>,
        predecessor: Option<String>,
        evidence: String,
    ) -> Self {
        Self {
            entity,
            signer,
            role_acted_as,
            accepted,
            comment,
            signed_at,
            predecessor,
            evidence,
        }
    }

    /// Encode to CBOR and derive the content-hash id.
    pub fn build(&self) -> anyhow::Result<(String, Vec<u8>)> {
        let cbor = minicbor::to_vec(self)?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }

    /// The content-hash id of this signature.
    pub fn id(&self) -> anyhow::Result<String> {
        Ok(self.build()?.0)
    }
}
