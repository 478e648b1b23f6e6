//! Append-only, per-entity signature ledger on sled
//!
//! Each entity's signatures live under a single chain key as a CBOR-encoded
//! vector, appended with compare-and-swap. The CAS closes the
//! resolve-then-append race: two signers racing for the same pending slot
//! both resolve against the same snapshot, but only one swap succeeds; the
//! loser gets [`SignError::ConcurrentModification`] and must re-resolve.
//! Every signature is additionally stored under its content-hash id for
//! audit lookups.

use super::error::{LedgerError, SignError};
use super::signature::{EntityRef, Signature};
use std::sync::Arc;

pub struct LedgerStore {
    instance: Arc<sled::Db>,
}

fn chain_key(entity: &EntityRef) -> String {
    format!("chain/{}", entity.key())
}

fn record_key(id: &str) -> String {
    format!("sig/{id}")
}

fn decode_chain(bytes: &[u8]) -> Result<Vec<Signature>, LedgerError> {
    minicbor::decode(bytes).map_err(|e| LedgerError::Decode(e.to_string()))
}

fn encode_chain(chain: &Vec<Signature>) -> Result<Vec<u8>, LedgerError> {
    minicbor::to_vec(chain).map_err(|e| LedgerError::Encode(e.to_string()))
}

impl LedgerStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    /// All signatures recorded for the entity, in chain order (ascending
    /// `signed_at`; appends are serialized so storage order is the signing
    /// order).
    pub fn entries(&self, entity: &EntityRef) -> Result<Vec<Signature>, LedgerError> {
        match self.instance.get(chain_key(entity).as_bytes())? {
            Some(bytes) => decode_chain(bytes.as_ref()),
            None => Ok(vec![]),
        }
    }

    /// The content-hash id of the most recent signature, if any.
    pub fn head_id(&self, entity: &EntityRef) -> Result<Option<String>, SignError> {
        let chain = self.entries(entity)?;
        match chain.last() {
            Some(signature) => Ok(Some(
                signature
                    .id()
                    .map_err(|e| LedgerError::Encode(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    /// Look up one signature record by its content-hash id.
    pub fn record(&self, id: &str) -> Result<Option<Signature>, LedgerError> {
        match self.instance.get(record_key(id).as_bytes())? {
            Some(bytes) => Ok(Some(
                minicbor::decode(bytes.as_ref()).map_err(|e| LedgerError::Decode(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    /// Appends a signature whose construction was resolved against a chain
    /// of `expected_len` entries. Fails with `ConcurrentModification` if the
    /// chain moved in the meantime or another append wins the swap.
    pub fn append(
        &self,
        entity: &EntityRef,
        signature: Signature,
        expected_len: usize,
    ) -> Result<(), SignError> {
        let key = chain_key(entity);
        let current = self
            .instance
            .get(key.as_bytes())
            .map_err(LedgerError::from)?;

        let chain = match current.as_ref() {
            Some(bytes) => decode_chain(bytes.as_ref())?,
            None => vec![],
        };
        if chain.len() != expected_len {
            return Err(SignError::ConcurrentModification);
        }

        let (id, record_cbor) = signature
            .build()
            .map_err(|e| LedgerError::Encode(e.to_string()))?;

        let mut next = chain;
        next.push(signature);
        let encoded = encode_chain(&next)?;

        let swap = self
            .instance
            .compare_and_swap(key.as_bytes(), current, Some(encoded))
            .map_err(LedgerError::from)?;
        if swap.is_err() {
            return Err(SignError::ConcurrentModification);
        }

        self.instance
            .insert(record_key(&id).as_bytes(), record_cbor)
            .map_err(LedgerError::from)?;

        Ok(())
    }

    /// Removes one signature from an entity's chain (administrative
    /// correction only) and returns the remaining chain. The surviving
    /// vector order stays authoritative; recorded predecessor ids keep the
    /// original history.
    pub fn remove(
        &self,
        entity: &EntityRef,
        signature_id: &str,
    ) -> Result<Vec<Signature>, SignError> {
        let key = chain_key(entity);
        let current = self
            .instance
            .get(key.as_bytes())
            .map_err(LedgerError::from)?;

        let chain = match current.as_ref() {
            Some(bytes) => decode_chain(bytes.as_ref())?,
            None => vec![],
        };

        let mut position = None;
        for (index, signature) in chain.iter().enumerate() {
            let id = signature
                .id()
                .map_err(|e| LedgerError::Encode(e.to_string()))?;
            if id == signature_id {
                position = Some(index);
                break;
            }
        }
        let Some(index) = position else {
            return Err(SignError::NotFound {
                kind: "signature".to_string(),
                id: signature_id.to_string(),
            });
        };

        let mut next = chain;
        next.remove(index);
        let encoded = encode_chain(&next)?;

        let swap = self
            .instance
            .compare_and_swap(key.as_bytes(), current, Some(encoded))
            .map_err(LedgerError::from)?;
        if swap.is_err() {
            return Err(SignError::ConcurrentModification);
        }

        self.instance
            .remove(record_key(signature_id).as_bytes())
            .map_err(LedgerError::from)?;

        Ok(next)
    }
}
