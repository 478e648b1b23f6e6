//! Service layer API for approval workflow operations
//!
//! [`ApprovalService`] orchestrates a signing attempt end to end: terminal
//! state checks, authorization, the CAS ledger append, and the pending
//! pointer refresh. Workflow callbacks and any notification side effects run
//! strictly after the append has committed; their failure can not roll back
//! a signature.

use super::authorize::{self, GrantSource};
use super::error::{LedgerError, SignError, ValidationError};
use super::ledger::LedgerStore;
use super::registry::SignableRegistry;
use super::resolver;
use super::signable::{self, Signable};
use super::signature::{EntityRef, Signature};
use super::timestamp::TimeStamp;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Knobs for the approval workflow.
#[derive(Debug, Clone)]
pub struct ApprovalConfig {
    /// Retry a lost pending-slot race once, re-resolving against the fresh
    /// ledger, before surfacing `ConcurrentModification` to the caller.
    pub retry_on_conflict: bool,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            retry_on_conflict: true,
        }
    }
}

/// Status filter for eligibility listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    /// Documents the actor has signed, in any state.
    All,
    /// Documents whose pending signatory is one of the actor's roles.
    Pending,
    /// Completely signed documents the actor took part in.
    Completed,
}

/// Aggregate counts for one signable type.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApprovalSummary {
    /// Open documents keyed by the role currently awaited.
    pub pending_by_role: BTreeMap<String, usize>,
    pub complete: usize,
    pub rejected: usize,
}

pub struct ApprovalService {
    ledger: LedgerStore,
    registry: SignableRegistry,
    grants: Box<dyn GrantSource>,
    config: ApprovalConfig,
}

impl ApprovalService {
    pub fn new(
        instance: Arc<sled::Db>,
        registry: SignableRegistry,
        grants: Box<dyn GrantSource>,
        config: ApprovalConfig,
    ) -> Self {
        Self {
            ledger: LedgerStore::new(instance),
            registry,
            grants,
            config,
        }
    }

    /// Create a service with the default config.
    pub fn with_defaults(
        instance: Arc<sled::Db>,
        registry: SignableRegistry,
        grants: Box<dyn GrantSource>,
    ) -> Self {
        Self::new(instance, registry, grants, ApprovalConfig::default())
    }

    pub fn config(&self) -> &ApprovalConfig {
        &self.config
    }

    /// Seal a document at finalization time: fix its signatories and digest,
    /// then start the workflow. Called once by the owning module.
    pub fn seal(&self, doc: &mut dyn Signable) -> Result<(), SignError> {
        signable::seal(doc)?;

        let entity = doc.entity_ref();
        info!(entity = %entity, workflow = doc.workflow().name(), "sealed signable");
        doc.on_workflow_start();

        Ok(())
    }

    /// Record a signing decision for the entity's current pending slot.
    pub fn attempt_sign(
        &self,
        kind: &str,
        id: &str,
        actor: &str,
        accepted: bool,
        comment: &str,
        evidence: &str,
    ) -> Result<Signature, SignError> {
        if comment.trim().is_empty() {
            return Err(ValidationError::MissingComment.into());
        }

        let mut attempts = if self.config.retry_on_conflict { 2 } else { 1 };
        loop {
            attempts -= 1;
            match self.sign_once(kind, id, actor, accepted, comment, evidence) {
                Err(SignError::ConcurrentModification) if attempts > 0 => {
                    debug!(kind, id, actor, "pending slot moved, re-resolving");
                }
                other => return other,
            }
        }
    }

    fn sign_once(
        &self,
        kind: &str,
        id: &str,
        actor: &str,
        accepted: bool,
        comment: &str,
        evidence: &str,
    ) -> Result<Signature, SignError> {
        let store = self.registry.get(kind)?;
        let doc = store.load(id)?;
        let entity = doc.entity_ref();

        if !signable::verify_on_load(doc.as_ref())? {
            return Err(SignError::IntegrityViolation {
                entity: entity.key(),
            });
        }

        let signatories = doc.approval().signatories.clone();
        let chain = self.ledger.entries(&entity)?;

        if resolver::is_rejected(&chain) {
            return Err(SignError::AlreadyRejected);
        }
        if resolver::is_completely_signed(&signatories, &chain) {
            return Err(SignError::AlreadyComplete);
        }
        // Unreachable after the completion check; kept as a defensive guard.
        let required = resolver::pending_signatory(&signatories, &chain)
            .ok_or(SignError::NoPendingSignatory)?;

        let held = self.grants.held_roles(actor, kind);
        if !authorize::can_sign(self.grants.as_ref(), actor, kind)
            || !held.iter().any(|role| *role == required)
        {
            return Err(SignError::NotAuthorized { required });
        }

        let predecessor = match chain.last() {
            Some(last) => Some(last.id().map_err(|e| LedgerError::Encode(e.to_string()))?),
            None => None,
        };
        let signature = Signature::new(
            entity.clone(),
            actor.to_string(),
            required.clone(),
            accepted,
            comment.to_string(),
            TimeStamp::new(),
            predecessor,
            evidence.to_string(),
        );

        self.ledger.append(&entity, signature.clone(), chain.len())?;

        let updated = self.ledger.entries(&entity)?;
        let pending = resolver::pending_signatory(&signatories, &updated);
        store.update_pending(&entity.id, pending.as_deref())?;

        info!(
            entity = %entity,
            actor,
            role = %required,
            accepted,
            "recorded signature"
        );

        let ended = resolver::is_rejected(&updated)
            || resolver::is_completely_signed(&signatories, &updated);
        if ended {
            doc.on_workflow_end();
        } else {
            doc.on_workflow_next();
        }

        Ok(signature)
    }

    /// The recorded signatures for one entity, in chain order, for audit and
    /// tracking views.
    pub fn ledger(&self, kind: &str, id: &str) -> Result<Vec<Signature>, SignError> {
        self.registry.get(kind)?;
        Ok(self.ledger.entries(&EntityRef::new(kind, id))?)
    }

    /// The sorted intersection of the actor's held roles and the entity's
    /// required signatories.
    pub fn eligible_roles(&self, actor: &str, kind: &str, id: &str) -> Result<Vec<String>, SignError> {
        let store = self.registry.get(kind)?;
        let doc = store.load(id)?;
        Ok(authorize::eligible_roles(
            self.grants.as_ref(),
            actor,
            doc.as_ref(),
        ))
    }

    /// Entities of one type relevant to the actor, for "awaiting my
    /// approval" views. `verdict` further restricts to documents carrying at
    /// least one accepted (`Some(true)`) or rejected (`Some(false)`)
    /// signature.
    pub fn eligible_entities(
        &self,
        actor: &str,
        kind: &str,
        filter: StatusFilter,
        verdict: Option<bool>,
    ) -> Result<Vec<EntityRef>, SignError> {
        let store = self.registry.get(kind)?;
        let relevant = authorize::related_roles(self.grants.as_ref(), actor, kind);

        let mut selected = vec![];
        for doc in store.list()? {
            let entity = doc.entity_ref();
            let chain = self.ledger.entries(&entity)?;
            let acted = chain.iter().any(|s| s.signer == actor);

            let keep = match filter {
                StatusFilter::All => acted,
                StatusFilter::Pending => doc
                    .approval()
                    .current_pending_signatory
                    .as_ref()
                    .map(|pending| relevant.contains(pending))
                    .unwrap_or(false),
                StatusFilter::Completed => {
                    acted && resolver::is_completely_signed(&doc.approval().signatories, &chain)
                }
            };
            if !keep {
                continue;
            }
            if let Some(wanted) = verdict {
                if !chain.iter().any(|s| s.accepted == wanted) {
                    continue;
                }
            }

            selected.push(entity);
        }

        Ok(selected)
    }

    /// Aggregate report for one signable type: open documents counted by the
    /// role currently awaited, plus complete and rejected totals.
    pub fn summary(&self, kind: &str) -> Result<ApprovalSummary, SignError> {
        let store = self.registry.get(kind)?;

        let mut summary = ApprovalSummary::default();
        for doc in store.list()? {
            let chain = self.ledger.entries(&doc.entity_ref())?;
            let signatories = &doc.approval().signatories;

            if resolver::is_rejected(&chain) {
                summary.rejected += 1;
            } else if resolver::is_completely_signed(signatories, &chain) {
                summary.complete += 1;
            } else if let Some(pending) = resolver::pending_signatory(signatories, &chain) {
                *summary.pending_by_role.entry(pending).or_insert(0) += 1;
            }
        }

        Ok(summary)
    }

    /// Administrative correction: remove one signature and recompute the
    /// entity's pending pointer from the remaining ledger. A failed
    /// recomputation does not block the deletion; the inconsistency is
    /// logged instead.
    pub fn delete_signature(
        &self,
        kind: &str,
        id: &str,
        signature_id: &str,
    ) -> Result<(), SignError> {
        let entity = EntityRef::new(kind, id);
        let remaining = self.ledger.remove(&entity, signature_id)?;

        let recompute = self.registry.get(kind).and_then(|store| {
            let doc = store.load(id)?;
            let pending = resolver::pending_signatory(&doc.approval().signatories, &remaining);
            store.update_pending(id, pending.as_deref())
        });
        if let Err(e) = recompute {
            warn!(
                entity = %entity,
                signature_id,
                error = %e,
                "signature deleted but pending signatory could not be recomputed"
            );
        }

        Ok(())
    }
}
