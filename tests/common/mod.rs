//! Shared test fixtures: a vendor invoice document type, its sled-backed
//! store, and a map-backed grant source.
#![allow(dead_code)]

use countersign::authorize::{CAN_SIGN, GrantSource};
use countersign::error::SignError;
use countersign::registry::{SignableRegistry, SignableStore};
use countersign::signable::{ApprovalState, Signable, Workflow};
use countersign::signature::EntityRef;
use countersign::utils::new_uuid_to_bech32;
use std::collections::HashMap;
use std::sync::Arc;

pub const INVOICE: &str = "invoice";

/// Invoice approval workflow: the role sequence lengthens with the amount
/// at stake.
pub struct InvoiceWorkflow {
    gross_total: u64,
}

impl InvoiceWorkflow {
    pub fn new(gross_total: u64) -> Self {
        Self { gross_total }
    }
}

impl Workflow for InvoiceWorkflow {
    fn name(&self) -> &str {
        "Invoice Workflow"
    }

    fn signatories(&self) -> Vec<String> {
        if self.gross_total <= 5_000_000 {
            vec!["reviewer".into(), "approver".into()]
        } else {
            vec!["reviewer".into(), "approver".into(), "head_of_finance".into()]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct VendorInvoice {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub vendor: String,
    #[n(2)]
    pub description: String,
    #[n(3)]
    pub gross_total: u64,
    #[n(4)]
    pub approval: ApprovalState,
}

impl VendorInvoice {
    pub fn new(vendor: &str, description: &str, gross_total: u64) -> Self {
        Self {
            id: new_uuid_to_bech32("inv_").unwrap(),
            vendor: vendor.to_string(),
            description: description.to_string(),
            gross_total,
            approval: ApprovalState::default(),
        }
    }
}

impl Signable for VendorInvoice {
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(INVOICE, self.id.clone())
    }

    fn identity_data(&self) -> anyhow::Result<String> {
        // Signatories are part of the sealed content.
        Ok(format!(
            "{}|{}|{}|{}|{}",
            self.id,
            self.vendor,
            self.description,
            self.gross_total,
            self.approval.signatories.join(",")
        ))
    }

    fn approval(&self) -> &ApprovalState {
        &self.approval
    }

    fn approval_mut(&mut self) -> &mut ApprovalState {
        &mut self.approval
    }

    fn workflow(&self) -> Box<dyn Workflow> {
        Box::new(InvoiceWorkflow::new(self.gross_total))
    }
}

/// Sled-backed store for vendor invoices.
#[derive(Clone)]
pub struct InvoiceStore {
    instance: Arc<sled::Db>,
}

fn invoice_key(id: &str) -> String {
    format!("invoice/{id}")
}

impl InvoiceStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    pub fn save(&self, invoice: &VendorInvoice) -> anyhow::Result<()> {
        let cbor = minicbor::to_vec(invoice)?;
        self.instance.insert(invoice_key(&invoice.id).as_bytes(), cbor)?;
        Ok(())
    }

    pub fn fetch(&self, id: &str) -> anyhow::Result<VendorInvoice> {
        let bytes = self
            .instance
            .get(invoice_key(id).as_bytes())?
            .ok_or_else(|| anyhow::anyhow!("no invoice {id}"))?;
        Ok(minicbor::decode(bytes.as_ref())?)
    }

    /// Mutates a sealed field directly in storage, bypassing the document's
    /// own update path. Exists to simulate out-of-band tampering.
    pub fn tamper_gross_total(&self, id: &str, gross_total: u64) -> anyhow::Result<()> {
        let mut invoice = self.fetch(id)?;
        invoice.gross_total = gross_total;
        self.save(&invoice)
    }
}

impl SignableStore for InvoiceStore {
    fn load(&self, id: &str) -> Result<Box<dyn Signable>, SignError> {
        let bytes = self
            .instance
            .get(invoice_key(id).as_bytes())
            .map_err(|e| SignError::Store(e.to_string()))?
            .ok_or_else(|| SignError::NotFound {
                kind: INVOICE.to_string(),
                id: id.to_string(),
            })?;
        let invoice: VendorInvoice =
            minicbor::decode(bytes.as_ref()).map_err(|e| SignError::Store(e.to_string()))?;
        Ok(Box::new(invoice))
    }

    fn list(&self) -> Result<Vec<Box<dyn Signable>>, SignError> {
        let mut invoices: Vec<Box<dyn Signable>> = vec![];
        for item in self.instance.scan_prefix(b"invoice/") {
            let (_, bytes) = item.map_err(|e| SignError::Store(e.to_string()))?;
            let invoice: VendorInvoice =
                minicbor::decode(bytes.as_ref()).map_err(|e| SignError::Store(e.to_string()))?;
            invoices.push(Box::new(invoice));
        }
        Ok(invoices)
    }

    fn update_pending(&self, id: &str, pending: Option<&str>) -> Result<(), SignError> {
        let mut invoice = self
            .fetch(id)
            .map_err(|_| SignError::NotFound {
                kind: INVOICE.to_string(),
                id: id.to_string(),
            })?;
        invoice.approval.current_pending_signatory = pending.map(|p| p.to_string());
        self.save(&invoice).map_err(|e| SignError::Store(e.to_string()))
    }
}

/// In-memory grant source keyed by (actor, namespace).
#[derive(Default, Clone)]
pub struct MapGrants {
    grants: HashMap<(String, String), Vec<String>>,
}

impl MapGrants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants the actor the given roles plus the namespace signing gate.
    pub fn grant_signer(mut self, actor: &str, namespace: &str, roles: &[&str]) -> Self {
        let mut held: Vec<String> = roles.iter().map(|r| r.to_string()).collect();
        held.push(CAN_SIGN.to_string());
        self.grants
            .insert((actor.to_string(), namespace.to_string()), held);
        self
    }

    /// Grants roles without the namespace signing gate.
    pub fn grant_roles_only(mut self, actor: &str, namespace: &str, roles: &[&str]) -> Self {
        self.grants.insert(
            (actor.to_string(), namespace.to_string()),
            roles.iter().map(|r| r.to_string()).collect(),
        );
        self
    }
}

impl GrantSource for MapGrants {
    fn held_roles(&self, actor: &str, namespace: &str) -> Vec<String> {
        self.grants
            .get(&(actor.to_string(), namespace.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

/// Registry with the invoice store registered under its type tag.
pub fn invoice_registry(store: InvoiceStore) -> SignableRegistry {
    let mut registry = SignableRegistry::new();
    registry.register(INVOICE, Box::new(store));
    registry
}
