//! Walks a purchase memo through a two-role approval workflow end to end.

use countersign::authorize::{CAN_SIGN, GrantSource};
use countersign::error::SignError;
use countersign::registry::{SignableRegistry, SignableStore};
use countersign::service::ApprovalService;
use countersign::signable::{ApprovalState, Signable, Workflow};
use countersign::signature::EntityRef;
use countersign::utils::new_uuid_to_bech32;
use std::collections::HashMap;
use std::sync::Arc;

struct MemoWorkflow;

impl Workflow for MemoWorkflow {
    fn name(&self) -> &str {
        "Memo Workflow"
    }
    fn signatories(&self) -> Vec<String> {
        vec!["reviewer".into(), "approver".into()]
    }
}

#[derive(Debug, Clone, minicbor::Encode, minicbor::Decode)]
struct PurchaseMemo {
    #[n(0)]
    id: String,
    #[n(1)]
    subject: String,
    #[n(2)]
    amount: u64,
    #[n(3)]
    approval: ApprovalState,
}

impl Signable for PurchaseMemo {
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new("memo", self.id.clone())
    }
    fn identity_data(&self) -> anyhow::Result<String> {
        Ok(format!(
            "{}|{}|{}|{}",
            self.id,
            self.subject,
            self.amount,
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
        Box::new(MemoWorkflow)
    }
    fn on_workflow_next(&self) {
        println!("-> next signatory notified");
    }
    fn on_workflow_end(&self) {
        println!("-> workflow finished");
    }
}

#[derive(Clone)]
struct MemoStore {
    instance: Arc<sled::Db>,
}

impl MemoStore {
    fn key(id: &str) -> String {
        format!("memo/{id}")
    }

    fn save(&self, memo: &PurchaseMemo) -> anyhow::Result<()> {
        self.instance
            .insert(Self::key(&memo.id).as_bytes(), minicbor::to_vec(memo)?)?;
        Ok(())
    }
}

impl SignableStore for MemoStore {
    fn load(&self, id: &str) -> Result<Box<dyn Signable>, SignError> {
        let bytes = self
            .instance
            .get(Self::key(id).as_bytes())
            .map_err(|e| SignError::Store(e.to_string()))?
            .ok_or_else(|| SignError::NotFound {
                kind: "memo".to_string(),
                id: id.to_string(),
            })?;
        let memo: PurchaseMemo =
            minicbor::decode(bytes.as_ref()).map_err(|e| SignError::Store(e.to_string()))?;
        Ok(Box::new(memo))
    }

    fn list(&self) -> Result<Vec<Box<dyn Signable>>, SignError> {
        let mut memos: Vec<Box<dyn Signable>> = vec![];
        for item in self.instance.scan_prefix(b"memo/") {
            let (_, bytes) = item.map_err(|e| SignError::Store(e.to_string()))?;
            let memo: PurchaseMemo =
                minicbor::decode(bytes.as_ref()).map_err(|e| SignError::Store(e.to_string()))?;
            memos.push(Box::new(memo));
        }
        Ok(memos)
    }

    fn update_pending(&self, id: &str, pending: Option<&str>) -> Result<(), SignError> {
        let bytes = self
            .instance
            .get(Self::key(id).as_bytes())
            .map_err(|e| SignError::Store(e.to_string()))?
            .ok_or_else(|| SignError::NotFound {
                kind: "memo".to_string(),
                id: id.to_string(),
            })?;
        let mut memo: PurchaseMemo =
            minicbor::decode(bytes.as_ref()).map_err(|e| SignError::Store(e.to_string()))?;
        memo.approval.current_pending_signatory = pending.map(|p| p.to_string());
        self.save(&memo).map_err(|e| SignError::Store(e.to_string()))
    }
}

struct DemoGrants(HashMap<String, Vec<String>>);

impl GrantSource for DemoGrants {
    fn held_roles(&self, actor: &str, _namespace: &str) -> Vec<String> {
        self.0.get(actor).cloned().unwrap_or_default()
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let db = sled::open("quickstart_db")?;
    if !db.is_empty() {
        db.clear()?;
    }
    let db = Arc::new(db);

    let store = MemoStore {
        instance: db.clone(),
    };
    let mut registry = SignableRegistry::new();
    registry.register("memo", Box::new(store.clone()));

    let mut grants = HashMap::new();
    grants.insert(
        "user_rivera".to_string(),
        vec![CAN_SIGN.to_string(), "reviewer".to_string()],
    );
    grants.insert(
        "user_adeyemi".to_string(),
        vec![CAN_SIGN.to_string(), "approver".to_string()],
    );
    let service = ApprovalService::with_defaults(db, registry, Box::new(DemoGrants(grants)));

    let mut memo = PurchaseMemo {
        id: new_uuid_to_bech32("memo_")?,
        subject: "Replacement lab equipment".to_string(),
        amount: 250_000,
        approval: ApprovalState::default(),
    };
    store.save(&memo)?;

    service.seal(&mut memo)?;
    store.save(&memo)?;
    println!("sealed memo {} digest {:?}", memo.id, memo.approval.digest);

    service.attempt_sign("memo", &memo.id, "user_rivera", true, "numbers verified", "")?;
    service.attempt_sign("memo", &memo.id, "user_adeyemi", true, "budget approved", "")?;

    for signature in service.ledger("memo", &memo.id)? {
        println!(
            "{}: {} [{}] {:?} <- {:?}",
            signature.role_acted_as,
            signature.signer,
            if signature.accepted { "ACCEPTED" } else { "REJECTED" },
            signature.comment,
            signature.predecessor,
        );
    }

    Ok(())
}
