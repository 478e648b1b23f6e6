//! Role grant lookup and signatory eligibility matching

use super::signable::Signable;
use std::collections::BTreeSet;

/// The namespace-level grant an actor must hold before any role in that
/// namespace is considered at all.
pub const CAN_SIGN: &str = "can_sign_signable";

/// Read-only source of the role tokens an actor holds within one
/// document-type namespace. Grants are owned by the caller's identity
/// system, not by this engine.
pub trait GrantSource: Send + Sync {
    fn held_roles(&self, actor: &str, namespace: &str) -> Vec<String>;
}

/// All roles the actor holds in the namespace, sorted and deduplicated.
pub fn related_roles(grants: &dyn GrantSource, actor: &str, namespace: &str) -> Vec<String> {
    let set: BTreeSet<String> = grants.held_roles(actor, namespace).into_iter().collect();
    set.into_iter().collect()
}

/// The sorted intersection of the actor's held roles and the signable's
/// required signatories. Used to pre-filter listings; an individual sign
/// attempt must additionally hold the specific pending role.
pub fn eligible_roles(grants: &dyn GrantSource, actor: &str, signable: &dyn Signable) -> Vec<String> {
    let namespace = signable.entity_ref().kind;
    let held: BTreeSet<String> = grants.held_roles(actor, &namespace).into_iter().collect();

    let mut matched: Vec<String> = signable
        .approval()
        .signatories
        .iter()
        .filter(|role| held.contains(*role))
        .cloned()
        .collect();
    matched.sort();
    matched.dedup();
    matched
}

/// Whether the actor holds the namespace-level signing gate.
pub fn can_sign(grants: &dyn GrantSource, actor: &str, namespace: &str) -> bool {
    grants
        .held_roles(actor, namespace)
        .iter()
        .any(|role| role == CAN_SIGN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signable::{ApprovalState, Signable, Workflow};
    use crate::signature::EntityRef;
    use std::collections::HashMap;

    struct MapGrants(HashMap<(String, String), Vec<String>>);

    impl GrantSource for MapGrants {
        fn held_roles(&self, actor: &str, namespace: &str) -> Vec<String> {
            self.0
                .get(&(actor.to_string(), namespace.to_string()))
                .cloned()
                .unwrap_or_default()
        }
    }

    struct FixedWorkflow;

    impl Workflow for FixedWorkflow {
        fn name(&self) -> &str {
            "fixed"
        }
        fn signatories(&self) -> Vec<String> {
            vec!["reviewer".into(), "approver".into()]
        }
    }

    struct Doc {
        approval: ApprovalState,
    }

    impl Signable for Doc {
        fn entity_ref(&self) -> EntityRef {
            EntityRef::new("invoice", "inv-1")
        }
        fn identity_data(&self) -> anyhow::Result<String> {
            Ok("doc".into())
        }
        fn approval(&self) -> &ApprovalState {
            &self.approval
        }
        fn approval_mut(&mut self) -> &mut ApprovalState {
            &mut self.approval
        }
        fn workflow(&self) -> Box<dyn Workflow> {
            Box::new(FixedWorkflow)
        }
    }

    fn doc_with_signatories() -> Doc {
        let mut approval = ApprovalState::default();
        approval.signatories = vec!["reviewer".into(), "approver".into()];
        Doc { approval }
    }

    #[test]
    fn related_roles_are_sorted_and_deduped() {
        let mut map = HashMap::new();
        map.insert(
            ("u1".to_string(), "invoice".to_string()),
            vec!["b".to_string(), "a".to_string(), "b".to_string()],
        );
        let grants = MapGrants(map);

        assert_eq!(related_roles(&grants, "u1", "invoice"), vec!["a", "b"]);
        assert!(related_roles(&grants, "u1", "order").is_empty());
    }

    #[test]
    fn eligibility_is_the_intersection_with_signatories() {
        let mut map = HashMap::new();
        map.insert(
            ("u1".to_string(), "invoice".to_string()),
            vec!["approver".to_string(), "unrelated".to_string()],
        );
        let grants = MapGrants(map);
        let doc = doc_with_signatories();

        assert_eq!(eligible_roles(&grants, "u1", &doc), vec!["approver"]);
        assert!(eligible_roles(&grants, "u2", &doc).is_empty());
    }

    #[test]
    fn namespace_gate_requires_the_can_sign_grant() {
        let mut map = HashMap::new();
        map.insert(
            ("u1".to_string(), "invoice".to_string()),
            vec![CAN_SIGN.to_string(), "reviewer".to_string()],
        );
        map.insert(
            ("u2".to_string(), "invoice".to_string()),
            vec!["reviewer".to_string()],
        );
        let grants = MapGrants(map);

        assert!(can_sign(&grants, "u1", "invoice"));
        assert!(!can_sign(&grants, "u2", "invoice"));
    }
}
