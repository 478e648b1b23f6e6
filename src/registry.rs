//! Explicit type-tag lookup for signable document stores
//!
//! Replaces a generic "any model" foreign key with a registry resolved at
//! the boundary: each document-owning module registers its store under the
//! type tag used in [`crate::signature::EntityRef::kind`].

use super::error::SignError;
use super::signable::Signable;
use std::collections::HashMap;

/// Storage owned by a document module. `load` is expected to have run
/// [`crate::signable::verify_on_load`] on materialization; the engine
/// re-verifies defensively before acting on the document.
pub trait SignableStore: Send + Sync {
    fn load(&self, id: &str) -> Result<Box<dyn Signable>, SignError>;

    fn list(&self) -> Result<Vec<Box<dyn Signable>>, SignError>;

    /// Persist the recomputed pending-signatory pointer for one document.
    fn update_pending(&self, id: &str, pending: Option<&str>) -> Result<(), SignError>;
}

/// Maps signable type tags to their document stores.
#[derive(Default)]
pub struct SignableRegistry {
    stores: HashMap<String, Box<dyn SignableStore>>,
}

impl SignableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: impl Into<String>, store: Box<dyn SignableStore>) {
        self.stores.insert(kind.into(), store);
    }

    pub fn get(&self, kind: &str) -> Result<&dyn SignableStore, SignError> {
        self.stores
            .get(kind)
            .map(|s| s.as_ref())
            .ok_or_else(|| SignError::UnknownSignableType(kind.to_string()))
    }
}
