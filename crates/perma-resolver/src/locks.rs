use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use perma_types::PostReference;

/// One mutex per post, created on first use and kept for the run.
///
/// Holding a post's mutex across retrieval and persistence means a second
/// caller for the same post waits and then finds it in the cache. Locks are
/// keyed by [`PostReference::post_identity`], so a reference that has not
/// learned its user id yet waits on the same mutex as its completed form.
#[derive(Default)]
pub struct ReferenceLocks {
    locks: Mutex<HashMap<PostReference, Arc<Mutex<()>>>>,
}

impl ReferenceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_reference(&self, reference: &PostReference) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock poisoned");
        Arc::clone(locks.entry(reference.post_identity()).or_default())
    }

    pub fn len(&self) -> usize {
        self.locks.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ReferenceLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceLocks")
            .field("references", &self.len())
            .finish()
    }
}
