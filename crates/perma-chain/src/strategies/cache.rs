use std::sync::Arc;

use perma_store::CacheStore;
use perma_types::PostReference;

use crate::error::{StrategyError, StrategyResult};
use crate::strategy::{Retrieval, RetrievalStrategy};

/// Reads the persistent cache. Always first in a chain.
///
/// A hit is the only retrieval with `is_new_work == false`, which keeps warm
/// resolutions free of writes and network follow-ups.
pub struct CacheStrategy {
    store: Arc<dyn CacheStore>,
    noun: &'static str,
}

impl CacheStrategy {
    pub fn new(store: Arc<dyn CacheStore>, noun: &'static str) -> Self {
        Self { store, noun }
    }
}

impl RetrievalStrategy for CacheStrategy {
    fn name(&self) -> &str {
        "cache"
    }

    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
        match self.store.read(self.noun, reference)? {
            Some(hit) => Ok(Retrieval::cached(hit.reference, hit.record)),
            None => Err(StrategyError::NotFound(format!("{reference} not cached"))),
        }
    }
}
