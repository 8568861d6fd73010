use perma_types::{PostRecord, PostReference};

use crate::error::StrategyResult;

/// A record produced by one strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct Retrieval {
    /// The reference the record belongs to. Usually the requested one; a
    /// strategy that learns a missing user id returns the completed copy.
    pub reference: PostReference,
    pub record: PostRecord,
    /// `false` only when the record came from the persistent cache.
    pub is_new_work: bool,
}

impl Retrieval {
    /// A record obtained from outside the persistent cache.
    pub fn fresh(reference: PostReference, record: PostRecord) -> Self {
        Self {
            reference,
            record,
            is_new_work: true,
        }
    }

    /// A record read back from the persistent cache.
    pub fn cached(reference: PostReference, record: PostRecord) -> Self {
        Self {
            reference,
            record,
            is_new_work: false,
        }
    }
}

/// One way of obtaining a post.
///
/// Implementations report failure with an error value; they must not panic
/// to signal "try the next one". Strategies are shared between threads.
pub trait RetrievalStrategy: Send + Sync {
    /// Human-readable name, used in logs and attempt records.
    fn name(&self) -> &str;

    /// Try to obtain the post. The reference has already been validated.
    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval>;
}
