use std::sync::Arc;

use perma_store::RunMemo;
use perma_types::PostReference;

use crate::error::{StrategyError, StrategyResult};
use crate::strategy::{Retrieval, RetrievalStrategy};

/// Serves records primed earlier in the same run.
///
/// Primed records were fetched but never persisted, so a hit counts as new
/// work and the caller persists it.
pub struct MemoStrategy {
    memo: Arc<RunMemo>,
}

impl MemoStrategy {
    pub fn new(memo: Arc<RunMemo>) -> Self {
        Self { memo }
    }
}

impl RetrievalStrategy for MemoStrategy {
    fn name(&self) -> &str {
        "memo"
    }

    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
        self.memo
            .get(reference)
            .map(|record| Retrieval::fresh(reference.clone(), record))
            .ok_or_else(|| StrategyError::NotFound(format!("{reference} not seen this run")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perma_types::PostRecord;
    use serde_json::json;

    #[test]
    fn primed_record_is_new_work() {
        let memo = Arc::new(RunMemo::new());
        let r = PostReference::new("alice", "9");
        memo.prime(r.clone(), PostRecord::new(json!({"id_str": "9"})));

        let got = MemoStrategy::new(Arc::clone(&memo)).retrieve(&r).unwrap();
        assert!(got.is_new_work);

        let miss = MemoStrategy::new(memo).retrieve(&PostReference::new("alice", "10"));
        assert!(miss.unwrap_err().is_not_found());
    }
}
