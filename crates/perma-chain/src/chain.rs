use std::time::{Duration, Instant};

use perma_types::{PostRecord, PostReference};
use tracing::{debug, warn};

use crate::error::{ChainError, ChainResult, StrategyError};
use crate::strategy::RetrievalStrategy;

// ---------------------------------------------------------------------------
// AttemptRecord
// ---------------------------------------------------------------------------

/// Outcome of one strategy during a chain run.
#[derive(Clone, Debug)]
pub struct AttemptRecord {
    pub strategy_name: String,
    pub succeeded: bool,
    /// The error message when the strategy failed.
    pub reason: Option<String>,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Retrieved
// ---------------------------------------------------------------------------

/// The winning result of a chain run.
#[derive(Clone, Debug)]
pub struct Retrieved {
    pub reference: PostReference,
    pub record: PostRecord,
    pub is_new_work: bool,
    /// Name of the strategy that produced the record.
    pub strategy: String,
    /// Every strategy tried, in order, ending with the winner.
    pub attempts: Vec<AttemptRecord>,
}

// ---------------------------------------------------------------------------
// RetrievalChain
// ---------------------------------------------------------------------------

/// An ordered list of strategies evaluated until one succeeds.
pub struct RetrievalChain {
    strategies: Vec<Box<dyn RetrievalStrategy>>,
}

impl RetrievalChain {
    /// An empty chain. Use [`Self::add_strategy`] or [`Self::with`] to fill it.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Append a strategy to the end of the chain.
    pub fn add_strategy(&mut self, strategy: Box<dyn RetrievalStrategy>) {
        self.strategies.push(strategy);
    }

    /// Builder form of [`Self::add_strategy`].
    pub fn with(mut self, strategy: impl RetrievalStrategy + 'static) -> Self {
        self.add_strategy(Box::new(strategy));
        self
    }

    pub fn strategy_count(&self) -> usize {
        self.strategies.len()
    }

    /// Strategy names in evaluation order.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the chain for one reference.
    ///
    /// The reference is validated before any strategy sees it. Strategies
    /// run strictly in order; the first success is returned immediately and
    /// later strategies are not consulted.
    pub fn retrieve(&self, reference: &PostReference) -> ChainResult<Retrieved> {
        reference.validate()?;

        let mut attempts = Vec::with_capacity(self.strategies.len());
        let mut last: Option<StrategyError> = None;

        for strategy in &self.strategies {
            let start = Instant::now();
            let outcome = strategy.retrieve(reference);
            let elapsed = start.elapsed();

            match outcome {
                Ok(retrieval) => {
                    debug!(
                        reference = %reference,
                        strategy = strategy.name(),
                        new_work = retrieval.is_new_work,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "strategy succeeded"
                    );
                    attempts.push(AttemptRecord {
                        strategy_name: strategy.name().to_string(),
                        succeeded: true,
                        reason: None,
                        elapsed,
                    });
                    return Ok(Retrieved {
                        reference: retrieval.reference,
                        record: retrieval.record,
                        is_new_work: retrieval.is_new_work,
                        strategy: strategy.name().to_string(),
                        attempts,
                    });
                }
                Err(error) => {
                    if error.is_not_found() {
                        debug!(reference = %reference, strategy = strategy.name(), %error, "strategy missed");
                    } else {
                        warn!(reference = %reference, strategy = strategy.name(), %error, "strategy failed");
                    }
                    attempts.push(AttemptRecord {
                        strategy_name: strategy.name().to_string(),
                        succeeded: false,
                        reason: Some(error.to_string()),
                        elapsed,
                    });
                    last = Some(error);
                }
            }
        }

        match last {
            Some(last) => Err(ChainError::Exhausted {
                reference: reference.clone(),
                attempts: attempts.len(),
                last,
            }),
            None => Err(ChainError::Empty {
                reference: reference.clone(),
            }),
        }
    }
}

impl Default for RetrievalChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RetrievalChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalChain")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StrategyResult;
    use crate::strategy::Retrieval;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed {
        name: &'static str,
        succeed: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn boxed(name: &'static str, succeed: bool, calls: &Arc<AtomicUsize>) -> Box<Self> {
            Box::new(Self {
                name,
                succeed,
                calls: Arc::clone(calls),
            })
        }
    }

    impl RetrievalStrategy for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(Retrieval::fresh(
                    reference.clone(),
                    PostRecord::new(json!({"from": self.name})),
                ))
            } else {
                Err(StrategyError::NotFound(format!("{} has nothing", self.name)))
            }
        }
    }

    #[test]
    fn fourth_strategy_wins_and_fifth_never_runs() {
        let calls: Vec<_> = (0..5).map(|_| Arc::new(AtomicUsize::new(0))).collect();
        let mut chain = RetrievalChain::new();
        chain.add_strategy(Fixed::boxed("cache", false, &calls[0]));
        chain.add_strategy(Fixed::boxed("api", false, &calls[1]));
        chain.add_strategy(Fixed::boxed("scrape", false, &calls[2]));
        chain.add_strategy(Fixed::boxed("archive", true, &calls[3]));
        chain.add_strategy(Fixed::boxed("never", true, &calls[4]));

        let got = chain.retrieve(&PostReference::new("alice", "42")).unwrap();
        assert_eq!(got.strategy, "archive");
        assert_eq!(got.record.string_at("/from").as_deref(), Some("archive"));
        assert!(got.is_new_work);
        assert_eq!(got.attempts.len(), 4);
        assert!(got.attempts[..3].iter().all(|a| !a.succeeded && a.reason.is_some()));
        assert!(got.attempts[3].succeeded);

        for c in &calls[..4] {
            assert_eq!(c.load(Ordering::SeqCst), 1);
        }
        assert_eq!(calls[4].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn exhausted_carries_last_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut chain = RetrievalChain::new();
        chain.add_strategy(Fixed::boxed("a", false, &calls));
        chain.add_strategy(Fixed::boxed("b", false, &calls));

        let err = chain.retrieve(&PostReference::new("alice", "1")).unwrap_err();
        match err {
            ChainError::Exhausted { attempts, last, .. } => {
                assert_eq!(attempts, 2);
                assert!(last.to_string().contains("b has nothing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unsafe_reference_fails_before_any_strategy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut chain = RetrievalChain::new();
        chain.add_strategy(Fixed::boxed("a", true, &calls));

        let err = chain
            .retrieve(&PostReference::new("../../etc", "1"))
            .unwrap_err();
        assert!(err.is_path_safety());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_chain() {
        let err = RetrievalChain::new()
            .retrieve(&PostReference::new("alice", "1"))
            .unwrap_err();
        assert!(matches!(err, ChainError::Empty { .. }));
    }
}
