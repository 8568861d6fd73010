use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use perma_types::PostReference;
use tracing::warn;

use crate::error::{StrategyError, StrategyResult};
use crate::strategy::{Retrieval, RetrievalStrategy};

/// Bounds another strategy by wall-clock time.
///
/// The inner strategy runs on its own thread. If it has not answered within
/// the budget the chain moves on with [`StrategyError::Timeout`]; the worker
/// is detached and its late result is dropped.
pub struct TimeLimited {
    inner: Arc<dyn RetrievalStrategy>,
    budget: Duration,
}

impl TimeLimited {
    pub fn new(inner: Arc<dyn RetrievalStrategy>, budget: Duration) -> Self {
        Self { inner, budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

impl RetrievalStrategy for TimeLimited {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let owned = reference.clone();

        thread::Builder::new()
            .name(format!("perma-{}", inner.name()))
            .spawn(move || {
                // The receiver is gone once the budget has expired.
                let _ = tx.send(inner.retrieve(&owned));
            })
            .map_err(|e| StrategyError::Configuration(format!("cannot spawn worker: {e}")))?;

        match rx.recv_timeout(self.budget) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(reference = %reference, strategy = self.name(), budget_ms = self.budget.as_millis() as u64, "strategy over budget");
                Err(StrategyError::Timeout(self.budget))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(StrategyError::Malformed(format!(
                "{} worker exited without a result",
                self.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perma_types::PostRecord;
    use serde_json::json;

    struct Sleepy(Duration);

    impl RetrievalStrategy for Sleepy {
        fn name(&self) -> &str {
            "sleepy"
        }

        fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
            thread::sleep(self.0);
            Ok(Retrieval::fresh(reference.clone(), PostRecord::new(json!({}))))
        }
    }

    #[test]
    fn fast_inner_passes_through() {
        let s = TimeLimited::new(Arc::new(Sleepy(Duration::ZERO)), Duration::from_secs(5));
        assert_eq!(s.name(), "sleepy");
        assert!(s.retrieve(&PostReference::new("a", "1")).is_ok());
    }

    #[test]
    fn slow_inner_times_out() {
        let s = TimeLimited::new(
            Arc::new(Sleepy(Duration::from_secs(2))),
            Duration::from_millis(20),
        );
        let err = s.retrieve(&PostReference::new("a", "1")).unwrap_err();
        assert!(matches!(err, StrategyError::Timeout(_)));
    }
}
