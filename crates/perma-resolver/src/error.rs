use perma_chain::ChainError;
use perma_store::StoreError;

/// Errors raised for the reference passed to a resolve call.
///
/// Failures of related posts and media are logged, not returned.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("could not persist post: {0}")]
    Store(#[from] StoreError),
}

impl ResolveError {
    pub fn is_path_safety(&self) -> bool {
        match self {
            Self::Chain(e) => e.is_path_safety(),
            Self::Store(e) => e.is_path_safety(),
        }
    }

    /// Every strategy failed, or there were none.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Chain(ChainError::Exhausted { .. } | ChainError::Empty { .. })
        )
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;
