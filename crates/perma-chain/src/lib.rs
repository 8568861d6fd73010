//! Ordered-fallback retrieval for perma.
//!
//! A [`RetrievalChain`] is an ordered list of [`RetrievalStrategy`]
//! implementations. Each platform builds one chain, typically:
//!
//! ```text
//! local cache -> primary API -> scraping mirror -> web archive
//! ```
//!
//! The chain tries strategies strictly in order and returns the first
//! success. A failing strategy is logged and skipped; its error never
//! crosses the chain boundary. Only two things do:
//!
//! - [`ChainError::PathSafety`] -- the reference would escape the cache root;
//!   raised before any strategy runs.
//! - [`ChainError::Exhausted`] -- every strategy failed; carries the last
//!   strategy's error.
//!
//! The chain itself has no side effects. Persisting a fresh result and
//! following related posts is the caller's job, signalled by
//! [`Retrieved::is_new_work`].

pub mod chain;
pub mod error;
pub mod strategies;
pub mod strategy;

pub use chain::{AttemptRecord, RetrievalChain, Retrieved};
pub use error::{ChainError, ChainResult, StrategyError, StrategyResult};
pub use strategies::{CacheStrategy, MemoStrategy, TimeLimited};
pub use strategy::{Retrieval, RetrievalStrategy};
