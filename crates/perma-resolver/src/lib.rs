//! Thread resolution for perma.
//!
//! [`ThreadResolver::resolve`] runs a platform's retrieval chain for one
//! reference and, when the result is new work, persists it, fetches its
//! media and recurses into related posts. A cache hit does none of that, so
//! a warm run is read-only.
//!
//! Recursion is bounded by a [`TraversalPath`]: the references already on
//! the way down from the top-level call. A related reference on the path is
//! skipped, which is what terminates reply and quote cycles.

pub mod config;
pub mod error;
pub mod locks;
pub mod path;
pub mod resolver;

pub use config::ResolverConfig;
pub use error::{ResolveError, ResolveResult};
pub use locks::ReferenceLocks;
pub use path::TraversalPath;
pub use resolver::ThreadResolver;
