//! Embedding resolved posts into markdown documents.
//!
//! Two modes share one resolver:
//!
//! - **Rewrite** ([`EmbedRewriter::rewrite_file`]): post links in a source
//!   file get a caption and a canonical URL, and the file is written back
//!   only if something changed.
//! - **Inline** ([`EmbedRewriter::render_inline`]): image-style post links
//!   are replaced by the platform's HTML embed at render time, or by a
//!   visible error block when the post cannot be loaded.
//!
//! A failing link never aborts the document, and [`batch::run`] never lets a
//! failing file abort the batch.

pub mod batch;
pub mod config;
pub mod error;
pub mod links;
pub mod rewriter;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{expand_patterns, BatchReport};
pub use config::{EmbedConfig, RewriteMode};
pub use error::{EmbedError, EmbedResult};
pub use rewriter::{EmbedRewriter, Rewrite};
