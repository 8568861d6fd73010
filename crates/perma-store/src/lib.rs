//! Flat-file post cache for perma.
//!
//! Every resolved post is stored as one pretty-printed JSON file at a path
//! derived only from its reference:
//!
//! ```text
//! <root>/posts/<noun>s/[<instance>/]<user_id>/s<post_id>.json
//! <root>/posts/<noun>s/[<instance>/]<user_id>/s<post_id>-<media_name>
//! <root>/posts/<noun>s/[<instance>/]<user_id>/savatar-<media_name>
//! ```
//!
//! Existence of the file is a cache hit. There is no eviction; the cache is
//! append-only and safe to delete by hand.
//!
//! # Storage Backends
//!
//! All backends implement the [`CacheStore`] trait:
//!
//! - [`FsCacheStore`] -- the on-disk layout above
//!
//! [`RunMemo`] is a separate, process-lifetime map of records that were seen
//! on the network but not yet persisted (e.g. sibling posts on a scraped
//! page). It is never written to disk by this crate.
//!
//! # Design Rules
//!
//! 1. Every path component is validated before any filesystem call.
//! 2. Writes are atomic: a temporary file in the target directory is renamed
//!    into place, so readers never see a half-written record.
//! 3. The store never interprets record contents.

pub mod config;
pub mod error;
pub mod fs;
pub mod layout;
pub mod memo;
pub mod traits;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use fs::FsCacheStore;
pub use layout::CacheLayout;
pub use memo::RunMemo;
pub use traits::{CacheStore, CachedPost};
