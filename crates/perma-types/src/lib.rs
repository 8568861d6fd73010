//! Foundation types for perma.
//!
//! This crate provides the identity and payload types shared by every other
//! perma crate. It performs no I/O.
//!
//! # Key Types
//!
//! - [`PostReference`]: Immutable identity of a post (instance, user, post id)
//! - [`PostRecord`]: Normalized post payload, opaque apart from a few fields
//! - [`MediaAsset`]: A named downloadable asset and where to get it from
//! - [`MediaSource`]: Plain URL or delegated download command
//!
//! Path safety lives in [`safety`]: every string that ends up as a cache path
//! component is checked there before it is allowed near the filesystem.

pub mod error;
pub mod media;
pub mod record;
pub mod reference;
pub mod safety;

pub use error::{TypeError, TypeResult};
pub use media::{DelegatedDownload, MediaAsset, MediaScope, MediaSource, DEST_PLACEHOLDER};
pub use record::PostRecord;
pub use reference::PostReference;
pub use safety::{strip_query, validate_component};
