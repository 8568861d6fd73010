//! Media acquisition for perma.
//!
//! [`MediaFetcher::fetch`] stores one [`MediaAsset`](perma_types::MediaAsset)
//! at a destination path chosen by the cache store. It is idempotent: an
//! existing destination is never re-fetched.
//!
//! For URL sources the order is direct GET, then the web-archive mirror, then
//! an empty placeholder file so a dead asset is not retried on every build.
//! Delegated command sources get no placeholder; their failure propagates.

pub mod error;
pub mod fetcher;
pub mod runner;

pub use error::{MediaError, MediaResult};
pub use fetcher::{MediaFetcher, MediaOutcome};
pub use runner::{CommandRunner, RecordingRunner, SystemCommandRunner};
