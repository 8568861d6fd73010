use std::path::PathBuf;

use perma_types::{MediaScope, PostRecord, PostReference};

use crate::error::StoreResult;

/// A record read back from the cache.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedPost {
    /// The complete reference the record was stored under. For a lookup by a
    /// partial reference this carries the user id recovered from the layout.
    pub reference: PostReference,
    pub record: PostRecord,
    pub path: PathBuf,
}

/// Reference-keyed post cache.
///
/// All implementations must satisfy these invariants:
/// - Every reference is validated before the backend is touched; an unsafe
///   reference fails with a path-safety error and has no side effects.
/// - `read` has no side effects.
/// - `write` is atomic per record.
/// - `noun` names the platform collection (`tweet`, `skeet`, `toot`).
pub trait CacheStore: Send + Sync {
    /// Read a cached record.
    ///
    /// Returns `Ok(None)` on a cache miss. A partial reference (no user id)
    /// matches any author on the same instance with the same post id.
    fn read(&self, noun: &str, reference: &PostReference) -> StoreResult<Option<CachedPost>>;

    /// Persist a record under a complete reference and return its path.
    fn write(
        &self,
        noun: &str,
        reference: &PostReference,
        record: &PostRecord,
    ) -> StoreResult<PathBuf>;

    /// Whether a record is cached for this reference.
    fn exists(&self, noun: &str, reference: &PostReference) -> StoreResult<bool> {
        Ok(self.read(noun, reference)?.is_some())
    }

    /// Destination for a media file, with its parent directory created.
    fn media_path(
        &self,
        noun: &str,
        reference: &PostReference,
        media_name: &str,
        scope: MediaScope,
    ) -> StoreResult<PathBuf>;

    /// Bytes of a stored media file, or `None` if it was never fetched or
    /// is an empty placeholder. Creates nothing.
    fn read_media(
        &self,
        noun: &str,
        reference: &PostReference,
        media_name: &str,
        scope: MediaScope,
    ) -> StoreResult<Option<Vec<u8>>>;
}
