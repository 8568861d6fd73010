use std::sync::Arc;

use perma_chain::Retrieved;
use perma_media::MediaFetcher;
use perma_platforms::PlatformAdapter;
use perma_store::CacheStore;
use perma_types::{PostRecord, PostReference};
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::ResolveResult;
use crate::locks::ReferenceLocks;
use crate::path::TraversalPath;

/// Resolves posts and everything they point at.
///
/// Shared across threads; concurrent calls for the same reference are
/// serialised so a post is fetched and written at most once per run.
pub struct ThreadResolver {
    store: Arc<dyn CacheStore>,
    media: MediaFetcher,
    locks: ReferenceLocks,
    config: ResolverConfig,
}

impl ThreadResolver {
    pub fn new(store: Arc<dyn CacheStore>, media: MediaFetcher, config: ResolverConfig) -> Self {
        Self {
            store,
            media,
            locks: ReferenceLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a top-level reference with the configured media policy.
    pub fn resolve(
        &self,
        adapter: &dyn PlatformAdapter,
        reference: &PostReference,
    ) -> ResolveResult<PostRecord> {
        self.resolve_with(
            adapter,
            reference,
            self.config.fetch_media,
            &TraversalPath::new(),
        )
        .map(|retrieved| retrieved.record)
    }

    /// Resolve one reference below `path`.
    ///
    /// Only the chain result for `reference` itself can fail the call.
    /// Media and related-post failures are logged and skipped.
    pub fn resolve_with(
        &self,
        adapter: &dyn PlatformAdapter,
        reference: &PostReference,
        fetch_media: bool,
        path: &TraversalPath,
    ) -> ResolveResult<Retrieved> {
        let retrieved = {
            let lock = self.locks.for_reference(reference);
            let _guard = lock.lock().expect("lock poisoned");

            let retrieved = adapter.chain().retrieve(reference)?;
            if !retrieved.is_new_work {
                debug!(reference = %retrieved.reference, "cache hit");
                return Ok(retrieved);
            }

            let written = self
                .store
                .write(adapter.noun(), &retrieved.reference, &retrieved.record)?;
            info!(
                reference = %retrieved.reference,
                strategy = %retrieved.strategy,
                path = %written.display(),
                "persisted {}",
                adapter.noun()
            );

            if fetch_media {
                self.fetch_media(adapter, &retrieved);
            }
            retrieved
        };

        if self.config.follow_related {
            let below = path
                .with(reference.clone())
                .with(retrieved.reference.clone());
            for related in adapter.extract_related(&retrieved.record, &retrieved.reference) {
                if below.contains(&related) {
                    debug!(reference = %related, "already on traversal path");
                    continue;
                }
                if let Err(error) = self.resolve_with(adapter, &related, fetch_media, &below) {
                    warn!(
                        reference = %related,
                        parent = %retrieved.reference,
                        %error,
                        "could not resolve related {}",
                        adapter.noun()
                    );
                }
            }
        }

        Ok(retrieved)
    }

    fn fetch_media(&self, adapter: &dyn PlatformAdapter, retrieved: &Retrieved) {
        for asset in adapter.extract_media(&retrieved.record) {
            let dest = match self.store.media_path(
                adapter.noun(),
                &retrieved.reference,
                &asset.name,
                asset.scope,
            ) {
                Ok(dest) => dest,
                Err(error) => {
                    warn!(asset = %asset.name, %error, "no usable media path");
                    continue;
                }
            };
            if let Err(error) = self.media.fetch(&asset, &dest) {
                warn!(
                    reference = %retrieved.reference,
                    asset = %asset.name,
                    %error,
                    "media download failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for ThreadResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadResolver")
            .field("config", &self.config)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}
