use std::sync::Arc;

use perma_net::{ArchiveMirror, HttpTransport};
use perma_store::{CacheStore, RunMemo};

/// Shared collaborators handed to every adapter.
#[derive(Clone)]
pub struct PlatformContext {
    pub store: Arc<dyn CacheStore>,
    pub memo: Arc<RunMemo>,
    pub transport: Arc<dyn HttpTransport>,
    pub archive: ArchiveMirror,
}

impl PlatformContext {
    pub fn new(
        store: Arc<dyn CacheStore>,
        memo: Arc<RunMemo>,
        transport: Arc<dyn HttpTransport>,
        archive: ArchiveMirror,
    ) -> Self {
        Self {
            store,
            memo,
            transport,
            archive,
        }
    }
}

impl std::fmt::Debug for PlatformContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformContext")
            .field("memo", &self.memo)
            .field("archive", &self.archive)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use perma_net::ScriptedTransport;
    use perma_store::FsCacheStore;

    pub const ARCHIVE: &str = "https://archive.example";

    /// Context over a temporary cache and a scripted transport.
    pub fn context(root: &std::path::Path) -> (PlatformContext, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let ctx = PlatformContext::new(
            Arc::new(FsCacheStore::new(root)),
            Arc::new(RunMemo::new()),
            Arc::clone(&transport) as Arc<dyn HttpTransport>,
            ArchiveMirror::new(ARCHIVE),
        );
        (ctx, transport)
    }
}
