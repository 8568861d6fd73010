use std::collections::HashMap;
use std::sync::RwLock;

use perma_types::{PostRecord, PostReference};

/// Records fetched as a side effect of another lookup, held for one run.
///
/// A scraped page often contains more posts than the one asked for (a
/// conversation view lists the replies). Those are primed here so a later
/// lookup of the same reference can skip the network. Entries are never
/// evicted: the memo lives exactly as long as one batch or build, and its
/// growth is bounded by the number of posts that run touches.
pub struct RunMemo {
    records: RwLock<HashMap<PostReference, PostRecord>>,
}

impl RunMemo {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Remember a record. An existing entry for the same reference is kept.
    pub fn prime(&self, reference: PostReference, record: PostRecord) {
        let mut map = self.records.write().expect("lock poisoned");
        map.entry(reference).or_insert(record);
    }

    pub fn get(&self, reference: &PostReference) -> Option<PostRecord> {
        self.records
            .read()
            .expect("lock poisoned")
            .get(reference)
            .cloned()
    }

    pub fn contains(&self, reference: &PostReference) -> bool {
        self.records
            .read()
            .expect("lock poisoned")
            .contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }
}

impl Default for RunMemo {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RunMemo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunMemo")
            .field("record_count", &self.len())
            .finish()
    }
}
