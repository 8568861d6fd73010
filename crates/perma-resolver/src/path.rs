use std::fmt;
use std::sync::Arc;

use perma_types::PostReference;

struct Link {
    reference: PostReference,
    parent: Option<Arc<Link>>,
}

/// The references between a top-level resolve call and the current one.
///
/// Immutable: [`Self::with`] returns an extended path that shares its tail
/// with the original, so siblings never see each other's entries.
#[derive(Clone, Default)]
pub struct TraversalPath {
    head: Option<Arc<Link>>,
    len: usize,
}

impl TraversalPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(&self, reference: PostReference) -> Self {
        Self {
            head: Some(Arc::new(Link {
                reference,
                parent: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn contains(&self, reference: &PostReference) -> bool {
        self.iter().any(|r| r == reference)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &PostReference> {
        std::iter::successors(self.head.as_deref(), |link| link.parent.as_deref())
            .map(|link| &link.reference)
    }
}

impl fmt::Debug for TraversalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_does_not_touch_the_original() {
        let root = TraversalPath::new();
        let a = PostReference::new("alice", "1");
        let b = PostReference::new("bob", "2");

        let one = root.with(a.clone());
        let two = one.with(b.clone());

        assert!(root.is_empty());
        assert!(one.contains(&a) && !one.contains(&b));
        assert!(two.contains(&a) && two.contains(&b));
        assert_eq!(two.len(), 2);
        assert_eq!(two.iter().collect::<Vec<_>>(), vec![&b, &a]);
    }

    #[test]
    fn siblings_are_independent() {
        let base = TraversalPath::new().with(PostReference::new("alice", "1"));
        let left = base.with(PostReference::new("bob", "2"));
        let right = base.with(PostReference::new("carol", "3"));
        assert!(!left.contains(&PostReference::new("carol", "3")));
        assert!(!right.contains(&PostReference::new("bob", "2")));
    }
}
