use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::safety::validate_component;

/// Identity of a post on a third-party platform.
///
/// A `PostReference` is an immutable value: equality and hashing cover every
/// field, so it doubles as a cache key and as a traversal-path token.
///
/// `instance` is only present on multi-instance platforms. `user_id` may be
/// absent on platforms where a post can be addressed by instance and id
/// alone; such a reference can be looked up but not persisted until
/// [`Self::with_user_id`] has produced a complete copy.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    post_id: String,
}

impl PostReference {
    /// Reference on a single-instance platform.
    pub fn new(user_id: impl Into<String>, post_id: impl Into<String>) -> Self {
        Self {
            instance: None,
            user_id: Some(user_id.into()),
            post_id: post_id.into(),
        }
    }

    /// Reference on a multi-instance platform. `user_id` may be unknown.
    pub fn on_instance(
        instance: impl Into<String>,
        user_id: Option<String>,
        post_id: impl Into<String>,
    ) -> Self {
        Self {
            instance: Some(instance.into()),
            user_id,
            post_id: post_id.into(),
        }
    }

    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    /// Whether every field needed to compute a cache path is known.
    pub fn is_complete(&self) -> bool {
        self.user_id.is_some()
    }

    /// The user id, or an error naming this reference.
    pub fn require_user_id(&self) -> TypeResult<&str> {
        self.user_id
            .as_deref()
            .ok_or_else(|| TypeError::InvalidReference(format!("{self} has no user id")))
    }

    /// Return a copy with `user_id` filled in.
    ///
    /// This never changes `self`. If the reference already carries a user id
    /// the original is returned unchanged, so a resolved identity cannot be
    /// rewritten after its cache path has been computed.
    pub fn with_user_id(&self, user_id: impl Into<String>) -> Self {
        if self.user_id.is_some() {
            return self.clone();
        }
        Self {
            user_id: Some(user_id.into()),
            ..self.clone()
        }
    }

    /// The part of the reference that identifies the post itself.
    ///
    /// On a multi-instance platform the instance and post id are enough, so
    /// a reference still missing its user id and its completed copy share
    /// one identity. Elsewhere every field counts.
    pub fn post_identity(&self) -> Self {
        match self.instance {
            Some(_) => Self {
                user_id: None,
                ..self.clone()
            },
            None => self.clone(),
        }
    }

    /// Check that every present field is a safe cache path component.
    pub fn validate(&self) -> TypeResult<()> {
        if let Some(instance) = &self.instance {
            validate_component("instance", instance)?;
        }
        if let Some(user_id) = &self.user_id {
            validate_component("user_id", user_id)?;
        }
        validate_component("post_id", &self.post_id)
    }
}

impl fmt::Debug for PostReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PostReference({self})")
    }
}

impl fmt::Display for PostReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(instance) = &self.instance {
            write!(f, "{instance}/")?;
        }
        match &self.user_id {
            Some(user) => write!(f, "@{user}/{}", self.post_id),
            None => write!(f, "@?/{}", self.post_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_covers_all_fields() {
        let a = PostReference::new("alice", "42");
        let b = PostReference::new("alice", "42");
        let c = PostReference::new("alice", "43");
        assert_eq!(a, b);
        assert_ne!(a, c);

        let on_one = PostReference::on_instance("one.example", Some("alice".into()), "42");
        let on_two = PostReference::on_instance("two.example", Some("alice".into()), "42");
        assert_ne!(on_one, on_two);
        assert_ne!(on_one, a);
    }

    #[test]
    fn post_identity_ignores_user_only_on_instances() {
        let partial = PostReference::on_instance("m.example", None, "109");
        let complete = partial.with_user_id("alice");
        assert_ne!(partial, complete);
        assert_eq!(partial.post_identity(), complete.post_identity());

        let alice = PostReference::new("alice", "42");
        let bob = PostReference::new("bob", "42");
        assert_eq!(alice.post_identity(), alice);
        assert_ne!(alice.post_identity(), bob.post_identity());
    }

    #[test]
    fn usable_as_set_member() {
        let mut set = HashSet::new();
        set.insert(PostReference::new("alice", "42"));
        assert!(set.contains(&PostReference::new("alice", "42")));
        assert!(!set.contains(&PostReference::new("bob", "42")));
    }

    #[test]
    fn with_user_id_returns_new_value() {
        let partial = PostReference::on_instance("mastodon.social", None, "1001");
        assert!(!partial.is_complete());

        let full = partial.with_user_id("alice");
        assert_eq!(full.user_id(), Some("alice"));
        assert_eq!(partial.user_id(), None);
        assert_ne!(partial, full);
    }

    #[test]
    fn with_user_id_never_overwrites() {
        let full = PostReference::new("alice", "42");
        let same = full.with_user_id("mallory");
        assert_eq!(same.user_id(), Some("alice"));
    }

    #[test]
    fn validate_rejects_escaping_user() {
        let bad = PostReference::new("../../etc", "42");
        let err = bad.validate().unwrap_err();
        assert!(err.is_path_safety());
    }

    #[test]
    fn validate_rejects_instance_with_separator() {
        let bad = PostReference::on_instance("evil/../..", Some("a".into()), "1");
        assert!(bad.validate().is_err());
    }

    #[test]
    fn require_user_id_on_partial_reference() {
        let partial = PostReference::on_instance("m.example", None, "7");
        assert!(partial.require_user_id().is_err());
    }

    #[test]
    fn display_formats() {
        assert_eq!(PostReference::new("alice", "42").to_string(), "@alice/42");
        assert_eq!(
            PostReference::on_instance("m.example", None, "7").to_string(),
            "m.example/@?/7"
        );
    }

    #[test]
    fn serde_skips_absent_fields() {
        let json = serde_json::to_value(PostReference::new("alice", "42")).unwrap();
        assert_eq!(json, serde_json::json!({"user_id": "alice", "post_id": "42"}));
    }
}
