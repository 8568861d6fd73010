//! Deterministic cache path computation.
//!
//! Paths depend only on the platform noun and the reference fields, never on
//! record contents, so a re-run lands on the same files.

use std::path::{Path, PathBuf};

use perma_types::{strip_query, validate_component, MediaScope, PostReference};

use crate::error::StoreResult;

/// Name of the top-level cache directory under the configured root.
pub const POSTS_DIR: &str = "posts";

/// Maps references to cache file locations under a root directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/posts/<noun>s`
    pub fn collection_dir(&self, noun: &str) -> StoreResult<PathBuf> {
        validate_component("noun", noun)?;
        Ok(self.root.join(POSTS_DIR).join(format!("{noun}s")))
    }

    /// `<root>/posts/<noun>s[/<instance>]`: the directory holding one
    /// directory per author.
    pub fn authors_dir(&self, noun: &str, reference: &PostReference) -> StoreResult<PathBuf> {
        reference.validate()?;
        let mut dir = self.collection_dir(noun)?;
        if let Some(instance) = reference.instance() {
            dir.push(instance);
        }
        Ok(dir)
    }

    /// Directory holding this author's posts. Requires a complete reference.
    pub fn author_dir(&self, noun: &str, reference: &PostReference) -> StoreResult<PathBuf> {
        let user_id = reference.require_user_id()?;
        Ok(self.authors_dir(noun, reference)?.join(user_id))
    }

    /// `.../s<post_id>.json`
    pub fn post_path(&self, noun: &str, reference: &PostReference) -> StoreResult<PathBuf> {
        Ok(self
            .author_dir(noun, reference)?
            .join(post_file_name(reference.post_id())))
    }

    /// Location of a media file for this post (or its author).
    pub fn media_path(
        &self,
        noun: &str,
        reference: &PostReference,
        media_name: &str,
        scope: MediaScope,
    ) -> StoreResult<PathBuf> {
        let name = strip_query(media_name);
        validate_component("media_name", name)?;
        let file = match scope {
            MediaScope::Post => format!("s{}-{name}", reference.post_id()),
            MediaScope::Author => format!("savatar-{name}"),
        };
        Ok(self.author_dir(noun, reference)?.join(file))
    }
}

/// File name of a cached post.
pub fn post_file_name(post_id: &str) -> String {
    format!("s{post_id}.json")
}
