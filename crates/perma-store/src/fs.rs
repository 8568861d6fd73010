use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use perma_types::{validate_component, MediaScope, PostRecord, PostReference};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::layout::{post_file_name, CacheLayout};
use crate::traits::{CacheStore, CachedPost};

/// On-disk post cache.
///
/// Records are written to a temporary file in the destination directory and
/// renamed into place, so two writers racing on the same reference leave one
/// complete file rather than an interleaving of both.
#[derive(Clone, Debug)]
pub struct FsCacheStore {
    layout: CacheLayout,
}

impl FsCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: CacheLayout::new(root),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.root.clone())
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    fn load(path: &Path) -> StoreResult<Option<PostRecord>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Find the author directory holding `s<post_id>.json` for a reference
    /// without a user id. Directory names that are not valid components are
    /// ignored. Ties are broken by name so the result is deterministic.
    fn find_author(&self, noun: &str, reference: &PostReference) -> StoreResult<Option<String>> {
        let authors = self.layout.authors_dir(noun, reference)?;
        let entries = match fs::read_dir(&authors) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let file = post_file_name(reference.post_id());
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if validate_component("user_id", &name).is_err() {
                continue;
            }
            if entry.path().join(&file).is_file() {
                found.push(name);
            }
        }
        found.sort();
        Ok(found.into_iter().next())
    }
}

impl CacheStore for FsCacheStore {
    fn read(&self, noun: &str, reference: &PostReference) -> StoreResult<Option<CachedPost>> {
        let complete = if reference.is_complete() {
            reference.clone()
        } else {
            match self.find_author(noun, reference)? {
                Some(user_id) => reference.with_user_id(user_id),
                None => return Ok(None),
            }
        };

        let path = self.layout.post_path(noun, &complete)?;
        let Some(record) = Self::load(&path)? else {
            return Ok(None);
        };
        debug!(reference = %complete, path = %path.display(), "cache hit");
        Ok(Some(CachedPost {
            reference: complete,
            record,
            path,
        }))
    }

    fn write(
        &self,
        noun: &str,
        reference: &PostReference,
        record: &PostRecord,
    ) -> StoreResult<PathBuf> {
        let path = self.layout.post_path(noun, reference)?;
        let dir = path
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "cache path has no parent"))?;
        fs::create_dir_all(dir)?;

        let body = record
            .to_pretty_json()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(body.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(reference = %reference, path = %path.display(), "record persisted");
        Ok(path)
    }

    fn media_path(
        &self,
        noun: &str,
        reference: &PostReference,
        media_name: &str,
        scope: MediaScope,
    ) -> StoreResult<PathBuf> {
        let path = self.layout.media_path(noun, reference, media_name, scope)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        Ok(path)
    }

    fn read_media(
        &self,
        noun: &str,
        reference: &PostReference,
        media_name: &str,
        scope: MediaScope,
    ) -> StoreResult<Option<Vec<u8>>> {
        let path = self.layout.media_path(noun, reference, media_name, scope)?;
        match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
