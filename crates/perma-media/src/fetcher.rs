use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use perma_net::{ArchiveMirror, HttpTransport, NetResult};
use perma_types::{MediaAsset, MediaSource};
use tracing::{debug, error, info, warn};

use crate::error::MediaResult;
use crate::runner::CommandRunner;

/// What [`MediaFetcher::fetch`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaOutcome {
    /// The destination existed; nothing was fetched.
    AlreadyPresent,
    /// Downloaded from the original URL.
    Downloaded { bytes: usize },
    /// The original failed; downloaded from the archive mirror.
    Archived { bytes: usize },
    /// Both sources failed; an empty file marks the asset as attempted.
    Placeholder { error: String },
    /// A delegated downloader wrote the file.
    Delegated,
}

/// Downloads media assets into the cache.
pub struct MediaFetcher {
    transport: Arc<dyn HttpTransport>,
    archive: ArchiveMirror,
    runner: Arc<dyn CommandRunner>,
}

impl MediaFetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        archive: ArchiveMirror,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            transport,
            archive,
            runner,
        }
    }

    /// Store `asset` at `dest`.
    ///
    /// Never touches the network when `dest` exists. Only delegated command
    /// failures and local I/O errors are returned as errors.
    pub fn fetch(&self, asset: &MediaAsset, dest: &Path) -> MediaResult<MediaOutcome> {
        if dest.exists() {
            debug!(asset = %asset.name, dest = %dest.display(), "media already present");
            return Ok(MediaOutcome::AlreadyPresent);
        }

        match &asset.source {
            MediaSource::Url(url) => self.fetch_url(url, dest),
            MediaSource::Command(download) => {
                self.runner.run(download, dest)?;
                info!(asset = %asset.name, dest = %dest.display(), "media downloaded by delegate");
                Ok(MediaOutcome::Delegated)
            }
        }
    }

    fn fetch_url(&self, url: &str, dest: &Path) -> MediaResult<MediaOutcome> {
        let direct_err = match self.download(url) {
            Ok(body) => {
                write_atomic(dest, &body)?;
                info!(url, dest = %dest.display(), bytes = body.len(), "media downloaded");
                return Ok(MediaOutcome::Downloaded { bytes: body.len() });
            }
            Err(e) => e,
        };

        let mirror = self.archive.media_url(url);
        warn!(url, error = %direct_err, "media download failed, trying archive");

        match self.download(&mirror) {
            Ok(body) => {
                write_atomic(dest, &body)?;
                info!(url = %mirror, dest = %dest.display(), bytes = body.len(), "media downloaded from archive");
                Ok(MediaOutcome::Archived { bytes: body.len() })
            }
            Err(archive_err) => {
                error!(url, error = %archive_err, dest = %dest.display(), "media unavailable, writing placeholder");
                fs::File::create(dest)?;
                Ok(MediaOutcome::Placeholder {
                    error: archive_err.to_string(),
                })
            }
        }
    }

    fn download(&self, url: &str) -> NetResult<Vec<u8>> {
        self.transport.get(url).map(|resp| resp.body)
    }
}

fn write_atomic(dest: &Path, body: &[u8]) -> std::io::Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(body)?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;
    use crate::runner::RecordingRunner;
    use perma_net::ScriptedTransport;
    use perma_types::{DelegatedDownload, DEST_PLACEHOLDER};

    const SRC: &str = "https://pbs.example/media/a.jpg?name=orig";

    fn fetcher(transport: &Arc<ScriptedTransport>, runner: Arc<dyn CommandRunner>) -> MediaFetcher {
        MediaFetcher::new(
            Arc::clone(transport) as Arc<dyn HttpTransport>,
            ArchiveMirror::new("https://archive.example"),
            runner,
        )
    }

    fn archived() -> String {
        format!("https://archive.example/web/0im_/{SRC}")
    }

    #[test]
    fn direct_download() {
        let dir = tempfile::tempdir().unwrap();
        let t = Arc::new(ScriptedTransport::new());
        t.respond(SRC, 200, "jpeg");
        let f = fetcher(&t, Arc::new(RecordingRunner::failing()));

        let dest = dir.path().join("s1-a.jpg");
        let out = f.fetch(&MediaAsset::url("a.jpg", SRC), &dest).unwrap();
        assert_eq!(out, MediaOutcome::Downloaded { bytes: 4 });
        assert_eq!(fs::read(&dest).unwrap(), b"jpeg");
        assert_eq!(t.calls_to(&archived()), 0);
    }

    #[test]
    fn existing_destination_makes_no_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("s1-a.jpg");
        fs::write(&dest, "old").unwrap();

        let t = Arc::new(ScriptedTransport::new());
        t.respond(SRC, 200, "new");
        let f = fetcher(&t, Arc::new(RecordingRunner::failing()));

        let out = f.fetch(&MediaAsset::url("a.jpg", SRC), &dest).unwrap();
        assert_eq!(out, MediaOutcome::AlreadyPresent);
        assert_eq!(t.total_calls(), 0);
        assert_eq!(fs::read(&dest).unwrap(), b"old");
    }

    #[test]
    fn falls_back_to_archive_once() {
        let dir = tempfile::tempdir().unwrap();
        let t = Arc::new(ScriptedTransport::new());
        t.respond(SRC, 403, "forbidden");
        t.respond(archived(), 200, "old jpeg");
        let f = fetcher(&t, Arc::new(RecordingRunner::failing()));

        let dest = dir.path().join("s1-a.jpg");
        let out = f.fetch(&MediaAsset::url("a.jpg", SRC), &dest).unwrap();
        assert_eq!(out, MediaOutcome::Archived { bytes: 8 });
        assert_eq!(t.calls_to(SRC), 1);
        assert_eq!(t.calls_to(&archived()), 1);
    }

    #[test]
    fn both_failing_leaves_placeholder_and_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let t = Arc::new(ScriptedTransport::new());
        t.respond(SRC, 404, "");
        t.respond(archived(), 404, "");
        let f = fetcher(&t, Arc::new(RecordingRunner::failing()));

        let dest = dir.path().join("s1-a.jpg");
        let out = f.fetch(&MediaAsset::url("a.jpg", SRC), &dest).unwrap();
        assert!(matches!(out, MediaOutcome::Placeholder { .. }));
        assert_eq!(fs::metadata(&dest).unwrap().len(), 0);

        let again = f.fetch(&MediaAsset::url("a.jpg", SRC), &dest).unwrap();
        assert_eq!(again, MediaOutcome::AlreadyPresent);
        assert_eq!(t.total_calls(), 2);
    }

    #[test]
    fn command_source_uses_runner() {
        let dir = tempfile::tempdir().unwrap();
        let t = Arc::new(ScriptedTransport::new());
        let runner = Arc::new(RecordingRunner::succeeding("mp4"));
        let f = fetcher(&t, Arc::clone(&runner) as Arc<dyn CommandRunner>);

        let dl = DelegatedDownload::new("yt-dlp", ["https://v.example/p.m3u8", "-o", DEST_PLACEHOLDER]);
        let dest = dir.path().join("s1-p.mp4");
        let out = f.fetch(&MediaAsset::command("p.mp4", dl), &dest).unwrap();
        assert_eq!(out, MediaOutcome::Delegated);
        assert_eq!(runner.calls()[0].1, dest);
        assert_eq!(t.total_calls(), 0);
    }

    #[test]
    fn command_failure_propagates_without_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let t = Arc::new(ScriptedTransport::new());
        let f = fetcher(&t, Arc::new(RecordingRunner::failing()));

        let dl = DelegatedDownload::new("yt-dlp", ["https://v.example/p.m3u8"]);
        let dest = dir.path().join("s1-p.mp4");
        let err = f.fetch(&MediaAsset::command("p.mp4", dl), &dest).unwrap_err();
        assert!(matches!(err, MediaError::Command { .. }));
        assert!(!dest.exists());
    }
}
