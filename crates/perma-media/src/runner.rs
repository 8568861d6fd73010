use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use perma_types::DelegatedDownload;
use tracing::info;

use crate::error::{MediaError, MediaResult};

/// Runs an external downloader that writes `dest` itself.
pub trait CommandRunner: Send + Sync {
    fn run(&self, download: &DelegatedDownload, dest: &Path) -> MediaResult<()>;
}

/// Spawns the program as a child process and waits for it.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, download: &DelegatedDownload, dest: &Path) -> MediaResult<()> {
        let dest_str = dest.to_string_lossy();
        let args = download.args_for(&dest_str);
        info!(program = %download.program, dest = %dest.display(), "running delegated download");

        let status = Command::new(&download.program)
            .args(&args)
            .status()
            .map_err(|e| MediaError::Command {
                program: download.program.clone(),
                dest: dest.to_path_buf(),
                message: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::Command {
                program: download.program.clone(),
                dest: dest.to_path_buf(),
                message: format!("exited with {status}"),
            })
        }
    }
}

/// Records invocations instead of running anything.
///
/// On success it writes `content` to the destination, standing in for the
/// real downloader's output.
pub struct RecordingRunner {
    calls: Mutex<Vec<(DelegatedDownload, PathBuf)>>,
    fail: bool,
    content: Vec<u8>,
}

impl RecordingRunner {
    pub fn succeeding(content: impl Into<Vec<u8>>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
            content: content.into(),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
            content: Vec::new(),
        }
    }

    pub fn calls(&self) -> Vec<(DelegatedDownload, PathBuf)> {
        self.calls.lock().expect("lock poisoned").clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, download: &DelegatedDownload, dest: &Path) -> MediaResult<()> {
        self.calls
            .lock()
            .expect("lock poisoned")
            .push((download.clone(), dest.to_path_buf()));
        if self.fail {
            return Err(MediaError::Command {
                program: download.program.clone(),
                dest: dest.to_path_buf(),
                message: "scripted failure".into(),
            });
        }
        std::fs::write(dest, &self.content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perma_types::DEST_PLACEHOLDER;

    #[test]
    fn system_runner_reports_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let dl = DelegatedDownload::new("perma-no-such-program-xyz", ["-o", DEST_PLACEHOLDER]);
        let err = SystemCommandRunner
            .run(&dl, &dir.path().join("out.mp4"))
            .unwrap_err();
        assert!(matches!(err, MediaError::Command { .. }));
    }

    #[test]
    fn recording_runner_writes_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("v.mp4");
        let runner = RecordingRunner::succeeding("video");
        runner
            .run(&DelegatedDownload::new("yt-dlp", ["x"]), &dest)
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"video");
        assert_eq!(runner.calls().len(), 1);
    }
}
