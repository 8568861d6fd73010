use std::path::PathBuf;

/// Errors from media acquisition.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// A delegated downloader could not be started or exited unsuccessfully.
    #[error("{program} failed for {dest}: {message}")]
    Command {
        program: String,
        dest: PathBuf,
        message: String,
    },

    /// Writing the destination or placeholder failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;
