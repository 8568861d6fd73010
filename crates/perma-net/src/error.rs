use thiserror::Error;

/// Errors from HTTP operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetError {
    /// The server answered with an error status.
    #[error("HTTP {status} from {url}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// No usable answer: DNS, connect, TLS, timeout.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The body could not be read or decoded.
    #[error("undecodable response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl NetError {
    /// Timeouts, 5xx, and rate limiting. A transient failure is still not
    /// retried in place; the caller moves on to its next fallback.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Transport { .. } => true,
            Self::Decode { .. } => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for HTTP operations.
pub type NetResult<T> = Result<T, NetError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> NetError {
        NetError::Status {
            status: code,
            url: "https://x.example".into(),
            body: String::new(),
        }
    }

    #[test]
    fn transient_classification() {
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(401).is_transient());
        assert!(NetError::Transport {
            url: "u".into(),
            message: "timed out".into()
        }
        .is_transient());
    }

    #[test]
    fn status_accessor() {
        assert_eq!(status(404).status(), Some(404));
        assert_eq!(
            NetError::Decode {
                url: "u".into(),
                message: "m".into()
            }
            .status(),
            None
        );
    }
}
