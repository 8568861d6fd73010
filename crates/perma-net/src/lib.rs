//! Network plumbing for perma.
//!
//! Everything that talks HTTP goes through the [`HttpTransport`] trait so the
//! retrieval strategies and the media fetcher can be exercised without a
//! network. Requests are blocking: a resolve runs to completion on the
//! calling thread.
//!
//! - [`UreqTransport`] -- production transport with a fixed user agent
//! - [`ScriptedTransport`] -- canned responses and call counts, for tests
//! - [`ArchiveMirror`] -- builds web-archive mirror URLs for fallbacks

pub mod archive;
pub mod config;
pub mod error;
pub mod scripted;
pub mod transport;
pub mod ureq_transport;

pub use archive::ArchiveMirror;
pub use config::NetConfig;
pub use error::{NetError, NetResult};
pub use scripted::ScriptedTransport;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method};
pub use ureq_transport::UreqTransport;
