//! Platform adapters for perma.
//!
//! Each supported platform is one [`PlatformAdapter`] implementation. An
//! adapter knows how to:
//!
//! - recognise a post URL and turn it into a [`PostReference`](perma_types::PostReference)
//! - build the platform's [`RetrievalChain`](perma_chain::RetrievalChain)
//! - list related posts (reply parents, quotes, thread replies) lazily
//! - list downloadable media, including the author avatar
//! - render an HTML embed and a one-line link caption
//!
//! The set of platforms is closed ([`Platform`]); [`registry::adapters`]
//! builds one adapter per variant from a shared [`PlatformContext`].
//!
//! | Platform | noun    | chain                                            |
//! |----------|---------|--------------------------------------------------|
//! | Twitter  | `tweet` | cache, memo, API, nitter (time-limited), archive |
//! | Bluesky  | `skeet` | cache, authenticated XRPC, public AppView, archive|
//! | Mastodon | `toot`  | cache, instance API, archive                     |

pub mod adapter;
pub mod bluesky;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod html;
pub mod mastodon;
pub mod registry;
pub mod render;
pub mod twitter;

pub use adapter::{EmbedOptions, LinkText, Platform, PlatformAdapter};
pub use bluesky::BlueskyAdapter;
pub use config::{BlueskyConfig, MastodonConfig, PlatformsConfig, TwitterConfig};
pub use context::PlatformContext;
pub use error::{PlatformError, PlatformResult};
pub use mastodon::MastodonAdapter;
pub use registry::{adapters, match_url};
pub use twitter::TwitterAdapter;
