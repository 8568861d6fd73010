//! The fixed set of adapters and URL dispatch across them.

use std::sync::Arc;

use perma_types::PostReference;

use crate::adapter::{Platform, PlatformAdapter};
use crate::bluesky::BlueskyAdapter;
use crate::config::PlatformsConfig;
use crate::context::PlatformContext;
use crate::mastodon::MastodonAdapter;
use crate::twitter::TwitterAdapter;

/// One adapter per [`Platform`], in [`Platform::ALL`] order.
pub fn adapters(ctx: &PlatformContext, config: &PlatformsConfig) -> Vec<Arc<dyn PlatformAdapter>> {
    Platform::ALL
        .iter()
        .map(|platform| -> Arc<dyn PlatformAdapter> {
            match platform {
                Platform::Twitter => Arc::new(TwitterAdapter::new(ctx.clone(), config.twitter.clone())),
                Platform::Bluesky => Arc::new(BlueskyAdapter::new(ctx.clone(), config.bluesky.clone())),
                Platform::Mastodon => {
                    Arc::new(MastodonAdapter::new(ctx.clone(), config.mastodon.clone()))
                }
            }
        })
        .collect()
}

/// The first adapter that recognises `url`, with the parsed reference.
pub fn match_url(
    adapters: &[Arc<dyn PlatformAdapter>],
    url: &str,
) -> Option<(Arc<dyn PlatformAdapter>, PostReference)> {
    adapters.iter().find_map(|adapter| {
        adapter
            .match_reference(url)
            .map(|reference| (Arc::clone(adapter), reference))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing;

    #[test]
    fn one_adapter_per_platform() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = testing::context(dir.path());
        let all = adapters(&ctx, &PlatformsConfig::default());
        let platforms: Vec<_> = all.iter().map(|a| a.platform()).collect();
        assert_eq!(platforms, Platform::ALL.to_vec());
    }

    #[test]
    fn dispatch_by_url() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = testing::context(dir.path());
        let all = adapters(&ctx, &PlatformsConfig::default());

        let cases = [
            ("https://twitter.com/alice/status/42", Platform::Twitter),
            ("https://bsky.app/profile/alice.example/post/3kabc", Platform::Bluesky),
            ("https://m.example/@alice/109", Platform::Mastodon),
        ];
        for (url, expected) in cases {
            let (adapter, _) = match_url(&all, url).unwrap();
            assert_eq!(adapter.platform(), expected, "{url}");
        }
        assert!(match_url(&all, "https://example.com/blog/post").is_none());
        assert!(match_url(&all, "https://cdn.example/@2x/logo.png").is_none());
    }
}
