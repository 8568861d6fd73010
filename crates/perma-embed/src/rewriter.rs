use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use perma_platforms::{render, match_url, EmbedOptions, PlatformAdapter};
use perma_resolver::ThreadResolver;
use perma_types::PostReference;
use regex::Captures;
use tracing::{debug, error, info};

use crate::config::RewriteMode;
use crate::error::{EmbedError, EmbedResult};
use crate::links::{any_link_re, image_link_re, query_attrs, uncaptioned_re, with_query};

/// Result of one pass over a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rewrite {
    pub text: String,
    /// Links replaced with new text.
    pub replaced: usize,
    /// Links left alone (rewrite) or shown as an error block (inline)
    /// because the post could not be resolved or rendered.
    pub failed: usize,
}

impl Rewrite {
    pub fn is_dirty(&self) -> bool {
        self.replaced > 0
    }
}

/// Rewrites and renders post links against a shared resolver.
pub struct EmbedRewriter {
    resolver: Arc<ThreadResolver>,
    adapters: Vec<Arc<dyn PlatformAdapter>>,
}

impl EmbedRewriter {
    pub fn new(resolver: Arc<ThreadResolver>, adapters: Vec<Arc<dyn PlatformAdapter>>) -> Self {
        Self { resolver, adapters }
    }

    pub fn adapters(&self) -> &[Arc<dyn PlatformAdapter>] {
        &self.adapters
    }

    pub fn resolver(&self) -> &ThreadResolver {
        &self.resolver
    }

    /// Recaption one adapter's links in `text`.
    ///
    /// A link whose post cannot be resolved is left exactly as it was.
    pub fn rewrite_text(
        &self,
        text: &str,
        adapter: &dyn PlatformAdapter,
        mode: RewriteMode,
    ) -> Rewrite {
        let mut replaced = 0;
        let mut failed = 0;

        let mut one = |whole: &str, bang: &str, url: &str| -> String {
            let Some(reference) = adapter.match_reference(url) else {
                return whole.to_string();
            };
            match self.link_text(adapter, &reference, url) {
                Some((caption, href)) => {
                    let new = format!("{bang}[{caption}]({href})");
                    if new != whole {
                        debug!(from = whole, to = %new, "rewrote link");
                        replaced += 1;
                    }
                    new
                }
                None => {
                    failed += 1;
                    whole.to_string()
                }
            }
        };

        let text = match mode {
            RewriteMode::UncaptionedOnly => uncaptioned_re()
                .replace_all(text, |c: &Captures<'_>| one(&c[0], "!", &c[1]))
                .into_owned(),
            RewriteMode::AllLinks => any_link_re()
                .replace_all(text, |c: &Captures<'_>| one(&c[0], &c[1], &c[3]))
                .into_owned(),
        };

        Rewrite {
            text,
            replaced,
            failed,
        }
    }

    fn link_text(
        &self,
        adapter: &dyn PlatformAdapter,
        reference: &PostReference,
        url: &str,
    ) -> Option<(String, String)> {
        let record = match self.resolver.resolve(adapter, reference) {
            Ok(record) => record,
            Err(e) => {
                error!(reference = %reference, error = %e, "could not get {} to caption link", adapter.noun());
                return None;
            }
        };
        match adapter.render_link_text(&record, reference) {
            Ok(link) => Some((link.caption, with_query(&link.href, url))),
            Err(e) => {
                error!(reference = %reference, error = %e, record = %record.as_value(), "could not caption link");
                None
            }
        }
    }

    /// Rewrite a file in place. It is written back only when at least one
    /// link changed.
    pub fn rewrite_file(
        &self,
        path: &Path,
        adapter: &dyn PlatformAdapter,
        mode: RewriteMode,
    ) -> EmbedResult<Rewrite> {
        let body = std::fs::read_to_string(path).map_err(|e| EmbedError::io(path, e))?;
        let rewrite = self.rewrite_text(&body, adapter, mode);
        if rewrite.is_dirty() {
            write_atomic(path, &rewrite.text)?;
            info!(
                path = %path.display(),
                platform = %adapter.platform(),
                replaced = rewrite.replaced,
                failed = rewrite.failed,
                "rewrote document"
            );
        }
        Ok(rewrite)
    }

    /// Replace every `![title](url)` that names a post with its HTML embed.
    ///
    /// A post that cannot be loaded becomes an error block naming the link,
    /// so the failure is visible in the rendered page.
    pub fn render_inline(&self, markdown: &str) -> Rewrite {
        let mut replaced = 0;
        let mut failed = 0;

        let text = image_link_re()
            .replace_all(markdown, |c: &Captures<'_>| {
                let (title, href) = (&c[1], &c[2]);
                let Some((adapter, reference)) = match_url(&self.adapters, href) else {
                    return c[0].to_string();
                };
                match self.embed(adapter.as_ref(), &reference, href) {
                    Some(html) => {
                        replaced += 1;
                        html
                    }
                    None => {
                        failed += 1;
                        format!(
                            "<p>ERROR! Can't load {} <a href='{}'>'{}'</a></p>",
                            adapter.noun(),
                            render::escape(href),
                            render::escape(title)
                        )
                    }
                }
            })
            .into_owned();

        Rewrite {
            text,
            replaced,
            failed,
        }
    }

    fn embed(
        &self,
        adapter: &dyn PlatformAdapter,
        reference: &PostReference,
        href: &str,
    ) -> Option<String> {
        let record = match self.resolver.resolve(adapter, reference) {
            Ok(record) => record,
            Err(e) => {
                error!(reference = %reference, error = %e, "can't load {}", adapter.noun());
                return None;
            }
        };
        let options = EmbedOptions {
            extra_attrs: query_attrs(href),
        };
        adapter
            .render_embed(&record, reference, &options)
            .map_err(|e| {
                error!(reference = %reference, error = %e, record = %record.as_value(), "could not render embed");
            })
            .ok()
    }
}

impl std::fmt::Debug for EmbedRewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedRewriter")
            .field(
                "adapters",
                &self.adapters.iter().map(|a| a.platform()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Replace a file's contents via a temporary file in the same directory.
fn write_atomic(path: &Path, contents: &str) -> EmbedResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| EmbedError::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| EmbedError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| EmbedError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, HOST};

    #[test]
    fn uncaptioned_links_get_captions() {
        let f = Fixture::new().post("alice", "1", "first").post("alice", "3", "third");
        let doc = format!(
            "intro\n![]({HOST}/alice/1)\n\n![]({HOST}/alice/2)\n\n![]({HOST}/alice/3?align=center)\n"
        );

        let out = f.rewriter.rewrite_text(&doc, f.adapter(), RewriteMode::UncaptionedOnly);
        assert_eq!(out.replaced, 2);
        assert_eq!(out.failed, 1);
        assert_eq!(
            out.text,
            format!(
                "intro\n![alice: first]({HOST}/alice/1)\n\n![]({HOST}/alice/2)\n\n![alice: third]({HOST}/alice/3?align=center)\n"
            )
        );
    }

    #[test]
    fn captioned_links_untouched_in_uncaptioned_mode() {
        let f = Fixture::new().post("alice", "1", "first");
        let doc = format!("[old caption]({HOST}/alice/1)");
        let out = f.rewriter.rewrite_text(&doc, f.adapter(), RewriteMode::UncaptionedOnly);
        assert_eq!(out.text, doc);
        assert_eq!(out.replaced, 0);
        assert_eq!(f.origin_calls(), 0);
    }

    #[test]
    fn all_links_recaptions_everything() {
        let f = Fixture::new().post("alice", "1", "a [bracket]");
        let doc = format!("[stale]({HOST}/alice/1) and ![]({HOST}/alice/1) and [other](https://elsewhere.example/x)");
        let out = f.rewriter.rewrite_text(&doc, f.adapter(), RewriteMode::AllLinks);
        assert_eq!(out.replaced, 2);
        assert_eq!(
            out.text,
            format!(
                r"[alice: a \[bracket\]]({HOST}/alice/1) and ![alice: a \[bracket\]]({HOST}/alice/1) and [other](https://elsewhere.example/x)"
            )
        );

        // Already current: nothing to do.
        let again = f.rewriter.rewrite_text(&out.text, f.adapter(), RewriteMode::AllLinks);
        assert_eq!(again.replaced, 0);
        assert_eq!(again.text, out.text);
    }

    #[test]
    fn file_written_only_when_dirty() {
        let f = Fixture::new().post("alice", "1", "first");
        let dir = tempfile::tempdir().unwrap();

        let failing = dir.path().join("failing.md");
        let failing_doc = format!("![]({HOST}/alice/404)\n");
        std::fs::write(&failing, &failing_doc).unwrap();
        let before = std::fs::metadata(&failing).unwrap().modified().unwrap();
        let out = f
            .rewriter
            .rewrite_file(&failing, f.adapter(), RewriteMode::UncaptionedOnly)
            .unwrap();
        assert!(!out.is_dirty());
        assert_eq!(std::fs::read_to_string(&failing).unwrap(), failing_doc);
        assert_eq!(std::fs::metadata(&failing).unwrap().modified().unwrap(), before);

        let good = dir.path().join("good.md");
        std::fs::write(&good, format!("![]({HOST}/alice/1)\n")).unwrap();
        f.rewriter
            .rewrite_file(&good, f.adapter(), RewriteMode::UncaptionedOnly)
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&good).unwrap(),
            format!("![alice: first]({HOST}/alice/1)\n")
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        let f = Fixture::new();
        let err = f
            .rewriter
            .rewrite_file(Path::new("/nonexistent/doc.md"), f.adapter(), RewriteMode::AllLinks)
            .unwrap_err();
        assert!(matches!(err, EmbedError::Io { .. }));
    }

    #[test]
    fn inline_embeds_and_error_blocks() {
        let f = Fixture::new().post("alice", "1", "first").post("alice", "3", "third");
        let doc = format!(
            "![]({HOST}/alice/1?align=center)\n![gone]({HOST}/alice/2)\n![]({HOST}/alice/3)\n![pic](https://img.example/a.png)"
        );

        let out = f.rewriter.render_inline(&doc);
        assert_eq!(out.replaced, 2);
        assert_eq!(out.failed, 1);
        let lines: Vec<_> = out.text.lines().collect();
        assert_eq!(lines[0], "<blockquote data-align=\"center\">first</blockquote>");
        assert_eq!(
            lines[1],
            format!("<p>ERROR! Can't load post <a href='{HOST}/alice/2'>'gone'</a></p>")
        );
        assert_eq!(lines[2], "<blockquote>third</blockquote>");
        assert_eq!(lines[3], "![pic](https://img.example/a.png)");
    }
}
