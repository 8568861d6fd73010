//! Batch mode: rewrite every document matched by a set of glob patterns.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use tracing::{error, info, warn};

use crate::config::RewriteMode;
use crate::error::{EmbedError, EmbedResult};
use crate::rewriter::EmbedRewriter;

/// Totals for one batch run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Documents matched by the patterns.
    pub files: usize,
    /// Documents written back.
    pub rewritten: usize,
    pub replacements: usize,
    /// Links whose post could not be resolved or captioned.
    pub failed_links: usize,
    /// File and platform pairs that failed outright (unreadable file, etc).
    pub errors: usize,
}

const GLOB_CHARS: [char; 4] = ['*', '?', '[', '{'];

/// Literal directory prefix of a pattern and the glob below it, if any.
fn split_pattern(pattern: &str) -> (PathBuf, Option<String>) {
    let parts: Vec<&str> = pattern.split('/').collect();
    let Some(first_glob) = parts.iter().position(|p| p.contains(GLOB_CHARS)) else {
        return (PathBuf::from(pattern), None);
    };
    let base = parts[..first_glob].join("/");
    let base = match base.as_str() {
        "" if pattern.starts_with('/') => PathBuf::from("/"),
        "" => PathBuf::from("."),
        other => PathBuf::from(other),
    };
    (base, Some(parts[first_glob..].join("/")))
}

fn walk(base: &Path, glob: &str, pattern: &str, out: &mut Vec<PathBuf>) -> EmbedResult<()> {
    let bad_pattern = |source| EmbedError::Pattern {
        pattern: pattern.to_string(),
        source,
    };
    let mut overrides = OverrideBuilder::new(base);
    overrides.add(&format!("/{glob}")).map_err(bad_pattern)?;
    let overrides = overrides.build().map_err(bad_pattern)?;

    let walker = WalkBuilder::new(base)
        .standard_filters(false)
        .hidden(true)
        .overrides(overrides)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_some_and(|t| t.is_file()) => {
                out.push(entry.into_path())
            }
            Ok(_) => {}
            Err(source) => warn!(
                error = %EmbedError::Walk { path: base.to_path_buf(), source },
                "skipping unreadable entry"
            ),
        }
    }
    Ok(())
}

/// Files matched by any pattern, in pattern order, each listed once.
///
/// `**` crosses directories; hidden files and directories are skipped. A
/// pattern without glob characters names a single file.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> EmbedResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        match split_pattern(pattern) {
            (path, None) => {
                if path.is_file() {
                    found.push(path);
                } else {
                    warn!(pattern, "no such file");
                }
            }
            (base, Some(glob)) => walk(&base, &glob, pattern, &mut found)?,
        }
    }

    let mut seen = HashSet::new();
    found.retain(|p| seen.insert(p.clone()));
    Ok(found)
}

/// Run every adapter over every matched document.
///
/// A failing document or adapter is logged and counted; the batch goes on.
pub fn run<S: AsRef<str>>(
    rewriter: &EmbedRewriter,
    patterns: &[S],
    mode: RewriteMode,
) -> EmbedResult<BatchReport> {
    let files = expand_patterns(patterns)?;
    let mut report = BatchReport {
        files: files.len(),
        ..BatchReport::default()
    };

    for file in &files {
        let mut dirty = false;
        for adapter in rewriter.adapters() {
            match rewriter.rewrite_file(file, adapter.as_ref(), mode) {
                Ok(rewrite) => {
                    dirty |= rewrite.is_dirty();
                    report.replacements += rewrite.replaced;
                    report.failed_links += rewrite.failed;
                }
                Err(e) => {
                    error!(path = %file.display(), platform = %adapter.platform(), error = %e, "could not process document");
                    report.errors += 1;
                }
            }
        }
        if dirty {
            report.rewritten += 1;
        }
    }

    info!(
        files = report.files,
        rewritten = report.rewritten,
        replacements = report.replacements,
        failed_links = report.failed_links,
        errors = report.errors,
        "batch finished"
    );
    Ok(report)
}
