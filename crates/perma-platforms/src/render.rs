//! Helpers shared by the embed templates.

use base64::Engine;
use perma_net::ArchiveMirror;
use perma_types::PostRecord;

use crate::adapter::EmbedOptions;
use crate::error::{PlatformError, PlatformResult};

/// Escape text for use in HTML content or a quoted attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Collapse line breaks into ` - ` separators.
pub fn single_line(text: &str) -> String {
    text.replace("\n\n", " - ").replace('\n', " - ")
}

/// One-line text safe to place between markdown link brackets.
pub fn caption(text: &str) -> String {
    single_line(text)
        .replace('\\', "\\\\")
        .replace('[', "\\[")
        .replace(']', "\\]")
}

/// Wrap already-escaped text into paragraphs at line breaks.
pub fn paragraphs(escaped: &str) -> String {
    format!(
        "<p>{}</p>",
        escaped.replace("\n\n", "</p><p>").replace('\n', "</p><p>")
    )
}

/// ` data-<key>="<value>"` for each extra attribute. Keys that are not
/// plain identifiers are dropped.
pub fn data_attrs(options: &EmbedOptions) -> String {
    options
        .extra_attrs
        .iter()
        .filter(|(k, _)| {
            !k.is_empty()
                && k
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .map(|(k, v)| format!(" data-{}=\"{}\"", k.to_ascii_lowercase(), escape(v)))
        .collect()
}

/// `onerror` handler that retries an image through the archive mirror.
pub fn archive_onerror(archive: &ArchiveMirror) -> String {
    format!(
        "onerror=\"(async () => {{this.onerror=null;this.src=`{}${{this.src}}`;}})();\"",
        archive.client_prefix()
    )
}

/// `<img>` with the archive fallback, or nothing if there is no source.
pub fn image(src: Option<&str>, class: Option<&str>, archive: &ArchiveMirror) -> String {
    let Some(src) = src.filter(|s| !s.is_empty()) else {
        return String::new();
    };
    let class = class.map(|c| format!(" class=\"{}\"", escape(c))).unwrap_or_default();
    format!(
        "<img{class} src=\"{}\" {}></img>",
        escape(src),
        archive_onerror(archive)
    )
}

/// String field or empty.
pub fn field(record: &PostRecord, pointer: &str) -> String {
    record.string_at(pointer).unwrap_or_default()
}

/// String field that identifies the post; absence is a render error.
pub fn require(record: &PostRecord, pointer: &str, noun: &'static str) -> PlatformResult<String> {
    record
        .string_at(pointer)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PlatformError::MissingField {
            noun,
            field: pointer.to_string(),
        })
}

/// Inline image bytes as a `data:` URI, typed by file extension.
pub fn data_uri(name: &str, bytes: &[u8]) -> String {
    let ext = name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    };
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
