//! Excerpt and cover-image derivation for post listings.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Upper bound on derived excerpts, in characters.
pub const EXCERPT_MAX_CHARS: usize = 160;

static FENCED_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^\s*(```|~~~).*?^\s*(```|~~~)[ \t]*$").expect("valid fenced code regex")
});
static DISPLAY_MATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\$\$.*?\$\$").expect("valid display math regex"));
static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*]\(([^)\s]+)[^)]*\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static DECLARATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{#[a-z]+:[A-Za-z0-9_-]+\}").expect("valid declaration regex"));
static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{[a-z]+:[A-Za-z0-9_/-]+((?:\|[^|{}]*)*)\}\}")
        .expect("valid reference regex")
});
static CONTAINER_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*:::[A-Za-z]*").expect("valid container marker regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\*_`#>~\-\[\]\(\)!|$]+"#).expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Markdown-derived listing projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownPreview {
    /// Plain-text summary, at most [`EXCERPT_MAX_CHARS`] characters.
    pub excerpt: Option<String>,
    /// First markdown image path outside code.
    pub cover_image: Option<String>,
}

/// Derives excerpt and cover image from post markdown.
///
/// Code, display math and custom tokens are dropped; a reference keeps its
/// explicit label.
pub fn derive_markdown_preview(content: &str) -> MarkdownPreview {
    let without_code = FENCED_CODE_RE.replace_all(content, " ");

    let cover_image = MARKDOWN_IMAGE_RE
        .captures(&without_code)
        .and_then(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|value| !value.is_empty());

    let without_math = DISPLAY_MATH_RE.replace_all(&without_code, " ");
    let without_images = MARKDOWN_IMAGE_RE.replace_all(&without_math, " ");
    let without_declarations = DECLARATION_RE.replace_all(&without_images, " ");
    let without_references =
        REFERENCE_RE.replace_all(&without_declarations, |caps: &Captures<'_>| {
            match reference_label(&caps[1]) {
                Some(label) => format!(" {label} "),
                None => " ".to_string(),
            }
        });
    let without_markers = CONTAINER_MARKER_RE.replace_all(&without_references, " ");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_markers, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
    let normalized = WHITESPACE_RE.replace_all(&without_symbols, " ");
    let trimmed = normalized.trim();

    let excerpt = if trimmed.is_empty() {
        None
    } else {
        let text: String = trimmed.chars().take(EXCERPT_MAX_CHARS).collect();
        Some(text.trim_end().to_string())
    };

    MarkdownPreview {
        excerpt,
        cover_image,
    }
}

/// Explicit label of a reference, ignoring a trailing `|embed`.
fn reference_label(options: &str) -> Option<&str> {
    let mut parts: Vec<&str> = options.split('|').skip(1).map(str::trim).collect();
    if parts.last() == Some(&"embed") {
        parts.pop();
    }
    parts.into_iter().find(|part| !part.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{derive_markdown_preview, EXCERPT_MAX_CHARS};

    #[test]
    fn preview_extracts_first_image_outside_code() {
        let source = "```\n![skip](code.png)\n```\nx ![a](one.png){#img:one} y ![b](two.png)";
        let preview = derive_markdown_preview(source);
        assert_eq!(preview.cover_image.as_deref(), Some("one.png"));
    }

    #[test]
    fn preview_strips_custom_tokens() {
        let source = "# Title\n\n:::definition Group {#def:group}\nSee {{eq:euler|Euler}} and {{thm:x}}.\n:::\n$$\nx^2\n$$ {#eq:sq}\nDone.";
        let excerpt = derive_markdown_preview(source)
            .excerpt
            .expect("excerpt should exist");
        assert_eq!(excerpt, "Title Group See Euler and . Done.");
    }

    #[test]
    fn preview_drops_embed_suffix() {
        let excerpt = |source: &str| derive_markdown_preview(source).excerpt;
        assert_eq!(
            excerpt("Recall {{def:group|embed}} here.").as_deref(),
            Some("Recall here.")
        );
        assert_eq!(
            excerpt("See {{thm:algebra/lagrange|Lagrange|embed}}.").as_deref(),
            Some("See Lagrange .")
        );
        assert_eq!(
            excerpt("See {{thm:algebra/lagrange|embed}}.").as_deref(),
            Some("See .")
        );
    }

    #[test]
    fn preview_is_capped() {
        let source = "word ".repeat(100);
        let excerpt = derive_markdown_preview(&source)
            .excerpt
            .expect("excerpt should exist");
        assert!(excerpt.chars().count() <= EXCERPT_MAX_CHARS);
    }

    #[test]
    fn empty_content_has_no_preview() {
        let preview = derive_markdown_preview("  \n```\ncode\n```\n");
        assert_eq!(preview.excerpt, None);
        assert_eq!(preview.cover_image, None);
    }
}
