//! Markdown pipeline for post content.
//!
//! # Responsibility
//! - Scan the authoring micro-syntax (anchored equations, figures,
//!   definition/theorem/proof blocks, expandable sections, plots).
//! - Number anchors per kind and resolve `{{kind:id}}` references, locally
//!   or across posts through [`AnchorLookup`].
//! - Render the result to HTML with pulldown-cmark.
//!
//! # Invariants
//! - Fenced code blocks and inline code spans are never rewritten.
//! - Anchor numbers follow first appearance, starting at 1 per kind.
//! - Rendering never fails; problems are reported as [`Diagnostic`]s.

mod anchors;
mod blocks;
mod preview;
mod render;

pub use anchors::{extract_anchors, AnchorIndex};
pub use blocks::{parse_blocks, Block, ContainerKind};
pub use preview::{derive_markdown_preview, MarkdownPreview, EXCERPT_MAX_CHARS};
pub use render::{RenderOptions, RenderedDocument, Renderer};

use crate::model::anchor::{AnchorKind, AnchorRecord};
use serde::Serialize;

/// Resolves anchors declared in other posts.
pub trait AnchorLookup {
    fn lookup(&self, post_slug: &str, kind: AnchorKind, anchor_id: &str) -> Option<AnchorRecord>;
}

/// Lookup that knows no other posts. Cross-post references fall back to
/// plain links.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnchorLookup;

impl AnchorLookup for NoAnchorLookup {
    fn lookup(
        &self,
        _post_slug: &str,
        _kind: AnchorKind,
        _anchor_id: &str,
    ) -> Option<AnchorRecord> {
        None
    }
}

/// Non-fatal problem found while scanning or rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Stable machine-readable code, e.g. `duplicate_anchor`.
    pub code: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub(crate) fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Escapes text for HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
