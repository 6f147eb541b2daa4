//! Anchor records attached to post content.
//!
//! # Responsibility
//! - Name the anchor kinds of the authoring micro-syntax (`{#kind:id}`).
//! - Define the persisted shape used for cross-post references.
//!
//! # Invariants
//! - `number` is 1-based and assigned per kind by first appearance.
//! - `(kind, anchor_id)` is unique within one post.

use serde::{Deserialize, Serialize};

/// Kind of anchored element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    Equation,
    Definition,
    Theorem,
    Proof,
    Image,
}

impl AnchorKind {
    pub const ALL: [AnchorKind; 5] = [
        AnchorKind::Equation,
        AnchorKind::Definition,
        AnchorKind::Theorem,
        AnchorKind::Proof,
        AnchorKind::Image,
    ];

    /// Token prefix used in `{#prefix:id}` and `{{prefix:id}}`.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Equation => "eq",
            Self::Definition => "def",
            Self::Theorem => "thm",
            Self::Proof => "proof",
            Self::Image => "img",
        }
    }

    /// Parses a token prefix.
    pub fn from_prefix(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == value)
    }

    /// Human-facing label used in headers and default reference text.
    pub fn label(self) -> &'static str {
        match self {
            Self::Equation => "Equation",
            Self::Definition => "Definition",
            Self::Theorem => "Theorem",
            Self::Proof => "Proof",
            Self::Image => "Figure",
        }
    }

    /// HTML element id for an anchor of this kind.
    pub fn html_id(self, anchor_id: &str) -> String {
        format!("{}-{anchor_id}", self.prefix())
    }

    /// Default reference text for a numbered anchor.
    pub fn default_reference_label(self, number: u32) -> String {
        match self {
            Self::Equation => format!("({number})"),
            other => format!("{} {number}", other.label()),
        }
    }
}

/// One anchor declared in a post's markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub kind: AnchorKind,
    pub anchor_id: String,
    pub number: u32,
    /// Block title or image alt text.
    pub title: Option<String>,
    /// Source snippet: TeX for equations, image markdown, or block body.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::AnchorKind;

    #[test]
    fn prefixes_round_trip() {
        for kind in AnchorKind::ALL {
            assert_eq!(AnchorKind::from_prefix(kind.prefix()), Some(kind));
        }
        assert_eq!(AnchorKind::from_prefix("lemma"), None);
    }

    #[test]
    fn equations_use_parenthesised_default_label() {
        assert_eq!(AnchorKind::Equation.default_reference_label(3), "(3)");
        assert_eq!(AnchorKind::Image.default_reference_label(2), "Figure 2");
        assert_eq!(AnchorKind::Theorem.html_id("pyth"), "thm-pyth");
    }
}
