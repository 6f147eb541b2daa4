//! Line-oriented block scanner.
//!
//! Splits source into prose, fenced code, display equations, plots and
//! `:::` containers. Prose is left untouched for pulldown-cmark; only the
//! constructs pulldown-cmark cannot express are lifted into blocks.

use super::Diagnostic;
use crate::model::anchor::AnchorKind;
use once_cell::sync::Lazy;
use regex::Regex;

static FENCE_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(`{3,}|~{3,})\s*([^`\s]*)").expect("valid fence regex"));
static CONTAINER_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:::\s*([A-Za-z]+)\s*(.*)$").expect("valid container regex"));
static SINGLE_LINE_EQUATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$\$(.+?)\$\$\s*(?:\{#([a-z]+):([A-Za-z0-9_-]+)\})?$")
        .expect("valid equation regex")
});
static EQUATION_CLOSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$\$\s*(?:\{#([a-z]+):([A-Za-z0-9_-]+)\})?$").expect("valid equation close regex")
});
pub(crate) static DECLARATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{#([a-z]+):([A-Za-z0-9_-]+)\}").expect("valid declaration regex")
});
pub(crate) static ANCHORED_IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\[([^\]]*)\]\(([^)\s]+)(?:\s+"[^"]*")?\)\{#img:([A-Za-z0-9_-]+)\}"#)
        .expect("valid anchored image regex")
});
static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`[^`\n]*`").expect("valid inline code regex"));

/// Kind of a `:::` container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Definition,
    Theorem,
    Proof,
    /// Collapsible `<details>` section.
    Details,
}

impl ContainerKind {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "definition" | "def" => Some(Self::Definition),
            "theorem" | "thm" => Some(Self::Theorem),
            "proof" => Some(Self::Proof),
            "details" => Some(Self::Details),
            _ => None,
        }
    }

    /// Anchor kind a declaration on this container must use.
    pub fn anchor_kind(self) -> Option<AnchorKind> {
        match self {
            Self::Definition => Some(AnchorKind::Definition),
            Self::Theorem => Some(AnchorKind::Theorem),
            Self::Proof => Some(AnchorKind::Proof),
            Self::Details => None,
        }
    }

    pub(crate) fn from_anchor_kind(kind: AnchorKind) -> Option<Self> {
        match kind {
            AnchorKind::Definition => Some(Self::Definition),
            AnchorKind::Theorem => Some(Self::Theorem),
            AnchorKind::Proof => Some(Self::Proof),
            AnchorKind::Equation | AnchorKind::Image => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Markdown prose, passed to pulldown-cmark after inline substitution.
    Text(String),
    /// Fenced code including its fences; emitted verbatim.
    Code(String),
    /// Display equation; `anchor` is the `eq` id when declared.
    Equation { tex: String, anchor: Option<String> },
    /// Body of a ```` ```plot ```` fence.
    Plot { spec: String },
    Container {
        kind: ContainerKind,
        title: Option<String>,
        anchor: Option<String>,
        body: Vec<Block>,
        /// Raw body source, kept for embeds and anchor content.
        source: String,
    },
}

/// Splits `source` into blocks, collecting structural diagnostics.
pub fn parse_blocks(source: &str) -> (Vec<Block>, Vec<Diagnostic>) {
    let mut scanner = Scanner {
        lines: source.lines().collect(),
        pos: 0,
        diagnostics: Vec::new(),
    };
    let (blocks, _) = scanner.parse_sequence(false);
    (blocks, scanner.diagnostics)
}

struct Scanner<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Scanner<'a> {
    /// Returns the parsed blocks and whether a closing `:::` was consumed.
    fn parse_sequence(&mut self, nested: bool) -> (Vec<Block>, bool) {
        let mut blocks = Vec::new();
        let mut text: Vec<&'a str> = Vec::new();

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            let trimmed = line.trim();

            if nested && trimmed == ":::" {
                self.pos += 1;
                flush_text(&mut text, &mut blocks);
                return (blocks, true);
            }

            if let Some(caps) = FENCE_OPEN_RE.captures(trimmed) {
                flush_text(&mut text, &mut blocks);
                let fence = caps[1].to_string();
                let info = caps[2].to_string();
                blocks.push(self.parse_fence(&fence, &info));
                continue;
            }

            if let Some(caps) = CONTAINER_OPEN_RE.captures(trimmed) {
                if let Some(kind) = ContainerKind::parse(&caps[1]) {
                    flush_text(&mut text, &mut blocks);
                    let header = caps[2].to_string();
                    blocks.push(self.parse_container(kind, &header));
                    continue;
                }
            }

            if trimmed.starts_with("$$") {
                if let Some(block) = self.parse_equation(trimmed, nested) {
                    flush_text(&mut text, &mut blocks);
                    blocks.push(block);
                    continue;
                }
            }

            text.push(line);
            self.pos += 1;
        }

        flush_text(&mut text, &mut blocks);
        (blocks, false)
    }

    fn parse_fence(&mut self, fence: &str, info: &str) -> Block {
        let marker = fence.chars().next().unwrap_or('`');
        let start = self.pos;
        self.pos += 1;

        let mut body = Vec::new();
        let mut closed = false;
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            let trimmed = line.trim();
            if trimmed.len() >= fence.len() && trimmed.chars().all(|ch| ch == marker) {
                closed = true;
                break;
            }
            body.push(line);
        }

        if info.eq_ignore_ascii_case("plot") {
            return Block::Plot {
                spec: body.join("\n"),
            };
        }

        let mut raw = self.lines[start..self.pos].join("\n");
        if !closed {
            raw.push('\n');
            raw.push_str(fence);
        }
        Block::Code(raw)
    }

    /// Multi-line equations must close before the enclosing `:::` or a fence.
    fn parse_equation(&mut self, trimmed: &str, nested: bool) -> Option<Block> {
        if let Some(caps) = SINGLE_LINE_EQUATION_RE.captures(trimmed) {
            let tex = caps[1].trim().to_string();
            if !tex.is_empty() {
                let anchor = self.equation_anchor(
                    caps.get(2).map(|m| m.as_str()),
                    caps.get(3).map(|m| m.as_str()),
                );
                self.pos += 1;
                return Some(Block::Equation { tex, anchor });
            }
        }

        if trimmed != "$$" {
            return None;
        }

        let close = (self.pos + 1..self.lines.len())
            .map(|idx| (idx, self.lines[idx].trim()))
            .take_while(|(_, line)| !(nested && *line == ":::") && !FENCE_OPEN_RE.is_match(line))
            .find(|(_, line)| EQUATION_CLOSE_RE.is_match(line))
            .map(|(idx, _)| idx);
        let Some(close) = close else {
            self.diagnostics.push(Diagnostic::new(
                "unclosed_equation",
                format!("display equation opened on line {} is never closed", self.pos + 1),
            ));
            return None;
        };

        let tex = self.lines[self.pos + 1..close].join("\n").trim().to_string();
        let close_line: &'a str = self.lines[close];
        let close_line = close_line.trim();
        let anchor = EQUATION_CLOSE_RE.captures(close_line).and_then(|caps| {
            self.equation_anchor(caps.get(1).map(|m| m.as_str()), caps.get(2).map(|m| m.as_str()))
        });
        self.pos = close + 1;
        Some(Block::Equation { tex, anchor })
    }

    fn equation_anchor(&mut self, prefix: Option<&str>, id: Option<&str>) -> Option<String> {
        let (prefix, id) = (prefix?, id?);
        self.checked_anchor(prefix, id, AnchorKind::Equation)
    }

    fn parse_container(&mut self, kind: ContainerKind, header: &str) -> Block {
        let opened_at = self.pos + 1;
        let mut anchor = None;
        if let Some(caps) = DECLARATION_RE.captures(header) {
            match kind.anchor_kind() {
                Some(expected) => anchor = self.checked_anchor(&caps[1], &caps[2], expected),
                None => self.diagnostics.push(Diagnostic::new(
                    "anchor_kind_mismatch",
                    format!("`{}` cannot be declared on a details section", &caps[0]),
                )),
            }
        }
        let title = Some(DECLARATION_RE.replace_all(header, "").trim().to_string())
            .filter(|value| !value.is_empty());

        self.pos += 1;
        let body_start = self.pos;
        let (body, closed) = self.parse_sequence(true);
        let body_end = if closed { self.pos - 1 } else { self.pos };
        if !closed {
            self.diagnostics.push(Diagnostic::new(
                "unclosed_block",
                format!("block opened on line {opened_at} is never closed"),
            ));
        }

        Block::Container {
            kind,
            title,
            anchor,
            body,
            source: self.lines[body_start..body_end].join("\n").trim().to_string(),
        }
    }

    fn checked_anchor(&mut self, prefix: &str, id: &str, expected: AnchorKind) -> Option<String> {
        match AnchorKind::from_prefix(prefix) {
            Some(kind) if kind == expected => Some(id.to_string()),
            Some(_) => {
                self.diagnostics.push(Diagnostic::new(
                    "anchor_kind_mismatch",
                    format!(
                        "`{{#{prefix}:{id}}}` declared where a `{}` anchor is expected",
                        expected.prefix()
                    ),
                ));
                None
            }
            None => {
                self.diagnostics.push(Diagnostic::new(
                    "unknown_anchor_kind",
                    format!("unknown anchor kind `{prefix}`"),
                ));
                None
            }
        }
    }
}

fn flush_text(text: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if text.is_empty() {
        return;
    }
    blocks.push(Block::Text(text.join("\n")));
    text.clear();
}

/// Piece of a prose block, split around inline code spans.
pub(crate) enum Segment<'a> {
    Prose(&'a str),
    Code(&'a str),
}

pub(crate) fn split_inline_code(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;
    for found in INLINE_CODE_RE.find_iter(text) {
        if found.start() > last {
            segments.push(Segment::Prose(&text[last..found.start()]));
        }
        segments.push(Segment::Code(found.as_str()));
        last = found.end();
    }
    if last < text.len() {
        segments.push(Segment::Prose(&text[last..]));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::{parse_blocks, Block, ContainerKind};

    #[test]
    fn single_and_multi_line_equations() {
        let source = "intro\n$$ a^2 + b^2 = c^2 $$ {#eq:pyth}\n$$\nx = 1\n$$ {#eq:unit}\n$$ y $$";
        let (blocks, diagnostics) = parse_blocks(source);
        assert!(diagnostics.is_empty());
        assert_eq!(blocks.len(), 4);
        assert_eq!(
            blocks[1],
            Block::Equation {
                tex: "a^2 + b^2 = c^2".to_string(),
                anchor: Some("pyth".to_string()),
            }
        );
        assert_eq!(
            blocks[2],
            Block::Equation {
                tex: "x = 1".to_string(),
                anchor: Some("unit".to_string()),
            }
        );
        assert_eq!(
            blocks[3],
            Block::Equation {
                tex: "y".to_string(),
                anchor: None,
            }
        );
    }

    #[test]
    fn containers_nest_and_keep_their_source() {
        let source = ":::theorem Pythagoras {#thm:pyth}\nStatement.\n:::proof\nTrivial.\n:::\n:::";
        let (blocks, diagnostics) = parse_blocks(source);
        assert!(diagnostics.is_empty());
        let Block::Container {
            kind,
            title,
            anchor,
            body,
            source,
        } = &blocks[0]
        else {
            panic!("expected container, got {:?}", blocks[0]);
        };
        assert_eq!(*kind, ContainerKind::Theorem);
        assert_eq!(title.as_deref(), Some("Pythagoras"));
        assert_eq!(anchor.as_deref(), Some("pyth"));
        assert_eq!(source, "Statement.\n:::proof\nTrivial.\n:::");
        assert!(matches!(
            body[1],
            Block::Container {
                kind: ContainerKind::Proof,
                ..
            }
        ));
    }

    #[test]
    fn fenced_code_hides_custom_syntax() {
        let source = "```\n:::definition Not a block\n$$ x $$ {#eq:no}\n```";
        let (blocks, _) = parse_blocks(source);
        assert_eq!(blocks, vec![Block::Code(source.to_string())]);
    }

    #[test]
    fn plot_fence_becomes_plot_block() {
        let (blocks, _) = parse_blocks("```plot\n{\"data\": []}\n```");
        assert_eq!(
            blocks,
            vec![Block::Plot {
                spec: "{\"data\": []}".to_string()
            }]
        );
    }

    #[test]
    fn unclosed_equation_stops_at_enclosing_block_end() {
        let source = ":::theorem Bound {#thm:bound}\n$$\nx \\le 1\n:::\n\nLater.";
        let (blocks, diagnostics) = parse_blocks(source);
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec!["unclosed_equation"]);
        assert_eq!(blocks.len(), 2);
        let Block::Container { body, source, .. } = &blocks[0] else {
            panic!("expected container, got {:?}", blocks[0]);
        };
        assert_eq!(body, &vec![Block::Text("$$\nx \\le 1".to_string())]);
        assert_eq!(source, "$$\nx \\le 1");
        assert_eq!(blocks[1], Block::Text("\nLater.".to_string()));
    }

    #[test]
    fn unclosed_equation_does_not_swallow_fenced_code() {
        let source = "$$\ny = 2\n```\n$$\n```";
        let (blocks, diagnostics) = parse_blocks(source);
        assert_eq!(diagnostics[0].code, "unclosed_equation");
        assert_eq!(
            blocks,
            vec![
                Block::Text("$$\ny = 2".to_string()),
                Block::Code("```\n$$\n```".to_string()),
            ]
        );
    }

    #[test]
    fn unclosed_and_mismatched_declarations_are_reported() {
        let (_, diagnostics) = parse_blocks(":::definition Group {#thm:group}\nbody");
        let codes: Vec<_> = diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec!["anchor_kind_mismatch", "unclosed_block"]);
    }
}
