//! HTML rendering of post markdown.
//!
//! Custom constructs are rendered to HTML first and parked behind slot
//! tokens; pulldown-cmark renders the remaining markdown, then the slots are
//! spliced back in. Tokens carry a per-pass nonce so literal token text in
//! the source is never replaced.

use super::anchors::AnchorIndex;
use super::blocks::{
    parse_blocks, split_inline_code, Block, ContainerKind, Segment, ANCHORED_IMAGE_RE,
    DECLARATION_RE,
};
use super::{escape_html, AnchorLookup, Diagnostic};
use crate::model::anchor::{AnchorKind, AnchorRecord};
use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{([a-z]+):([A-Za-z0-9_-]+(?:/[A-Za-z0-9_-]+)?)((?:\|[^|{}]*)*)\}\}")
        .expect("valid reference regex")
});
static IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!\[([^\]]*)\]\(([^)\s]+)").expect("valid image regex"));

const SLOT_PREFIX: &str = "MDXSLOT";
const SLOT_SUFFIX: &str = "TOLSXDM";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Slug of the post being rendered; `{{kind:own-slug/id}}` is local.
    pub post_slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedDocument {
    pub html: String,
    pub anchors: Vec<AnchorRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Renders post markdown, resolving cross-post references through `lookup`.
pub struct Renderer<'a> {
    lookup: &'a dyn AnchorLookup,
    options: RenderOptions,
}

impl<'a> Renderer<'a> {
    pub fn new(lookup: &'a dyn AnchorLookup) -> Self {
        Self {
            lookup,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(lookup: &'a dyn AnchorLookup, options: RenderOptions) -> Self {
        Self { lookup, options }
    }

    pub fn with_post_slug(mut self, slug: impl Into<String>) -> Self {
        self.options.post_slug = Some(slug.into());
        self
    }

    pub fn render(&self, source: &str) -> RenderedDocument {
        let (blocks, mut diagnostics) = parse_blocks(source);
        let index = AnchorIndex::build(&blocks, &mut diagnostics);

        let mut context = RenderContext {
            lookup: self.lookup,
            index: &index,
            scope: Scope::Document(self.options.post_slug.clone()),
            embedded: false,
            claimed: HashSet::new(),
            diagnostics: Vec::new(),
        };
        let html = context.render_blocks(&blocks);
        diagnostics.append(&mut context.diagnostics);

        RenderedDocument {
            html,
            anchors: index.into_records(),
            diagnostics,
        }
    }
}

/// Where unqualified references resolve.
#[derive(Debug, Clone)]
enum Scope {
    /// The document being rendered, optionally known by its slug.
    Document(Option<String>),
    /// Content embedded from another post.
    Foreign(String),
}

/// Number and element id assigned to a rendered anchor.
struct Placement {
    number: u32,
    html_id: Option<String>,
}

struct RenderContext<'r> {
    lookup: &'r dyn AnchorLookup,
    index: &'r AnchorIndex,
    scope: Scope,
    /// Set while rendering embedded content; nested embeds become links.
    embedded: bool,
    claimed: HashSet<(AnchorKind, String)>,
    diagnostics: Vec<Diagnostic>,
}

impl<'r> RenderContext<'r> {
    fn embedded_child(&self, scope: Scope) -> RenderContext<'r> {
        RenderContext {
            lookup: self.lookup,
            index: self.index,
            scope,
            embedded: true,
            claimed: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    fn render_blocks(&mut self, blocks: &[Block]) -> String {
        let mut markdown = String::new();
        let mut slots = Slots::new();

        for block in blocks {
            match block {
                Block::Text(text) => {
                    let substituted = self.substitute_inline(text, &mut slots);
                    markdown.push_str(&substituted);
                    markdown.push('\n');
                }
                Block::Code(raw) => {
                    markdown.push_str(raw);
                    markdown.push('\n');
                }
                Block::Equation { tex, anchor } => {
                    let placement = anchor
                        .as_deref()
                        .and_then(|id| self.place(AnchorKind::Equation, id));
                    slots.push_block(&mut markdown, equation_html(tex, placement));
                }
                Block::Plot { spec } => {
                    let rendered = self.plot_html(spec);
                    slots.push_block(&mut markdown, rendered);
                }
                Block::Container {
                    kind,
                    title,
                    anchor,
                    body,
                    ..
                } => {
                    let placement = match (kind.anchor_kind(), anchor.as_deref()) {
                        (Some(anchor_kind), Some(id)) => self.place(anchor_kind, id),
                        _ => None,
                    };
                    let inner = self.render_blocks(body);
                    let rendered = container_html(*kind, title.as_deref(), placement, &inner);
                    slots.push_block(&mut markdown, rendered);
                }
            }
        }

        slots.splice(markdown_to_html(&markdown))
    }

    /// Assigns the number and id for an anchor about to be rendered.
    ///
    /// The first rendering of a document anchor carries its element id;
    /// embedded copies never do. Repeated declarations render unnumbered.
    fn place(&mut self, kind: AnchorKind, anchor_id: &str) -> Option<Placement> {
        match &self.scope {
            Scope::Foreign(slug) => self
                .lookup
                .lookup(slug, kind, anchor_id)
                .map(|record| Placement {
                    number: record.number,
                    html_id: None,
                }),
            Scope::Document(_) => {
                let record = self.index.get(kind, anchor_id)?;
                if self.embedded {
                    return Some(Placement {
                        number: record.number,
                        html_id: None,
                    });
                }
                if self.claimed.insert((kind, anchor_id.to_string())) {
                    Some(Placement {
                        number: record.number,
                        html_id: Some(kind.html_id(anchor_id)),
                    })
                } else {
                    None
                }
            }
        }
    }

    fn substitute_inline(&mut self, text: &str, slots: &mut Slots) -> String {
        let mut out = String::with_capacity(text.len());
        for segment in split_inline_code(text) {
            match segment {
                Segment::Code(code) => out.push_str(code),
                Segment::Prose(prose) => {
                    let substituted = self.substitute_prose(prose, slots);
                    out.push_str(&substituted);
                }
            }
        }
        out
    }

    fn substitute_prose(&mut self, prose: &str, slots: &mut Slots) -> String {
        let figures = ANCHORED_IMAGE_RE.replace_all(prose, |caps: &Captures<'_>| {
            let placement = self.place(AnchorKind::Image, &caps[3]);
            slots.push(figure_html(&caps[1], &caps[2], placement))
        });

        let declarations = DECLARATION_RE.replace_all(&figures, |caps: &Captures<'_>| {
            self.diagnostics.push(Diagnostic::new(
                "stray_anchor",
                format!("`{}` is not attached to an equation, figure or block", &caps[0]),
            ));
            String::new()
        });

        REFERENCE_RE
            .replace_all(&declarations, |caps: &Captures<'_>| {
                match self.render_reference(&caps[1], &caps[2], &caps[3]) {
                    Some(rendered) => slots.push(rendered),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Returns `None` for unknown kinds so the token is left as written.
    fn render_reference(&mut self, prefix: &str, target: &str, options: &str) -> Option<String> {
        let kind = AnchorKind::from_prefix(prefix)?;
        let mut parts: Vec<&str> = options.split('|').skip(1).map(str::trim).collect();
        let embed = parts.last() == Some(&"embed");
        if embed {
            parts.pop();
        }
        let label = parts.into_iter().find(|part| !part.is_empty());

        let (slug, anchor_id) = match target.split_once('/') {
            Some((slug, anchor_id)) => (Some(slug), anchor_id),
            None => (None, target),
        };
        let foreign_slug = match (&self.scope, slug) {
            (Scope::Document(Some(current)), Some(slug)) if current == slug => None,
            (_, Some(slug)) => Some(slug.to_string()),
            (Scope::Document(_), None) => None,
            (Scope::Foreign(current), None) => Some(current.clone()),
        };

        let rendered = match foreign_slug {
            None => match self.index.get(kind, anchor_id).cloned() {
                Some(record) if embed && !self.embedded => {
                    self.embed_html(&record, self.scope.clone())
                }
                Some(record) => reference_link(
                    kind,
                    &format!("#{}", kind.html_id(anchor_id)),
                    label,
                    record.number,
                ),
                None => {
                    self.diagnostics.push(Diagnostic::new(
                        "unresolved_reference",
                        format!("no `{prefix}:{anchor_id}` anchor in this post"),
                    ));
                    format!(
                        "<span class=\"anchor-error\">Unresolved reference {}</span>",
                        escape_html(&format!("{prefix}:{anchor_id}"))
                    )
                }
            },
            Some(slug) => match self.lookup.lookup(&slug, kind, anchor_id) {
                Some(record) if embed && !self.embedded => {
                    self.embed_html(&record, Scope::Foreign(slug))
                }
                Some(record) => reference_link(
                    kind,
                    &format!("/posts/{slug}#{}", kind.html_id(anchor_id)),
                    label,
                    record.number,
                ),
                None => {
                    self.diagnostics.push(Diagnostic::new(
                        "missing_cross_reference",
                        format!("`{prefix}:{anchor_id}` not found in post `{slug}`"),
                    ));
                    let text = label
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("{slug}/{anchor_id}"));
                    format!(
                        "<a class=\"anchor-ref anchor-ref-missing\" href=\"/posts/{slug}\">{}</a>",
                        escape_html(&text)
                    )
                }
            },
        };
        Some(rendered)
    }

    fn embed_html(&mut self, record: &AnchorRecord, scope: Scope) -> String {
        let mut child = self.embedded_child(scope);
        let placement = Some(Placement {
            number: record.number,
            html_id: None,
        });

        let inner = match (record.kind, ContainerKind::from_anchor_kind(record.kind)) {
            (AnchorKind::Equation, _) => equation_html(&record.content, placement),
            (AnchorKind::Image, _) => match IMAGE_RE.captures(&record.content) {
                Some(caps) => figure_html(&caps[1], &caps[2], placement),
                None => String::new(),
            },
            (_, Some(container)) => {
                let (blocks, _) = parse_blocks(&record.content);
                let body = child.render_blocks(&blocks);
                container_html(container, record.title.as_deref(), placement, &body)
            }
            (_, None) => String::new(),
        };
        self.diagnostics.append(&mut child.diagnostics);

        format!(
            "<div class=\"anchor-embed anchor-embed-{}\">{inner}</div>",
            record.kind.prefix()
        )
    }

    fn plot_html(&mut self, spec: &str) -> String {
        let message = match serde_json::from_str::<serde_json::Value>(spec) {
            Ok(value) if value.is_object() => {
                let caption = value
                    .get("title")
                    .and_then(serde_json::Value::as_str)
                    .map(|title| format!("<figcaption>{}</figcaption>", escape_html(title)))
                    .unwrap_or_default();
                return format!(
                    "<figure class=\"plot\"><div class=\"plot-canvas\" data-plot=\"{}\"></div>{caption}</figure>",
                    escape_html(&value.to_string())
                );
            }
            Ok(_) => "plot specification must be a JSON object".to_string(),
            Err(err) => format!("invalid plot specification: {err}"),
        };
        self.diagnostics
            .push(Diagnostic::new("invalid_plot", message.clone()));
        format!("<div class=\"plot-error\">{}</div>", escape_html(&message))
    }
}

fn reference_link(kind: AnchorKind, href: &str, label: Option<&str>, number: u32) -> String {
    let text = label
        .map(str::to_string)
        .unwrap_or_else(|| kind.default_reference_label(number));
    format!(
        "<a class=\"anchor-ref anchor-ref-{}\" href=\"{}\">{}</a>",
        kind.prefix(),
        escape_html(href),
        escape_html(&text)
    )
}

fn equation_html(tex: &str, placement: Option<Placement>) -> String {
    let (id_attr, number) = match placement {
        Some(placement) => (
            id_attribute(placement.html_id.as_deref()),
            format!(
                "<span class=\"equation-number\">({})</span>",
                placement.number
            ),
        ),
        None => (String::new(), String::new()),
    };
    format!(
        "<div class=\"equation\"{id_attr}><span class=\"math math-display\">{}</span>{number}</div>",
        escape_html(tex.trim())
    )
}

fn figure_html(alt: &str, src: &str, placement: Option<Placement>) -> String {
    let alt = alt.trim();
    let (id_attr, caption) = match placement {
        Some(placement) => {
            let label = AnchorKind::Image.default_reference_label(placement.number);
            let caption = if alt.is_empty() {
                label
            } else {
                format!("{label}. {alt}")
            };
            (id_attribute(placement.html_id.as_deref()), caption)
        }
        None => (String::new(), alt.to_string()),
    };
    let caption = if caption.is_empty() {
        String::new()
    } else {
        format!("<figcaption>{}</figcaption>", escape_html(&caption))
    };
    format!(
        "<figure class=\"figure\"{id_attr}><img src=\"{}\" alt=\"{}\" />{caption}</figure>",
        escape_html(src),
        escape_html(alt)
    )
}

fn container_html(
    kind: ContainerKind,
    title: Option<&str>,
    placement: Option<Placement>,
    body: &str,
) -> String {
    let Some(anchor_kind) = kind.anchor_kind() else {
        let summary = escape_html(title.unwrap_or("Details"));
        return format!(
            "<details class=\"expandable\"><summary>{summary}</summary><div class=\"details-body\">{body}</div></details>"
        );
    };

    let (id_attr, label) = match placement {
        Some(placement) => (
            id_attribute(placement.html_id.as_deref()),
            format!("{} {}", anchor_kind.label(), placement.number),
        ),
        None => (String::new(), anchor_kind.label().to_string()),
    };
    let title = title
        .map(|title| format!(" <span class=\"block-title\">({})</span>", escape_html(title)))
        .unwrap_or_default();
    let qed = if kind == ContainerKind::Proof {
        "<span class=\"qed\">\u{220e}</span>"
    } else {
        ""
    };
    format!(
        "<div class=\"{class}\"{id_attr}><div class=\"block-header\"><span class=\"block-label\">{label}</span>{title}</div><div class=\"block-body\">{body}{qed}</div></div>",
        class = anchor_kind.label().to_ascii_lowercase(),
    )
}

fn id_attribute(html_id: Option<&str>) -> String {
    html_id
        .map(|id| format!(" id=\"{}\"", escape_html(id)))
        .unwrap_or_default()
}

/// HTML fragments parked behind tokens of one render pass.
struct Slots {
    nonce: String,
    rendered: Vec<String>,
}

impl Slots {
    fn new() -> Self {
        Self {
            nonce: Uuid::new_v4().simple().to_string(),
            rendered: Vec::new(),
        }
    }

    fn token(&self, index: usize) -> String {
        format!("{SLOT_PREFIX}{}{index}{SLOT_SUFFIX}", self.nonce)
    }

    fn push(&mut self, rendered: String) -> String {
        let token = self.token(self.rendered.len());
        self.rendered.push(rendered);
        token
    }

    /// Parks block-level HTML as its own paragraph.
    fn push_block(&mut self, markdown: &mut String, rendered: String) {
        let token = self.push(rendered);
        markdown.push('\n');
        markdown.push_str(&token);
        markdown.push_str("\n\n");
    }

    fn splice(&self, mut html: String) -> String {
        for (index, rendered) in self.rendered.iter().enumerate() {
            let token = self.token(index);
            html = html.replace(&format!("<p>{token}</p>"), rendered);
            html = html.replace(&token, rendered);
        }
        html
    }
}

fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_MATH);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::Renderer;
    use crate::markdown::{AnchorLookup, NoAnchorLookup};
    use crate::model::anchor::{AnchorKind, AnchorRecord};

    struct OnePost;

    impl AnchorLookup for OnePost {
        fn lookup(
            &self,
            post_slug: &str,
            kind: AnchorKind,
            anchor_id: &str,
        ) -> Option<AnchorRecord> {
            match (post_slug, kind, anchor_id) {
                ("groups", AnchorKind::Definition, "group") => Some(AnchorRecord {
                    kind,
                    anchor_id: anchor_id.to_string(),
                    number: 2,
                    title: Some("Group".to_string()),
                    content: "A set closed under {{def:op}}.".to_string(),
                }),
                ("groups", AnchorKind::Definition, "op") => Some(AnchorRecord {
                    kind,
                    anchor_id: anchor_id.to_string(),
                    number: 1,
                    title: None,
                    content: "An operation.".to_string(),
                }),
                _ => None,
            }
        }
    }

    #[test]
    fn numbers_equations_and_links_references() {
        let rendered = Renderer::new(&NoAnchorLookup)
            .render("$$ e^{i\\pi} = -1 $$ {#eq:euler}\n\nSee {{eq:euler}} and {{eq:euler|Euler}}.");
        assert!(rendered.html.contains(
            "<div class=\"equation\" id=\"eq-euler\"><span class=\"math math-display\">e^{i\\pi} = -1</span><span class=\"equation-number\">(1)</span></div>"
        ));
        assert!(rendered
            .html
            .contains("<a class=\"anchor-ref anchor-ref-eq\" href=\"#eq-euler\">(1)</a>"));
        assert!(rendered.html.contains(">Euler</a>"));
        assert!(!rendered.html.contains("<p><div"));
        assert!(rendered.diagnostics.is_empty());
    }

    #[test]
    fn literal_slot_text_in_code_is_left_alone() {
        let source = "```\nMDXSLOT0TOLSXDM\n```\n\n$$ x = 1 $$ {#eq:one}\n\nSee {{eq:one}}, not `MDXSLOT1TOLSXDM`.";
        let html = Renderer::new(&NoAnchorLookup).render(source).html;
        assert!(html.contains("<pre><code>MDXSLOT0TOLSXDM\n</code></pre>"));
        assert!(html.contains("<code>MDXSLOT1TOLSXDM</code>"));
        assert_eq!(html.matches("<div class=\"equation\"").count(), 1);
        assert_eq!(html.matches("href=\"#eq-one\"").count(), 1);
        assert!(html.find("</pre>") < html.find("<div class=\"equation\""));
    }

    #[test]
    fn missing_local_reference_renders_error_span() {
        let rendered = Renderer::new(&NoAnchorLookup).render("See {{thm:nope}}.");
        assert!(rendered
            .html
            .contains("<span class=\"anchor-error\">Unresolved reference thm:nope</span>"));
        assert_eq!(rendered.diagnostics[0].code, "unresolved_reference");
    }

    #[test]
    fn missing_cross_reference_falls_back_to_post_link() {
        let rendered =
            Renderer::new(&NoAnchorLookup).render("See {{def:algebra/ring|rings}}.");
        assert!(rendered.html.contains(
            "<a class=\"anchor-ref anchor-ref-missing\" href=\"/posts/algebra\">rings</a>"
        ));
    }

    #[test]
    fn own_slug_reference_is_local() {
        let rendered = Renderer::new(&NoAnchorLookup)
            .with_post_slug("calculus")
            .render(":::definition Limit {#def:limit}\nBody.\n:::\n\n{{def:calculus/limit}}");
        assert!(rendered
            .html
            .contains("<a class=\"anchor-ref anchor-ref-def\" href=\"#def-limit\">Definition 1</a>"));
    }

    #[test]
    fn cross_post_embed_resolves_inner_references_against_source_post() {
        let rendered = Renderer::new(&OnePost).render("{{def:groups/group|embed}}");
        assert!(rendered
            .html
            .contains("<div class=\"anchor-embed anchor-embed-def\"><div class=\"definition\">"));
        assert!(rendered.html.contains("Definition 2"));
        assert!(rendered.html.contains("<span class=\"block-title\">(Group)</span>"));
        assert!(rendered.html.contains(
            "<a class=\"anchor-ref anchor-ref-def\" href=\"/posts/groups#def-op\">Definition 1</a>"
        ));
    }

    #[test]
    fn embeds_inside_embedded_content_become_links() {
        let source = ":::definition Ring {#def:ring}\nUses {{def:field|embed}}.\n:::\n\n:::definition Field {#def:field}\nA field.\n:::\n\n{{def:ring|embed}}";
        let rendered = Renderer::new(&NoAnchorLookup).render(source);
        assert_eq!(rendered.html.matches("anchor-embed-def").count(), 2);
        let embed_start = rendered
            .html
            .rfind("anchor-embed-def")
            .expect("ring should be embedded");
        let embedded = &rendered.html[embed_start..];
        assert!(embedded.contains(
            "<a class=\"anchor-ref anchor-ref-def\" href=\"#def-field\">Definition 2</a>"
        ));
    }

    #[test]
    fn code_is_never_rewritten() {
        let source = "Inline `{{eq:x}}` stays.\n\n```\n{{eq:x}}\n$$ y $$ {#eq:y}\n```";
        let rendered = Renderer::new(&NoAnchorLookup).render(source);
        assert!(rendered.html.contains("<code>{{eq:x}}</code>"));
        assert!(rendered.html.contains("{{eq:x}}\n$$ y $$ {#eq:y}"));
        assert!(rendered.anchors.is_empty());
        assert!(rendered.diagnostics.is_empty());
    }

    #[test]
    fn figures_proofs_details_and_plots() {
        let source = "\
![Unit circle](circle.png){#img:circle}

:::proof
Obvious.
:::

:::details Show derivation
Steps.
:::

```plot
{\"title\": \"Sine\", \"data\": [1, 2]}
```

```plot
not json
```";
        let rendered = Renderer::new(&NoAnchorLookup).render(source);
        assert!(rendered.html.contains(
            "<figure class=\"figure\" id=\"img-circle\"><img src=\"circle.png\" alt=\"Unit circle\" /><figcaption>Figure 1. Unit circle</figcaption></figure>"
        ));
        assert!(rendered.html.contains("<span class=\"qed\">\u{220e}</span>"));
        assert!(rendered
            .html
            .contains("<details class=\"expandable\"><summary>Show derivation</summary>"));
        assert!(rendered.html.contains("<figure class=\"plot\"><div class=\"plot-canvas\" data-plot=\""));
        assert!(rendered.html.contains("<figcaption>Sine</figcaption>"));
        assert!(rendered.html.contains("<div class=\"plot-error\">"));
        assert_eq!(rendered.diagnostics.len(), 1);
        assert_eq!(rendered.diagnostics[0].code, "invalid_plot");
    }
}
