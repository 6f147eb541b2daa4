//! Per-document anchor index.

use super::blocks::{parse_blocks, split_inline_code, Block, Segment, ANCHORED_IMAGE_RE};
use super::Diagnostic;
use crate::model::anchor::{AnchorKind, AnchorRecord};
use std::collections::HashMap;

/// Anchors declared by one document, numbered per kind in order of first
/// appearance.
#[derive(Debug, Clone, Default)]
pub struct AnchorIndex {
    records: Vec<AnchorRecord>,
    positions: HashMap<(AnchorKind, String), usize>,
    counters: HashMap<AnchorKind, u32>,
}

impl AnchorIndex {
    /// Walks `blocks` in document order. Duplicate declarations keep the
    /// first occurrence and add a `duplicate_anchor` diagnostic.
    pub fn build(blocks: &[Block], diagnostics: &mut Vec<Diagnostic>) -> Self {
        let mut index = Self::default();
        index.walk(blocks, diagnostics);
        index
    }

    pub fn get(&self, kind: AnchorKind, anchor_id: &str) -> Option<&AnchorRecord> {
        self.positions
            .get(&(kind, anchor_id.to_string()))
            .map(|&idx| &self.records[idx])
    }

    pub fn records(&self) -> &[AnchorRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<AnchorRecord> {
        self.records
    }

    fn walk(&mut self, blocks: &[Block], diagnostics: &mut Vec<Diagnostic>) {
        for block in blocks {
            match block {
                Block::Text(text) => {
                    for segment in split_inline_code(text) {
                        let Segment::Prose(prose) = segment else {
                            continue;
                        };
                        for caps in ANCHORED_IMAGE_RE.captures_iter(prose) {
                            let alt = caps[1].trim();
                            self.declare(
                                AnchorKind::Image,
                                &caps[3],
                                Some(alt.to_string()).filter(|value| !value.is_empty()),
                                format!("![{}]({})", &caps[1], &caps[2]),
                                diagnostics,
                            );
                        }
                    }
                }
                Block::Equation {
                    tex,
                    anchor: Some(id),
                } => {
                    self.declare(AnchorKind::Equation, id, None, tex.clone(), diagnostics);
                }
                Block::Container {
                    kind,
                    title,
                    anchor,
                    body,
                    source,
                } => {
                    if let (Some(anchor_kind), Some(id)) = (kind.anchor_kind(), anchor) {
                        self.declare(anchor_kind, id, title.clone(), source.clone(), diagnostics);
                    }
                    self.walk(body, diagnostics);
                }
                Block::Equation { anchor: None, .. } | Block::Code(_) | Block::Plot { .. } => {}
            }
        }
    }

    fn declare(
        &mut self,
        kind: AnchorKind,
        anchor_id: &str,
        title: Option<String>,
        content: String,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let key = (kind, anchor_id.to_string());
        if self.positions.contains_key(&key) {
            diagnostics.push(Diagnostic::new(
                "duplicate_anchor",
                format!(
                    "`{}:{anchor_id}` is declared more than once; the first declaration wins",
                    kind.prefix()
                ),
            ));
            return;
        }

        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        self.positions.insert(key, self.records.len());
        self.records.push(AnchorRecord {
            kind,
            anchor_id: anchor_id.to_string(),
            number: *counter,
            title,
            content,
        });
    }
}

/// Lists the anchors `source` declares, in order of first appearance.
pub fn extract_anchors(source: &str) -> Vec<AnchorRecord> {
    let (blocks, mut diagnostics) = parse_blocks(source);
    AnchorIndex::build(&blocks, &mut diagnostics).into_records()
}
