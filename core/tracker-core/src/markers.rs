//! Free-standing marker blocks.
//!
//! A paragraph containing only `⏳` is a placeholder the user dropped into
//! the body. With `statsAnywhere` on, each placeholder is expanded into a
//! marker block (the tracker template led by `⏳`) and already expanded
//! blocks are refreshed. With it off, expanded marker blocks collapse back to
//! the bare placeholder, so toggling never loses the user's chosen positions.

use serde::Serialize;

use crate::block::MARKER;
use crate::document::{Document, ElementKind};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MarkerReport {
    pub expanded: usize,
    pub refreshed: usize,
    pub collapsed: usize,
}

fn is_placeholder(text: &str) -> bool {
    let mut chars = text.trim().chars();
    chars.next() == Some(MARKER) && chars.next().is_none()
}

fn is_expanded(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next() == Some(MARKER) && chars.next() == Some('\n')
}

/// Expands (`enabled`) or collapses every marker in the body.
pub fn reconcile_markers<D: Document + ?Sized>(
    doc: &mut D,
    enabled: bool,
    block: &str,
) -> Result<MarkerReport> {
    let mut report = MarkerReport::default();
    let placeholder = MARKER.to_string();

    for (index, paragraph) in doc.paragraphs()?.iter().enumerate() {
        if paragraph.kind != ElementKind::Paragraph {
            continue;
        }
        if enabled && is_placeholder(&paragraph.text) {
            doc.set_text(index, block)?;
            report.expanded += 1;
        } else if enabled && is_expanded(&paragraph.text) {
            if paragraph.text != block {
                doc.set_text(index, block)?;
            }
            report.refreshed += 1;
        } else if !enabled && is_expanded(&paragraph.text) {
            doc.set_text(index, &placeholder)?;
            report.collapsed += 1;
        }
    }

    if report.expanded > 0 || report.collapsed > 0 {
        tracing::debug!(
            doc_id = %doc.id(),
            expanded = report.expanded,
            refreshed = report.refreshed,
            collapsed = report.collapsed,
            "Marker blocks reconciled"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;

    const MARKER_BLOCK: &str = "⏳\nLast edit: now — 0 sec ago\nLongest time away: 0 sec\nStatus: Live";

    #[test]
    fn test_expands_placeholders_only() {
        let mut doc = MemoryDocument::from_texts("doc", &["a", " ⏳ ", "⏳ later", "b"]);
        let report = reconcile_markers(&mut doc, true, MARKER_BLOCK).unwrap();
        assert_eq!(report.expanded, 1);
        assert_eq!(doc.texts(), vec!["a", MARKER_BLOCK, "⏳ later", "b"]);
    }

    #[test]
    fn test_collapses_expanded_blocks() {
        let mut doc = MemoryDocument::from_texts("doc", &[MARKER_BLOCK, "a", MARKER_BLOCK]);
        let report = reconcile_markers(&mut doc, false, MARKER_BLOCK).unwrap();
        assert_eq!(report.collapsed, 2);
        assert_eq!(doc.texts(), vec!["⏳", "a", "⏳"]);
    }

    #[test]
    fn test_refreshes_expanded_blocks() {
        let mut doc = MemoryDocument::from_texts("doc", &[MARKER_BLOCK, "a"]);
        let report = reconcile_markers(&mut doc, true, "⏳\nnewer").unwrap();
        assert_eq!(report.refreshed, 1);
        assert_eq!(report.expanded, 0);
        assert_eq!(doc.texts(), vec!["⏳\nnewer", "a"]);
    }

    #[test]
    fn test_disabled_leaves_placeholders_alone() {
        let mut doc = MemoryDocument::from_texts("doc", &["⏳", "a"]);
        let report = reconcile_markers(&mut doc, false, MARKER_BLOCK).unwrap();
        assert_eq!(report, MarkerReport::default());
        assert_eq!(doc.texts(), vec!["⏳", "a"]);
    }
}
