//! Placement of the managed tracker blocks at the top and bottom of a body.
//!
//! ## State Machine
//!
//! ```text
//! statsTop  statsBottom   mode
//! false     false         None          → strip existing top/bottom blocks
//! true      false         TopOnly       → ensure index 0, strip bottom
//! false     true          BottomOnly    → strip top, ensure last
//! true      true          TopAndBottom  → ensure both
//! ```
//!
//! The top is resolved first. Inserting or removing at index 0 shifts every
//! later index, so the bottom scan always re-reads the body afterwards. The
//! bottom scan walks backwards and stops before index 0 when index 0 is a
//! block, so the top block is never mistaken for the bottom one.
//!
//! When the body ends in a block that the scan could not claim (a lone block
//! at index 0 with both placements on), no second block is appended: that
//! single block serves as both top and bottom.

use serde::Serialize;

use crate::block::is_stats_paragraph;
use crate::document::Document;
use crate::error::Result;
use crate::removal::{safe_remove, RemovalOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMode {
    None,
    TopOnly,
    BottomOnly,
    TopAndBottom,
}

impl PlacementMode {
    pub fn from_flags(top: bool, bottom: bool) -> Self {
        match (top, bottom) {
            (false, false) => PlacementMode::None,
            (true, false) => PlacementMode::TopOnly,
            (false, true) => PlacementMode::BottomOnly,
            (true, true) => PlacementMode::TopAndBottom,
        }
    }

    pub fn wants_top(self) -> bool {
        matches!(self, PlacementMode::TopOnly | PlacementMode::TopAndBottom)
    }

    pub fn wants_bottom(self) -> bool {
        matches!(self, PlacementMode::BottomOnly | PlacementMode::TopAndBottom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum PlacementAction {
    UpdatedTop,
    InsertedTop,
    RemovedTop { detached: bool },
    UpdatedBottom { index: usize },
    RemovedBottom { index: usize, detached: bool },
    AppendedBottom,
    /// Bottom wanted, but the body already ends in a block.
    SharedBottom,
    /// A removal failed every strategy.
    RemovalSkipped { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PlacementReport {
    pub actions: Vec<PlacementAction>,
}

impl PlacementReport {
    fn push(&mut self, action: PlacementAction) {
        tracing::debug!(action = ?action, "Placement step");
        self.actions.push(action);
    }
}

/// Brings the body's top and bottom blocks in line with `mode`, writing
/// `block` into every managed block it keeps or creates.
pub fn reconcile<D: Document + ?Sized>(
    doc: &mut D,
    mode: PlacementMode,
    block: &str,
) -> Result<PlacementReport> {
    let mut report = PlacementReport::default();
    place_top(doc, mode.wants_top(), block, &mut report)?;
    place_bottom(doc, mode.wants_bottom(), block, &mut report)?;
    Ok(report)
}

fn place_top<D: Document + ?Sized>(
    doc: &mut D,
    wanted: bool,
    block: &str,
    report: &mut PlacementReport,
) -> Result<()> {
    let paragraphs = doc.paragraphs()?;
    let has_top = is_stats_paragraph(paragraphs.first());

    match (wanted, has_top) {
        (true, true) => {
            doc.set_text(0, block)?;
            report.push(PlacementAction::UpdatedTop);
        }
        (true, false) => {
            doc.insert_paragraph(0, block)?;
            report.push(PlacementAction::InsertedTop);
        }
        (false, true) => match safe_remove(doc, 0) {
            RemovalOutcome::Kept => report.push(PlacementAction::RemovalSkipped { index: 0 }),
            outcome => report.push(PlacementAction::RemovedTop {
                detached: outcome.detached(),
            }),
        },
        (false, false) => {}
    }
    Ok(())
}

fn place_bottom<D: Document + ?Sized>(
    doc: &mut D,
    wanted: bool,
    block: &str,
    report: &mut PlacementReport,
) -> Result<()> {
    let paragraphs = doc.paragraphs()?;
    let floor = if is_stats_paragraph(paragraphs.first()) {
        1
    } else {
        0
    };

    let found = (floor..paragraphs.len())
        .rev()
        .find(|&index| is_stats_paragraph(paragraphs.get(index)));

    match (found, wanted) {
        (Some(index), true) => {
            doc.set_text(index, block)?;
            report.push(PlacementAction::UpdatedBottom { index });
        }
        (Some(index), false) => match safe_remove(doc, index) {
            RemovalOutcome::Kept => report.push(PlacementAction::RemovalSkipped { index }),
            outcome => report.push(PlacementAction::RemovedBottom {
                index,
                detached: outcome.detached(),
            }),
        },
        (None, true) => {
            if is_stats_paragraph(paragraphs.last()) {
                report.push(PlacementAction::SharedBottom);
            } else {
                doc.append_paragraph(block)?;
                report.push(PlacementAction::AppendedBottom);
            }
        }
        (None, false) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ElementKind, MemoryDocument, Paragraph};

    const BLOCK: &str = "⏰\nLast edit: now — 0 sec ago\nLongest time away: 0 sec\nStatus: Live";
    const OLD: &str = "⏰\nLast edit: then — 5 min ago\nLongest time away: 5 min\nStatus: Away";

    fn doc(texts: &[&str]) -> MemoryDocument {
        MemoryDocument::from_texts("doc", texts)
    }

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(PlacementMode::from_flags(false, false), PlacementMode::None);
        assert_eq!(PlacementMode::from_flags(true, true), PlacementMode::TopAndBottom);
        assert!(PlacementMode::TopOnly.wants_top());
        assert!(!PlacementMode::TopOnly.wants_bottom());
    }

    #[test]
    fn test_inserts_top_and_appends_bottom() {
        let mut d = doc(&["note"]);
        let report = reconcile(&mut d, PlacementMode::TopAndBottom, BLOCK).unwrap();
        assert_eq!(d.texts(), vec![BLOCK, "note", BLOCK]);
        assert_eq!(
            report.actions,
            vec![PlacementAction::InsertedTop, PlacementAction::AppendedBottom]
        );
    }

    #[test]
    fn test_updates_existing_blocks_in_place() {
        let mut d = doc(&[OLD, "note", OLD]);
        reconcile(&mut d, PlacementMode::TopAndBottom, BLOCK).unwrap();
        assert_eq!(d.texts(), vec![BLOCK, "note", BLOCK]);
    }

    #[test]
    fn test_bottom_scan_ignores_top_block() {
        let mut d = doc(&[OLD, "note"]);
        let report = reconcile(&mut d, PlacementMode::BottomOnly, BLOCK).unwrap();
        assert_eq!(d.texts(), vec!["note", BLOCK]);
        assert_eq!(report.actions[0], PlacementAction::RemovedTop { detached: true });
    }

    #[test]
    fn test_top_only_removes_bottom() {
        let mut d = doc(&["note", OLD]);
        reconcile(&mut d, PlacementMode::TopOnly, BLOCK).unwrap();
        assert_eq!(d.texts(), vec![BLOCK, "note"]);
    }

    #[test]
    fn test_bottom_is_last_block_scanning_backwards() {
        let mut d = doc(&["a", OLD, "b"]);
        let report = reconcile(&mut d, PlacementMode::BottomOnly, BLOCK).unwrap();
        assert_eq!(d.texts(), vec!["a", BLOCK, "b"]);
        assert_eq!(report.actions, vec![PlacementAction::UpdatedBottom { index: 1 }]);
    }

    #[test]
    fn test_none_strips_both() {
        let mut d = doc(&[OLD, "note", OLD]);
        reconcile(&mut d, PlacementMode::None, BLOCK).unwrap();
        assert_eq!(d.texts(), vec!["note"]);
    }

    #[test]
    fn test_lone_block_is_shared_between_top_and_bottom() {
        let mut d = doc(&[OLD]);
        let report = reconcile(&mut d, PlacementMode::TopAndBottom, BLOCK).unwrap();
        assert_eq!(d.texts(), vec![BLOCK]);
        assert_eq!(
            report.actions,
            vec![PlacementAction::UpdatedTop, PlacementAction::SharedBottom]
        );
    }

    #[test]
    fn test_empty_body_with_both_gets_one_block() {
        let mut d = doc(&[]);
        reconcile(&mut d, PlacementMode::TopAndBottom, BLOCK).unwrap();
        assert_eq!(d.texts(), vec![BLOCK]);
        reconcile(&mut d, PlacementMode::TopAndBottom, BLOCK).unwrap();
        assert_eq!(d.texts(), vec![BLOCK]);
    }

    #[test]
    fn test_lone_block_removed_by_clearing() {
        let mut d = doc(&[OLD]);
        let report = reconcile(&mut d, PlacementMode::None, BLOCK).unwrap();
        assert_eq!(d.texts(), vec![""]);
        assert_eq!(report.actions, vec![PlacementAction::RemovedTop { detached: false }]);
    }

    #[test]
    fn test_list_items_are_never_managed() {
        let mut d = MemoryDocument::from_paragraphs(
            "doc",
            vec![
                Paragraph::with_kind(ElementKind::ListItem, "⏰ reminder"),
                Paragraph::new("note"),
            ],
        );
        reconcile(&mut d, PlacementMode::BottomOnly, BLOCK).unwrap();
        assert_eq!(d.texts(), vec!["⏰ reminder", "note", BLOCK]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        for mode in [
            PlacementMode::None,
            PlacementMode::TopOnly,
            PlacementMode::BottomOnly,
            PlacementMode::TopAndBottom,
        ] {
            let mut d = doc(&["one", "two"]);
            reconcile(&mut d, mode, BLOCK).unwrap();
            let once = d.clone();
            reconcile(&mut d, mode, BLOCK).unwrap();
            assert_eq!(d, once, "mode {:?} was not idempotent", mode);
        }
    }
}
