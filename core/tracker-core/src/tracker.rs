//! One tracker refresh: observe the body, render blocks, reconcile them.
//!
//! Order matters. Leading blanks are dropped first so the top block lands on
//! real content. Placement runs before markers, and state is saved last: a
//! failure anywhere earlier leaves the stored state untouched.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::block::{render_block, BlockContents, Status, MARKER, SENTINEL};
use crate::config::TrackerConfig;
use crate::detector::{normalize, observe};
use crate::document::{Document, ElementKind};
use crate::error::Result;
use crate::markers::{reconcile_markers, MarkerReport};
use crate::placement::{reconcile, PlacementReport};
use crate::removal::safe_remove;
use crate::store::{StateStore, TrackerState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    pub big_change: bool,
    pub elapsed_ms: u64,
    pub longest_idle_ms: u64,
    pub status: Status,
    /// Leading blank paragraphs dropped before observing.
    pub blanks_removed: usize,
    pub placement: PlacementReport,
    pub markers: MarkerReport,
}

/// Refreshes every tracker block in `doc` and persists the new state.
///
/// Returns `Ok(None)` without touching the store when the body has no
/// elements and nothing would be rendered.
pub fn update_stats<D, S>(
    doc: &mut D,
    store: &mut S,
    config: &TrackerConfig,
    now: DateTime<Utc>,
) -> Result<Option<UpdateReport>>
where
    D: Document + ?Sized,
    S: StateStore + ?Sized,
{
    let blanks_removed = drop_leading_blanks(doc)?;

    if doc.len()? == 0 && config.all_disabled() {
        tracing::debug!(doc_id = %doc.id(), "Empty document with tracking disabled; skipping");
        return Ok(None);
    }

    let previous = TrackerState::load(store, doc.id())?;
    let observation = observe(&previous, normalize(&doc.body_text()?), now);

    let contents = BlockContents {
        last_change: observation.last_change,
        elapsed_ms: observation.elapsed_ms,
        longest_ms: observation.state.longest_idle_ms,
        status: observation.status,
    };
    let stats_block = render_block(SENTINEL, &contents, &config.timezone);
    let marker_block = render_block(MARKER, &contents, &config.timezone);

    let placement = reconcile(doc, config.placement(), &stats_block)?;
    let markers = reconcile_markers(doc, config.stats_anywhere, &marker_block)?;

    observation.state.save(store, doc.id())?;

    let report = UpdateReport {
        big_change: observation.big_change,
        elapsed_ms: observation.elapsed_ms,
        longest_idle_ms: observation.state.longest_idle_ms,
        status: observation.status,
        blanks_removed,
        placement,
        markers,
    };
    tracing::info!(
        doc_id = %doc.id(),
        big_change = report.big_change,
        elapsed_ms = report.elapsed_ms,
        longest_idle_ms = report.longest_idle_ms,
        status = report.status.as_str(),
        "Tracker updated"
    );
    Ok(Some(report))
}

/// Removes blank paragraphs from the start of the body.
///
/// Stops at one remaining element, and as soon as a removal only cleared or
/// blanked its target, since that paragraph would be blank again next pass.
fn drop_leading_blanks<D: Document + ?Sized>(doc: &mut D) -> Result<usize> {
    let mut removed = 0;
    loop {
        let paragraphs = doc.paragraphs()?;
        if paragraphs.len() <= 1 {
            break;
        }
        let first = &paragraphs[0];
        if first.kind != ElementKind::Paragraph || !first.text.trim().is_empty() {
            break;
        }
        if !safe_remove(doc, 0).detached() {
            break;
        }
        removed += 1;
    }
    if removed > 0 {
        tracing::debug!(doc_id = %doc.id(), removed, "Dropped leading blank paragraphs");
    }
    Ok(removed)
}
