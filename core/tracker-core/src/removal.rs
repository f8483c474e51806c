//! Best-effort paragraph removal under the "body is never empty" rule.
//!
//! Removal is an ordered list of strategies. Each one either succeeds or
//! reports why it failed, and the next one is tried. When every strategy
//! fails the paragraph is left in place: tracker maintenance must never
//! block the operation that triggered it.

use crate::document::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalStrategy {
    /// Take the element out of the body.
    Detach,
    /// Keep the element, clear its contents.
    Clear,
    /// Keep the element, overwrite its text with nothing.
    Blank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed(RemovalStrategy),
    /// Every strategy failed; the paragraph is unchanged.
    Kept,
}

impl RemovalOutcome {
    /// True only when the element itself is gone from the body.
    pub fn detached(self) -> bool {
        self == RemovalOutcome::Removed(RemovalStrategy::Detach)
    }
}

/// Strategies to try for the element at `index` of a body of `len` elements.
///
/// The only remaining element is never detached; it is emptied instead.
pub fn strategies_for(index: usize, len: usize) -> &'static [RemovalStrategy] {
    if len <= 1 && index == 0 {
        &[RemovalStrategy::Clear, RemovalStrategy::Blank]
    } else {
        &[
            RemovalStrategy::Detach,
            RemovalStrategy::Clear,
            RemovalStrategy::Blank,
        ]
    }
}

const UNKNOWN_LENGTH_STRATEGIES: &[RemovalStrategy] =
    &[RemovalStrategy::Clear, RemovalStrategy::Blank];

/// Removes the paragraph at `index` as thoroughly as the host allows.
pub fn safe_remove<D: Document + ?Sized>(doc: &mut D, index: usize) -> RemovalOutcome {
    let strategies = match doc.len() {
        Ok(len) => strategies_for(index, len),
        Err(err) => {
            tracing::warn!(error = %err, index, "Failed to read document length before removal");
            // Unknown length: never detach.
            UNKNOWN_LENGTH_STRATEGIES
        }
    };

    for strategy in strategies {
        let result = match strategy {
            RemovalStrategy::Detach => doc.remove_paragraph(index),
            RemovalStrategy::Clear => doc.clear_paragraph(index),
            RemovalStrategy::Blank => doc.set_text(index, ""),
        };
        match result {
            Ok(()) => {
                tracing::debug!(index, strategy = ?strategy, "Paragraph removed");
                return RemovalOutcome::Removed(*strategy);
            }
            Err(err) => {
                tracing::debug!(
                    index,
                    strategy = ?strategy,
                    error = %err,
                    "Removal strategy failed; trying next"
                );
            }
        }
    }

    tracing::warn!(index, doc_id = %doc.id(), "Could not remove paragraph; leaving it in place");
    RemovalOutcome::Kept
}
