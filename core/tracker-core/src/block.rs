//! Tracker block recognition, stripping and rendering.
//!
//! A tracker block is a single paragraph whose text starts with a sentinel
//! glyph and follows a fixed four-line template:
//!
//! ```text
//! ⏰
//! Last edit: 19/10/2026 09:15:02 AM — 3 min, 4 sec ago
//! Longest time away: 2 hours, 1 min
//! Status: Away
//! ```
//!
//! The clock glyph marks the managed top/bottom blocks. The hourglass glyph
//! marks free-standing marker blocks (see `markers`). Both are stripped before
//! change detection, so the rendered text must be stable: the same inputs
//! always produce the same bytes.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::document::{ElementKind, Paragraph};
use crate::duration::format_elapsed;

/// Leading glyph of managed top/bottom blocks.
pub const SENTINEL: char = '⏰';

/// Leading glyph of marker blocks and their bare placeholders.
pub const MARKER: char = '⏳';

pub const DEFAULT_TIMEZONE: &str = "UTC";

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %I:%M:%S %p";

/// Matches a whole rendered block (either glyph) starting at a line boundary.
/// Glyphs inside note text never start a match.
static BLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[⏰⏳]\nLast edit: [^\n]*\nLongest time away: [^\n]*\nStatus: [^\n]*(?:\n|$)",
    )
    .expect("valid block regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Live,
    Away,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Live => "Live",
            Status::Away => "Away",
        }
    }
}

/// Values rendered into a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockContents {
    pub last_change: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub longest_ms: u64,
    pub status: Status,
}

/// True iff `paragraph` is a plain paragraph starting with [`SENTINEL`].
///
/// Fails closed: missing paragraphs and other element kinds are never
/// tracker blocks, whatever their text.
pub fn is_stats_paragraph(paragraph: Option<&Paragraph>) -> bool {
    match paragraph {
        Some(p) => p.kind == ElementKind::Paragraph && p.text.starts_with(SENTINEL),
        None => false,
    }
}

/// Removes every rendered block from `text`, leaving the user's content.
pub fn strip_blocks(text: &str) -> String {
    BLOCK_PATTERN.replace_all(text, "").into_owned()
}

/// Renders a block led by `glyph`, with the timestamp shown in `timezone`.
pub fn render_block(glyph: char, contents: &BlockContents, timezone: &str) -> String {
    let tz = resolve_timezone(timezone);
    let timestamp = contents.last_change.with_timezone(&tz).format(TIMESTAMP_FORMAT);
    format!(
        "{}\nLast edit: {} — {} ago\nLongest time away: {}\nStatus: {}",
        glyph,
        timestamp,
        format_elapsed(contents.elapsed_ms),
        format_elapsed(contents.longest_ms),
        contents.status.as_str()
    )
}

/// Resolves an IANA timezone name, falling back to UTC.
pub fn resolve_timezone(name: &str) -> Tz {
    let name = name.trim();
    if name.is_empty() {
        return Tz::UTC;
    }
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(timezone = %name, "Unknown timezone; rendering in UTC");
            Tz::UTC
        }
    }
}
