//! Coarse change detection and timing derivation.
//!
//! A "big change" is a length delta over [`BIG_CHANGE_THRESHOLD`] between the
//! normalized body and the last stored normalized body. Small deltas are
//! treated as editor noise (trailing newlines, smart quotes) rather than edits.
//! Lengths are counted in UTF-16 code units, which is what document hosts
//! report.

use chrono::{DateTime, Utc};

use crate::block::{strip_blocks, Status};
use crate::store::TrackerState;

pub const BIG_CHANGE_THRESHOLD: usize = 5;

/// Idle time below this keeps a document Live.
pub const LIVE_WINDOW_MS: u64 = 2 * 60 * 1000;

/// Result of observing a document at `now`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// State to persist after this observation.
    pub state: TrackerState,
    pub big_change: bool,
    pub elapsed_ms: u64,
    pub status: Status,
    /// When the body last changed, as of this observation.
    pub last_change: DateTime<Utc>,
}

/// Normalizes raw body text by stripping every rendered block.
pub fn normalize(body_text: &str) -> String {
    strip_blocks(body_text)
}

/// Compares `normalized` against `previous` and derives new timings.
///
/// `last_change` moves to `now` on a big change or when none was stored.
/// `last_live` moves to `now` on a big change and is initialized to `now`
/// when never set. Elapsed time is clamped at zero so a stored timestamp
/// from the future cannot produce negative idle time.
pub fn observe(previous: &TrackerState, normalized: String, now: DateTime<Utc>) -> Observation {
    let big_change = utf16_len(&normalized).abs_diff(utf16_len(&previous.last_content))
        > BIG_CHANGE_THRESHOLD;

    let last_change = match previous.last_change {
        Some(changed) if !big_change => changed,
        _ => now,
    };
    let last_live = if big_change {
        now
    } else {
        previous.last_live.unwrap_or(now)
    };

    let elapsed_ms = (now - last_change).num_milliseconds().max(0) as u64;
    let longest_idle_ms = previous.longest_idle_ms.max(elapsed_ms);
    let status = if elapsed_ms < LIVE_WINDOW_MS {
        Status::Live
    } else {
        Status::Away
    };

    Observation {
        state: TrackerState {
            last_content: normalized,
            last_change: Some(last_change),
            longest_idle_ms,
            last_live: Some(last_live),
        },
        big_change,
        elapsed_ms,
        status,
        last_change,
    }
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}
