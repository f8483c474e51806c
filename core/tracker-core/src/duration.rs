//! Human-readable elapsed-time formatting for tracker blocks.

const SEC_MS: u64 = 1_000;
const MIN_MS: u64 = 60 * SEC_MS;
const HOUR_MS: u64 = 60 * MIN_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Formats a millisecond duration as `"1 day, 2 hours, 3 min, 4 sec"`.
///
/// Zero-valued units are dropped. Seconds are always shown when nothing else
/// is, so anything under one second renders as `"0 sec"`. Days and hours are
/// pluralized; minutes and seconds are not.
///
/// # Examples
/// ```
/// use tracker_core::duration::format_elapsed;
/// assert_eq!(format_elapsed(999), "0 sec");
/// assert_eq!(format_elapsed(61_000), "1 min, 1 sec");
/// assert_eq!(format_elapsed(26 * 60 * 60 * 1000), "1 day, 2 hours");
/// ```
pub fn format_elapsed(ms: u64) -> String {
    if ms < SEC_MS {
        return "0 sec".to_string();
    }

    let days = ms / DAY_MS;
    let hours = (ms % DAY_MS) / HOUR_MS;
    let minutes = (ms % HOUR_MS) / MIN_MS;
    let seconds = (ms % MIN_MS) / SEC_MS;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(plural(days, "day", "days"));
    }
    if hours > 0 {
        parts.push(plural(hours, "hour", "hours"));
    }
    if minutes > 0 {
        parts.push(format!("{} min", minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{} sec", seconds));
    }
    parts.join(", ")
}

fn plural(count: u64, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{} {}", count, one)
    } else {
        format!("{} {}", count, many)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_second_is_zero_sec() {
        assert_eq!(format_elapsed(0), "0 sec");
        assert_eq!(format_elapsed(999), "0 sec");
        assert_eq!(format_elapsed(1_000), "1 sec");
    }

    #[test]
    fn test_minutes_and_seconds() {
        assert_eq!(format_elapsed(61_000), "1 min, 1 sec");
        assert_eq!(format_elapsed(90_000), "1 min, 30 sec");
        assert_eq!(format_elapsed(120_000), "2 min");
        assert_eq!(format_elapsed(59_999), "59 sec");
    }

    #[test]
    fn test_exact_units_drop_seconds() {
        assert_eq!(format_elapsed(DAY_MS + 2 * HOUR_MS), "1 day, 2 hours");
        assert_eq!(format_elapsed(HOUR_MS), "1 hour");
        assert_eq!(format_elapsed(3 * DAY_MS), "3 days");
    }

    #[test]
    fn test_skips_zero_middle_units() {
        assert_eq!(format_elapsed(2 * DAY_MS + 5 * SEC_MS), "2 days, 5 sec");
        assert_eq!(
            format_elapsed(DAY_MS + HOUR_MS + MIN_MS + SEC_MS + 500),
            "1 day, 1 hour, 1 min, 1 sec"
        );
    }
}
