use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime, PrimitiveDateTime};

pub fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

/// End of a test window that opens at `start` and lasts `duration_minutes`, or `None`
/// past the last representable instant.
pub fn checked_window_end(start: OffsetDateTime, duration_minutes: u32) -> Option<OffsetDateTime> {
    start.checked_add(Duration::minutes(i64::from(duration_minutes)))
}

/// Like [`checked_window_end`], saturating at the last representable instant.
pub fn window_end(start: OffsetDateTime, duration_minutes: u32) -> OffsetDateTime {
    checked_window_end(start, duration_minutes)
        .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_offset(start.offset()))
}

/// Renders remaining seconds as `MM:SS`; minutes are not wrapped into hours.
pub fn format_countdown(seconds: u64) -> String {
    let minutes = seconds / 60;
    let remaining = seconds % 60;
    format!("{minutes:02}:{remaining:02}")
}
