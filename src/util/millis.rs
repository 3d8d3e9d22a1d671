//! Unix-millisecond conversions for persisted timestamps.

use std::time::Duration;

use time::OffsetDateTime;

const NANOS_PER_MILLI: i128 = 1_000_000;

/// Milliseconds since the Unix epoch, truncated toward negative infinity.
pub fn to_unix_millis(at: OffsetDateTime) -> i64 {
    let millis = at.unix_timestamp_nanos().div_euclid(NANOS_PER_MILLI);
    i64::try_from(millis).unwrap_or(if millis.is_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Inverse of [`to_unix_millis`]; `None` when the value is outside the
/// representable calendar range.
pub fn from_unix_millis(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * NANOS_PER_MILLI).ok()
}

/// Whole milliseconds in a duration, saturating at `i64::MAX`.
pub fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
