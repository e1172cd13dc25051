//! FILETIME conversion.
//!
//! Snapshot creation times are stored on disk as Windows FILETIME values:
//! 100-nanosecond intervals since 1601-01-01 00:00:00 UTC.

use chrono::{DateTime, TimeZone, Utc};

/// Seconds between 1601-01-01 and the Unix epoch.
const EPOCH_DELTA_SECS: i64 = 11_644_473_600;

/// Intervals per second (100 ns each).
const TICKS_PER_SEC: i64 = 10_000_000;

/// Convert a FILETIME value to a UTC timestamp.
///
/// Returns `None` for values outside the range `chrono` can represent
/// (including pre-1970 timestamps, which never occur in a valid catalog).
pub fn filetime_to_utc(filetime: u64) -> Option<DateTime<Utc>> {
    let ticks: i64 = i64::try_from(filetime).ok()?;
    let unix_secs: i64 = ticks / TICKS_PER_SEC - EPOCH_DELTA_SECS;
    if unix_secs < 0 {
        return None;
    }
    let nanos: u32 = u32::try_from((ticks % TICKS_PER_SEC) * 100).ok()?;
    Utc.timestamp_opt(unix_secs, nanos).single()
}

/// Convert a UTC timestamp to a FILETIME value.
///
/// Returns `None` for timestamps before 1601.
pub fn utc_to_filetime(when: DateTime<Utc>) -> Option<u64> {
    let secs: i64 = when.timestamp().checked_add(EPOCH_DELTA_SECS)?;
    let ticks: i64 = secs.checked_mul(TICKS_PER_SEC)?
        + i64::from(when.timestamp_subsec_nanos() / 100);
    u64::try_from(ticks).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_conversion() {
        // 1970-01-01 00:00:00 UTC as FILETIME.
        let ft: u64 = 116_444_736_000_000_000;
        let utc = filetime_to_utc(ft).unwrap();
        assert_eq!(utc.timestamp(), 0);
        assert_eq!(utc_to_filetime(utc).unwrap(), ft);
    }

    #[test]
    fn test_known_timestamp() {
        let when = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let ft: u64 = utc_to_filetime(when).unwrap();
        assert_eq!(filetime_to_utc(ft).unwrap(), when);
    }

    #[test]
    fn test_subsecond_precision() {
        let ft: u64 = 116_444_736_000_000_000 + 5_000_000; // +500ms
        let utc = filetime_to_utc(ft).unwrap();
        assert_eq!(utc.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_pre_unix_filetime_rejected() {
        assert!(filetime_to_utc(0).is_none());
    }
}
