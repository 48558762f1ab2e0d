//! Timestamp decoding and filesystem mtime application.
//!
//! The UTC conversions in this module are pure computations on top of
//! [`chrono`] and are thread-safe. [`set_local_timezone`] is the one
//! exception: it mutates the process-wide `TZ` variable and must not race
//! with other threads reading the environment.

use std::env;
use std::fs::{File, FileTimes};
use std::io;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use tracing::warn;

/// 100-nanosecond ticks between 1601-01-01 and the Unix epoch.
const FILETIME_OFFSET: i64 = 0x019D_B1DE_D53E_8000;

const TICKS_PER_SECOND: i64 = 10_000_000;

/// Decodes a Win32 FILETIME into Unix seconds and nanoseconds.
///
/// Values before the 1601 → 1970 offset are warned about but still decoded;
/// the result is then a negative timestamp with `nsec` still in `[0, 10⁹)`.
pub fn filetime_to_unix(filetime: i64) -> (i64, u32) {
    if filetime < FILETIME_OFFSET {
        warn!(filetime, "unexpected filetime");
    }
    let ticks = filetime - FILETIME_OFFSET;

    let timestamp = ticks.div_euclid(TICKS_PER_SECOND);
    let nsec = u32::try_from(ticks.rem_euclid(TICKS_PER_SECOND)).unwrap_or_default() * 100;
    (timestamp, nsec)
}

/// Decodes a FAT date/time pair, as stored by 16-bit installers, into Unix
/// seconds. FAT timestamps have 2-second resolution and no timezone; they are
/// interpreted as UTC.
pub fn fat_datetime_to_unix(date: u16, time: u16) -> i64 {
    let sec = u32::from(time & 0x1F) * 2;
    let min = u32::from((time >> 5) & 0x3F);
    let hour = u32::from(time >> 11);
    let mday = u32::from(date & 0x1F);
    let mon = u32::from((date >> 5) & 0xF);
    let year = i32::from(date >> 9) + 1980;

    let Some(datetime) = NaiveDate::from_ymd_opt(year, mon, mday)
        .and_then(|day| day.and_hms_opt(hour, min, sec))
    else {
        warn!(year, mon, mday, hour, min, sec, "unexpected FAT timestamp");
        return 0;
    };

    parse_time(datetime)
}

/// Converts broken-down UTC clock time to a Unix timestamp.
pub fn parse_time(tm: NaiveDateTime) -> i64 {
    tm.and_utc().timestamp()
}

/// Converts a Unix timestamp to broken-down UTC clock time.
pub fn format_time(timestamp: i64) -> NaiveDateTime {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .naive_utc()
}

/// Shifts a timestamp so that formatting it as UTC shows local clock time.
pub fn to_local_time(timestamp: i64) -> i64 {
    match Local.from_local_datetime(&format_time(timestamp)) {
        LocalResult::Single(local) | LocalResult::Ambiguous(local, _) => local.timestamp(),
        LocalResult::None => timestamp,
    }
}

/// Sets the timezone used by [`to_local_time`].
///
/// `TZ` interprets its offset as the change from local time to UTC while
/// everyone else does the opposite. The direction is flipped here so that
/// strings such as `GMT+1` work as expected.
///
/// This mutates the process environment and is not thread-safe; call it
/// before spawning threads that read the environment.
pub fn set_local_timezone(timezone: &str) {
    let flipped: String = timezone
        .chars()
        .map(|c| match c {
            '+' => '-',
            '-' => '+',
            other => other,
        })
        .collect();

    // SAFETY: single-threaded by this function's documented contract.
    unsafe {
        env::set_var("TZ", flipped);
    }
}

/// Sets a file's modification time, at the best precision the host provides.
pub fn set_file_time(path: &Path, timestamp: i64, nsec: u32) -> io::Result<()> {
    let mtime = if timestamp >= 0 {
        UNIX_EPOCH + Duration::new(timestamp.unsigned_abs(), nsec)
    } else {
        UNIX_EPOCH - Duration::from_secs(timestamp.unsigned_abs()) + Duration::from_nanos(nsec.into())
    };

    let file = File::options().write(true).open(path)?;
    file.set_times(FileTimes::new().set_modified(mtime))
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use rstest::rstest;

    use super::{
        FILETIME_OFFSET, fat_datetime_to_unix, filetime_to_unix, format_time, parse_time,
        set_file_time,
    };

    #[test]
    fn fat_noon_at_the_millennium() {
        // 12:00:00 on 2000-01-01
        assert_eq!(fat_datetime_to_unix(0x2821, 0x6000), 946_728_000);
    }

    #[test]
    fn fat_out_of_range_field() {
        // Month 15 does not exist.
        assert_eq!(fat_datetime_to_unix(0x29E1, 0), 0);
    }

    #[rstest]
    #[case(0x01BF_53EB_256D_4000, 946_684_800, 0)]
    #[case(FILETIME_OFFSET, 0, 0)]
    #[case(FILETIME_OFFSET + 1, 0, 100)]
    #[case(FILETIME_OFFSET - 1, -1, 999_999_900)]
    fn filetime_decoding(#[case] filetime: i64, #[case] timestamp: i64, #[case] nsec: u32) {
        assert_eq!(filetime_to_unix(filetime), (timestamp, nsec));
    }

    #[rstest]
    #[case(0)]
    #[case(946_684_800)]
    #[case(-86_400)]
    fn parse_format_round_trip(#[case] timestamp: i64) {
        assert_eq!(parse_time(format_time(timestamp)), timestamp);
    }

    #[test]
    fn timezone_offset_signs_are_inverted() {
        // "GMT+1" must mean one hour east of UTC, so the stored TZ value
        // carries the POSIX sign convention.
        super::set_local_timezone("GMT+1");
        assert_eq!(std::env::var("TZ").as_deref(), Ok("GMT-1"));
        super::set_local_timezone("GMT-8");
        assert_eq!(std::env::var("TZ").as_deref(), Ok("GMT+8"));
    }

    #[test]
    fn file_time_is_applied() {
        let path = std::env::temp_dir().join("innodec-set-file-time-test");
        std::fs::write(&path, b"x").unwrap();

        set_file_time(&path, 946_684_800, 500).unwrap();

        let modified = std::fs::metadata(&path).unwrap().modified().unwrap();
        let expected = UNIX_EPOCH + Duration::new(946_684_800, 500);
        assert!(
            modified
                .duration_since(expected.checked_sub(Duration::from_secs(1)).unwrap())
                .unwrap()
                < Duration::from_secs(2)
        );

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_reports_failure() {
        let path = std::env::temp_dir().join("innodec-no-such-file");
        assert!(set_file_time(&path, 0, 0).is_err());
    }
}
