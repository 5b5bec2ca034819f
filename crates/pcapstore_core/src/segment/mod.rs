//! Segment files: naming, appending, sequential decode.
//!
//! A segment is one physical file holding a bounded run of packets behind a
//! single file header. Segments are created by the store writer, filled,
//! rotated away from and never touched again.

mod reader;
mod writer;

pub use reader::SegmentReader;
pub use writer::SegmentWriter;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Prefix of every segment file name.
const SEGMENT_PREFIX: &str = "data_";

/// Extension of every segment file name.
const SEGMENT_SUFFIX: &str = ".pcap";

/// Builds a segment file name from its creation instant.
///
/// The stamp is `yyMMdd_HHmmss_fffffff` where the trailing seven digits are
/// the sub-second fraction in 100 ns ticks.
#[must_use]
pub fn segment_file_name(created: DateTime<Utc>) -> String {
    let ticks = created.timestamp_subsec_nanos() % 1_000_000_000 / 100;
    format!(
        "{SEGMENT_PREFIX}{}_{ticks:07}{SEGMENT_SUFFIX}",
        created.format("%y%m%d_%H%M%S")
    )
}

/// Recovers the creation instant embedded in a segment file name.
///
/// Returns `None` for anything that is not a well-formed segment name; the
/// directory listing uses this both as a filter and as the fallback
/// ordering key.
#[must_use]
pub fn parse_segment_stamp(file_name: &str) -> Option<DateTime<Utc>> {
    let stamp = file_name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_SUFFIX)?;

    // yyMMdd_HHmmss is 13 characters, then "_" and 7 fraction digits.
    if stamp.len() != 21 || stamp.as_bytes()[13] != b'_' {
        return None;
    }
    let (datetime_part, fraction_part) = (&stamp[..13], &stamp[14..]);

    let naive = NaiveDateTime::parse_from_str(datetime_part, "%y%m%d_%H%M%S").ok()?;
    let ticks: u32 = fraction_part.parse().ok()?;
    if ticks >= 10_000_000 {
        return None;
    }

    let base = naive.and_utc();
    Some(base + chrono::Duration::nanoseconds(i64::from(ticks) * 100))
}
