//! Core type definitions for pcapstore.

use chrono::{DateTime, Timelike, Utc};
use std::fmt;
use std::ops::Add;
use std::time::Duration;

/// A UTC capture instant with nanosecond resolution.
///
/// Stored exactly as the packet header encodes it: epoch seconds plus a
/// sub-second nanosecond part below one billion. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    secs: u32,
    nanos: u32,
}

impl Timestamp {
    /// Creates a timestamp, carrying surplus nanoseconds into seconds.
    #[must_use]
    pub const fn new(secs: u32, nanos: u32) -> Self {
        Self {
            secs: secs.saturating_add(nanos / 1_000_000_000),
            nanos: nanos % 1_000_000_000,
        }
    }

    /// The current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Converts a chrono instant, clamping to the representable epoch range.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let secs = dt.timestamp().clamp(0, i64::from(u32::MAX)) as u32;
        // subsec_nanos can reach 1_999_999_999 during a leap second.
        Self::new(secs, dt.nanosecond() % 1_000_000_000)
    }

    /// Epoch seconds.
    #[must_use]
    pub const fn secs(self) -> u32 {
        self.secs
    }

    /// Sub-second nanoseconds, always below one billion.
    #[must_use]
    pub const fn nanos(self) -> u32 {
        self.nanos
    }

    /// The instant as nanoseconds since the epoch.
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.secs as u64 * 1_000_000_000 + self.nanos as u64
    }

    /// Time elapsed since `earlier`, saturating to zero when `earlier`
    /// is in the future.
    #[must_use]
    pub fn duration_since(self, earlier: Self) -> Duration {
        Duration::from_nanos(self.as_nanos().saturating_sub(earlier.as_nanos()))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        let total = self.as_nanos().saturating_add(rhs.as_nanos() as u64);
        Self::new((total / 1_000_000_000) as u32, (total % 1_000_000_000) as u32)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}

/// Resolved location of a packet within a store.
///
/// Produced by the project index; the offset is only meaningful inside
/// the named segment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketLocation {
    /// Segment file name within the store's segment directory.
    pub segment_name: String,
    /// Byte offset of the packet header within that segment.
    pub offset: u64,
}
