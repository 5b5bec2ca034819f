//! Store configuration.

use pcapstore_codec::Format;
use std::time::Duration;

/// Configuration for creating or opening a store.
///
/// Format-level constants (magic numbers, version, packet size limit) ride
/// along in [`Format`], so a format revision is a configuration change
/// rather than a source edit.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Container format constants.
    pub format: Format,

    /// Packets per segment before the writer rotates to a new file.
    pub max_packets_per_segment: u32,

    /// Minimum time between project index samples.
    pub index_interval: Duration,

    /// Whether the reader verifies per-packet checksums.
    pub verify_checksums: bool,

    /// Whether `flush` also syncs file metadata to stable storage.
    pub sync_on_flush: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            format: Format::default(),
            max_packets_per_segment: 500,
            index_interval: Duration::from_secs(1),
            verify_checksums: true,
            sync_on_flush: true,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the format constants.
    #[must_use]
    pub const fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets the rotation threshold in packets per segment.
    #[must_use]
    pub const fn max_packets_per_segment(mut self, count: u32) -> Self {
        self.max_packets_per_segment = count;
        self
    }

    /// Sets the index sampling interval.
    #[must_use]
    pub const fn index_interval(mut self, interval: Duration) -> Self {
        self.index_interval = interval;
        self
    }

    /// Sets whether the reader verifies checksums.
    #[must_use]
    pub const fn verify_checksums(mut self, value: bool) -> Self {
        self.verify_checksums = value;
        self
    }

    /// Sets whether flush also syncs to stable storage.
    #[must_use]
    pub const fn sync_on_flush(mut self, value: bool) -> Self {
        self.sync_on_flush = value;
        self
    }
}
