//! Format constants as an injected configuration value.

/// The constants that define one revision of the container format.
///
/// Writers and readers receive a `Format` at construction; evolving the
/// format (new magic, new version) is a constructor argument rather than a
/// source edit. [`Format::default`] is the current on-disk revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    /// Magic number identifying a segment file.
    pub magic: u32,
    /// Magic number identifying a project index file.
    pub index_magic: u32,
    /// Major format version.
    pub major: u16,
    /// Minor format version.
    pub minor: u16,
    /// Maximum size of a single packet payload in bytes.
    pub max_packet_size: u32,
}

impl Default for Format {
    fn default() -> Self {
        Self {
            magic: 0xD4C3_B2A1,
            // b"PIDX" read as a little-endian u32.
            index_magic: 0x5844_4950,
            major: 2,
            minor: 4,
            max_packet_size: 30 * 1024 * 1024,
        }
    }
}

impl Format {
    /// Creates the current format revision.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum packet payload size.
    #[must_use]
    pub const fn max_packet_size(mut self, size: u32) -> Self {
        self.max_packet_size = size;
        self
    }

    /// Sets the format version.
    #[must_use]
    pub const fn version(mut self, major: u16, minor: u16) -> Self {
        self.major = major;
        self.minor = minor;
        self
    }
}
