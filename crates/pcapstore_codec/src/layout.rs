//! The four fixed binary layouts of the container format.
//!
//! All multi-byte integers are little-endian, matching the byte order the
//! segment magic number is defined in. Encoding is infallible for values
//! that satisfy the documented field invariants; decoding returns a typed
//! error for short buffers and invalid fields, never panics.

use crate::error::{CodecError, CodecResult};
use crate::format::Format;

/// Size of a segment file header in bytes.
pub const FILE_HEADER_LEN: usize = 16;

/// Size of a packet header in bytes.
pub const PACKET_HEADER_LEN: usize = 16;

/// Size of a project index file header in bytes.
pub const INDEX_HEADER_LEN: usize = 16;

/// Size of one project index entry in bytes.
pub const INDEX_ENTRY_LEN: usize = 52;

/// Size of the NUL-padded segment name field inside an index entry.
pub const SEGMENT_NAME_LEN: usize = 32;

fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    u64::from_le_bytes([
        buf[at],
        buf[at + 1],
        buf[at + 2],
        buf[at + 3],
        buf[at + 4],
        buf[at + 5],
        buf[at + 6],
        buf[at + 7],
    ])
}

fn check_len(buf: &[u8], expected: usize) -> CodecResult<()> {
    if buf.len() < expected {
        return Err(CodecError::short_buffer(expected, buf.len()));
    }
    Ok(())
}

/// The 16-byte header at the start of every segment file.
///
/// Layout: magic (4) | major (2) | minor (2) | tz offset (4, informational)
/// | timestamp accuracy (4, reserved).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Magic number as read from or written to disk.
    pub magic: u32,
    /// Major format version.
    pub major: u16,
    /// Minor format version.
    pub minor: u16,
    /// Timezone offset in seconds. Informational only; always 0 on write.
    pub tz_offset: i32,
    /// Timestamp accuracy flag. Reserved; always 0 on write.
    pub ts_accuracy: u32,
}

impl FileHeader {
    /// Creates the header a new segment file is stamped with.
    #[must_use]
    pub fn new(format: &Format) -> Self {
        Self {
            magic: format.magic,
            major: format.major,
            minor: format.minor,
            tz_offset: 0,
            ts_accuracy: 0,
        }
    }

    /// Encodes the header into its fixed 16-byte layout.
    #[must_use]
    pub fn encode(&self) -> [u8; FILE_HEADER_LEN] {
        let mut buf = [0u8; FILE_HEADER_LEN];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..6].copy_from_slice(&self.major.to_le_bytes());
        buf[6..8].copy_from_slice(&self.minor.to_le_bytes());
        buf[8..12].copy_from_slice(&self.tz_offset.to_le_bytes());
        buf[12..16].copy_from_slice(&self.ts_accuracy.to_le_bytes());
        buf
    }

    /// Decodes a header from a byte buffer.
    ///
    /// # Errors
    ///
    /// Returns `ShortBuffer` if fewer than 16 bytes are available. Field
    /// values are not validated here; use [`FileHeader::validate`].
    pub fn decode(buf: &[u8]) -> CodecResult<Self> {
        check_len(buf, FILE_HEADER_LEN)?;
        Ok(Self {
            magic: read_u32(buf, 0),
            major: read_u16(buf, 4),
            minor: read_u16(buf, 6),
            tz_offset: read_u32(buf, 8) as i32,
            ts_accuracy: read_u32(buf, 12),
        })
    }

    /// Checks the header against the expected format constants.
    ///
    /// # Errors
    ///
    /// Returns `BadMagic` or `UnsupportedVersion` on mismatch.
    pub fn validate(&self, format: &Format) -> CodecResult<()> {
        if self.magic != format.magic {
            return Err(CodecError::BadMagic {
                expected: format.magic,
                found: self.magic,
            });
        }
        if (self.major, self.minor) != (format.major, format.minor) {
            return Err(CodecError::UnsupportedVersion {
                major: self.major,
                minor: self.minor,
            });
        }
        Ok(())
    }
}

/// The 16-byte header preceding every packet payload.
///
/// Layout: ts seconds (4) | ts nanoseconds (4) | payload length (4) |
/// CRC-32 of the payload (4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Capture timestamp, UTC epoch seconds.
    pub ts_secs: u32,
    /// Sub-second part of the capture timestamp, 0..=999,999,999.
    pub ts_nanos: u32,
    /// Payload length in bytes.
    pub payload_len: u32,
    /// CRC-32 over the payload only.
    pub checksum: u32,
}

impl PacketHeader {
    /// Encodes the header into its fixed 16-byte layout.
    #[must_use]
    pub fn encode(&self) -> [u8; PACKET_HEADER_LEN] {
        let mut buf = [0u8; PACKET_HEADER_LEN];
        buf[0..4].copy_from_slice(&self.ts_secs.to_le_bytes());
        buf[4..8].copy_from_slice(&self.ts_nanos.to_le_bytes());
        buf[8..12].copy_from_slice(&self.payload_len.to_le_bytes());
        buf[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Decodes a packet header from a byte buffer.
    ///
    /// # Errors
    ///
    /// Returns `ShortBuffer` for fewer than 16 bytes, `NanosOutOfRange` if
    /// the nanosecond field exceeds 999,999,999.
    pub fn decode(buf: &[u8]) -> CodecResult<Self> {
        check_len(buf, PACKET_HEADER_LEN)?;
        let header = Self {
            ts_secs: read_u32(buf, 0),
            ts_nanos: read_u32(buf, 4),
            payload_len: read_u32(buf, 8),
            checksum: read_u32(buf, 12),
        };
        if header.ts_nanos > 999_999_999 {
            return Err(CodecError::NanosOutOfRange {
                nanos: header.ts_nanos,
            });
        }
        Ok(header)
    }

    /// Total on-disk size of the packet this header frames.
    #[must_use]
    pub const fn total_size(&self) -> u64 {
        PACKET_HEADER_LEN as u64 + self.payload_len as u64
    }
}

/// The 16-byte header at the start of a project index file.
///
/// Layout: magic (4) | major (2) | minor (2) | reserved (8). The magic
/// differs from the segment magic so the two file kinds cannot be confused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    /// Magic number as read from or written to disk.
    pub magic: u32,
    /// Major format version.
    pub major: u16,
    /// Minor format version.
    pub minor: u16,
    /// Reserved; always 0 on write.
    pub reserved: u64,
}

impl IndexHeader {
    /// Creates the header a new index file is stamped with.
    #[must_use]
    pub fn new(format: &Format) -> Self {
        Self {
            magic: format.index_magic,
            major: format.major,
            minor: format.minor,
            reserved: 0,
        }
    }

    /// Encodes the header into its fixed 16-byte layout.
    #[must_use]
    pub fn encode(&self) -> [u8; INDEX_HEADER_LEN] {
        let mut buf = [0u8; INDEX_HEADER_LEN];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..6].copy_from_slice(&self.major.to_le_bytes());
        buf[6..8].copy_from_slice(&self.minor.to_le_bytes());
        buf[8..16].copy_from_slice(&self.reserved.to_le_bytes());
        buf
    }

    /// Decodes an index header from a byte buffer.
    ///
    /// # Errors
    ///
    /// Returns `ShortBuffer` if fewer than 16 bytes are available.
    pub fn decode(buf: &[u8]) -> CodecResult<Self> {
        check_len(buf, INDEX_HEADER_LEN)?;
        Ok(Self {
            magic: read_u32(buf, 0),
            major: read_u16(buf, 4),
            minor: read_u16(buf, 6),
            reserved: read_u64(buf, 8),
        })
    }

    /// Checks the header against the expected format constants.
    ///
    /// # Errors
    ///
    /// Returns `BadMagic` or `UnsupportedVersion` on mismatch.
    pub fn validate(&self, format: &Format) -> CodecResult<()> {
        if self.magic != format.index_magic {
            return Err(CodecError::BadMagic {
                expected: format.index_magic,
                found: self.magic,
            });
        }
        if (self.major, self.minor) != (format.major, format.minor) {
            return Err(CodecError::UnsupportedVersion {
                major: self.major,
                minor: self.minor,
            });
        }
        Ok(())
    }
}

/// One sampled entry of the project index, fixed 52 bytes.
///
/// Layout: ts seconds (4) | ts nanoseconds (4) | packet byte offset within
/// the segment (8) | packet total size (4) | segment file name (32,
/// NUL-padded UTF-8, relative to the store's segment directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Sampled timestamp, UTC epoch seconds.
    pub ts_secs: u32,
    /// Sub-second part of the sampled timestamp.
    pub ts_nanos: u32,
    /// Byte offset of the packet header inside the segment file.
    pub offset: u64,
    /// Total on-disk size of the sampled packet (header + payload).
    pub packet_size: u32,
    /// File name of the segment the sample points into.
    pub segment_name: String,
}

impl IndexEntry {
    /// Encodes the entry into its fixed 52-byte layout.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSegmentName` if the name exceeds 32 bytes or
    /// contains a NUL byte.
    pub fn encode(&self) -> CodecResult<[u8; INDEX_ENTRY_LEN]> {
        let name = self.segment_name.as_bytes();
        if name.len() > SEGMENT_NAME_LEN {
            return Err(CodecError::invalid_segment_name(format!(
                "name is {} bytes, limit is {SEGMENT_NAME_LEN}",
                name.len()
            )));
        }
        if name.contains(&0) {
            return Err(CodecError::invalid_segment_name("name contains NUL"));
        }

        let mut buf = [0u8; INDEX_ENTRY_LEN];
        buf[0..4].copy_from_slice(&self.ts_secs.to_le_bytes());
        buf[4..8].copy_from_slice(&self.ts_nanos.to_le_bytes());
        buf[8..16].copy_from_slice(&self.offset.to_le_bytes());
        buf[16..20].copy_from_slice(&self.packet_size.to_le_bytes());
        buf[20..20 + name.len()].copy_from_slice(name);
        Ok(buf)
    }

    /// Decodes an entry from a byte buffer.
    ///
    /// # Errors
    ///
    /// Returns `ShortBuffer` for fewer than 52 bytes, `NanosOutOfRange` for
    /// a bad nanosecond field, `InvalidSegmentName` if the name field is
    /// not NUL-padded UTF-8.
    pub fn decode(buf: &[u8]) -> CodecResult<Self> {
        check_len(buf, INDEX_ENTRY_LEN)?;

        let ts_nanos = read_u32(buf, 4);
        if ts_nanos > 999_999_999 {
            return Err(CodecError::NanosOutOfRange { nanos: ts_nanos });
        }

        let name_field = &buf[20..20 + SEGMENT_NAME_LEN];
        let name_len = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SEGMENT_NAME_LEN);
        if name_field[name_len..].iter().any(|&b| b != 0) {
            return Err(CodecError::invalid_segment_name(
                "bytes after NUL terminator",
            ));
        }
        let segment_name = std::str::from_utf8(&name_field[..name_len])
            .map_err(|_| CodecError::invalid_segment_name("not valid UTF-8"))?
            .to_owned();

        Ok(Self {
            ts_secs: read_u32(buf, 0),
            ts_nanos,
            offset: read_u64(buf, 8),
            packet_size: read_u32(buf, 16),
            segment_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn file_header_roundtrip() {
        let header = FileHeader::new(&Format::default());
        let decoded = FileHeader::decode(&header.encode()).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn file_header_byte_layout() {
        let bytes = FileHeader::new(&Format::default()).encode();
        // Magic 0xD4C3B2A1 little-endian, then version 2.4.
        assert_eq!(&bytes[0..4], &[0xA1, 0xB2, 0xC3, 0xD4]);
        assert_eq!(&bytes[4..8], &[0x02, 0x00, 0x04, 0x00]);
        assert_eq!(&bytes[8..16], &[0u8; 8]);
    }

    #[test]
    fn file_header_short_buffer() {
        let result = FileHeader::decode(&[0u8; 15]);
        assert!(matches!(result, Err(CodecError::ShortBuffer { .. })));
    }

    #[test]
    fn file_header_validate_rejects_wrong_magic() {
        let format = Format::default();
        let mut header = FileHeader::new(&format);
        header.magic = 0xA1B2_C3D4;
        assert!(matches!(
            header.validate(&format),
            Err(CodecError::BadMagic { .. })
        ));
    }

    #[test]
    fn file_header_validate_rejects_wrong_version() {
        let format = Format::default();
        let mut header = FileHeader::new(&format);
        header.minor = 99;
        assert!(matches!(
            header.validate(&format),
            Err(CodecError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn packet_header_roundtrip() {
        let header = PacketHeader {
            ts_secs: 1_700_000_000,
            ts_nanos: 999_999_999,
            payload_len: 4096,
            checksum: 0xDEAD_BEEF,
        };
        let decoded = PacketHeader::decode(&header.encode()).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn packet_header_rejects_bad_nanos() {
        let header = PacketHeader {
            ts_secs: 0,
            ts_nanos: 1_000_000_000,
            payload_len: 0,
            checksum: 0,
        };
        let result = PacketHeader::decode(&header.encode());
        assert!(matches!(result, Err(CodecError::NanosOutOfRange { .. })));
    }

    #[test]
    fn packet_header_total_size() {
        let header = PacketHeader {
            ts_secs: 0,
            ts_nanos: 0,
            payload_len: 100,
            checksum: 0,
        };
        assert_eq!(header.total_size(), 116);
    }

    #[test]
    fn index_header_roundtrip_and_validate() {
        let format = Format::default();
        let header = IndexHeader::new(&format);
        let decoded = IndexHeader::decode(&header.encode()).unwrap();
        assert_eq!(header, decoded);
        decoded.validate(&format).unwrap();
    }

    #[test]
    fn index_header_magic_differs_from_segment_magic() {
        let format = Format::default();
        assert_ne!(format.magic, format.index_magic);
        // A segment header must not validate as an index header.
        let segment_bytes = FileHeader::new(&format).encode();
        let as_index = IndexHeader::decode(&segment_bytes).unwrap();
        assert!(matches!(
            as_index.validate(&format),
            Err(CodecError::BadMagic { .. })
        ));
    }

    #[test]
    fn index_entry_roundtrip() {
        let entry = IndexEntry {
            ts_secs: 1_700_000_123,
            ts_nanos: 456_789,
            offset: 16 + 3 * 1040,
            packet_size: 1040,
            segment_name: "data_240115_093001_0000000.pcap".to_owned(),
        };
        let decoded = IndexEntry::decode(&entry.encode().unwrap()).unwrap();
        assert_eq!(entry, decoded);
    }

    #[test]
    fn index_entry_rejects_long_name() {
        let entry = IndexEntry {
            ts_secs: 0,
            ts_nanos: 0,
            offset: 0,
            packet_size: 0,
            segment_name: "x".repeat(SEGMENT_NAME_LEN + 1),
        };
        assert!(matches!(
            entry.encode(),
            Err(CodecError::InvalidSegmentName { .. })
        ));
    }

    #[test]
    fn index_entry_rejects_garbage_after_nul() {
        let entry = IndexEntry {
            ts_secs: 1,
            ts_nanos: 2,
            offset: 3,
            packet_size: 4,
            segment_name: "short.pcap".to_owned(),
        };
        let mut bytes = entry.encode().unwrap();
        bytes[INDEX_ENTRY_LEN - 1] = b'!';
        assert!(matches!(
            IndexEntry::decode(&bytes),
            Err(CodecError::InvalidSegmentName { .. })
        ));
    }

    proptest! {
        #[test]
        fn packet_header_roundtrip_prop(
            ts_secs in any::<u32>(),
            ts_nanos in 0u32..=999_999_999,
            payload_len in any::<u32>(),
            checksum in any::<u32>(),
        ) {
            let header = PacketHeader { ts_secs, ts_nanos, payload_len, checksum };
            prop_assert_eq!(PacketHeader::decode(&header.encode()).unwrap(), header);
        }

        #[test]
        fn index_entry_roundtrip_prop(
            ts_secs in any::<u32>(),
            ts_nanos in 0u32..=999_999_999,
            offset in any::<u64>(),
            packet_size in any::<u32>(),
            segment_name in "[a-z0-9_.]{0,32}",
        ) {
            let entry = IndexEntry { ts_secs, ts_nanos, offset, packet_size, segment_name };
            let decoded = IndexEntry::decode(&entry.encode().unwrap()).unwrap();
            prop_assert_eq!(decoded, entry);
        }

        #[test]
        fn file_header_roundtrip_prop(
            magic in any::<u32>(),
            major in any::<u16>(),
            minor in any::<u16>(),
            tz_offset in any::<i32>(),
            ts_accuracy in any::<u32>(),
        ) {
            let header = FileHeader { magic, major, minor, tz_offset, ts_accuracy };
            prop_assert_eq!(FileHeader::decode(&header.encode()).unwrap(), header);
        }
    }
}
