//! The in-memory packet unit.

use crate::error::{CoreError, CoreResult};
use crate::types::Timestamp;
use pcapstore_codec::{checksum, PacketHeader, PACKET_HEADER_LEN};

/// One timestamped binary packet.
///
/// Immutable once constructed. On the write path the checksum is computed
/// from the payload at construction; on the read path it is carried from
/// the decoded header so callers can compare it against a recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    timestamp: Timestamp,
    payload: Vec<u8>,
    checksum: u32,
}

impl Packet {
    /// Creates a packet from a capture instant and payload, computing the
    /// payload checksum.
    #[must_use]
    pub fn new(timestamp: Timestamp, payload: Vec<u8>) -> Self {
        let checksum = checksum::compute(&payload);
        Self {
            timestamp,
            payload,
            checksum,
        }
    }

    /// Reconstructs a packet from a decoded header and its payload bytes.
    ///
    /// The header's checksum is carried as-is; use [`Packet::verify`] to
    /// compare it against the payload.
    #[must_use]
    pub fn from_wire(header: &PacketHeader, payload: Vec<u8>) -> Self {
        Self {
            timestamp: Timestamp::new(header.ts_secs, header.ts_nanos),
            payload,
            checksum: header.checksum,
        }
    }

    /// The capture timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// The payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The payload checksum this packet carries.
    #[must_use]
    pub const fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Recomputes the payload checksum and compares it to the carried one.
    #[must_use]
    pub fn verify(&self) -> bool {
        checksum::verify(&self.payload, self.checksum)
    }

    /// Total on-disk size: header plus payload.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        PACKET_HEADER_LEN as u64 + self.payload.len() as u64
    }

    /// The wire header for this packet.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the payload length does not fit the wire
    /// format's 32-bit length field. The write path rejects such payloads
    /// against the configured maximum before reaching this point.
    pub fn header(&self) -> CoreResult<PacketHeader> {
        let payload_len = u32::try_from(self.payload.len()).map_err(|_| {
            CoreError::validation(format!(
                "payload of {} bytes exceeds the 32-bit length field",
                self.payload.len()
            ))
        })?;
        Ok(PacketHeader {
            ts_secs: self.timestamp.secs(),
            ts_nanos: self.timestamp.nanos(),
            payload_len,
            checksum: self.checksum,
        })
    }

    /// Consumes the packet, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// A packet as read back from a segment, with its read-side record.
///
/// Carries the byte offset of the packet header within its segment and the
/// result of the opt-in checksum verification. A failed verification tags
/// the packet instead of aborting the stream, so the caller decides whether
/// to skip, log or halt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPacket {
    /// The decoded packet.
    pub packet: Packet,
    /// Byte offset of the packet header within its segment file.
    pub offset: u64,
    /// False when verification was requested and the payload checksum did
    /// not match the header. True when verification was skipped or passed.
    pub checksum_ok: bool,
}

impl ReadPacket {
    /// Converts a failed verification into an error, for callers that
    /// treat payload corruption as fatal rather than advisory.
    ///
    /// # Errors
    ///
    /// Returns `ChecksumMismatch` when [`ReadPacket::checksum_ok`] is
    /// false.
    pub fn ensure_verified(&self) -> CoreResult<()> {
        if self.checksum_ok {
            return Ok(());
        }
        Err(CoreError::ChecksumMismatch {
            expected: self.packet.checksum(),
            actual: checksum::compute(self.packet.payload()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_computes_checksum() {
        let packet = Packet::new(Timestamp::new(100, 0), b"payload".to_vec());
        assert_eq!(packet.checksum(), pcapstore_codec::checksum::compute(b"payload"));
        assert!(packet.verify());
    }

    #[test]
    fn empty_payload_is_valid() {
        let packet = Packet::new(Timestamp::new(0, 0), Vec::new());
        assert!(packet.verify());
        assert_eq!(packet.total_size(), PACKET_HEADER_LEN as u64);
    }

    #[test]
    fn header_roundtrips_through_wire() {
        let packet = Packet::new(Timestamp::new(1_700_000_000, 42), vec![1, 2, 3]);
        let header = packet.header().unwrap();
        assert_eq!(header.payload_len, 3);
        let rebuilt = Packet::from_wire(&header, packet.payload().to_vec());
        assert_eq!(rebuilt, packet);
    }

    #[test]
    fn from_wire_carries_header_checksum() {
        let mut header = Packet::new(Timestamp::new(1, 0), vec![9, 9]).header().unwrap();
        header.checksum ^= 0xFFFF_FFFF;
        let packet = Packet::from_wire(&header, vec![9, 9]);
        assert!(!packet.verify());
    }

    #[test]
    fn ensure_verified_reports_both_checksums() {
        let packet = Packet::new(Timestamp::new(1, 0), vec![7; 8]);
        let good = ReadPacket {
            packet: packet.clone(),
            offset: 16,
            checksum_ok: true,
        };
        assert!(good.ensure_verified().is_ok());

        let bad = ReadPacket {
            packet,
            offset: 16,
            checksum_ok: false,
        };
        assert!(matches!(
            bad.ensure_verified(),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn total_size_includes_header() {
        let packet = Packet::new(Timestamp::new(0, 0), vec![0; 100]);
        assert_eq!(packet.total_size(), 116);
    }
}
