//! Payload checksums.
//!
//! CRC-32 with the IEEE 802.3 reflected polynomial, computed over the packet
//! payload only. The packet header is never covered: it can be re-derived
//! from the payload and the capture timestamp, so corruption there surfaces
//! as a framing error instead.

/// Computes the CRC-32 of a payload.
#[must_use]
pub fn compute(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Verifies a payload against an expected checksum.
#[must_use]
pub fn verify(payload: &[u8], expected: u32) -> bool {
    compute(payload) == expected
}
