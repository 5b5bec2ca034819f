//! # pcapstore Codec
//!
//! Byte-exact encode/decode for the pcapstore container format.
//!
//! The format extends classic PCAP with a per-packet checksum and a sparse
//! project index. Four fixed layouts exist, all little-endian:
//!
//! - [`FileHeader`] (16 bytes) - one per segment file
//! - [`PacketHeader`] (16 bytes) - precedes every packet payload
//! - [`IndexHeader`] (16 bytes) - one per project index file
//! - [`IndexEntry`] (52 bytes) - one per time sample in the project index
//!
//! Codecs are pure: no I/O, no state, and `decode(encode(x)) == x` for every
//! valid `x`. Expected magic numbers, version and size limits live in a
//! single [`Format`] value that callers inject at construction instead of
//! scattering constants.
//!
//! ## Example
//!
//! ```
//! use pcapstore_codec::{FileHeader, Format};
//!
//! let format = Format::default();
//! let header = FileHeader::new(&format);
//! let bytes = header.encode();
//! let decoded = FileHeader::decode(&bytes).unwrap();
//! assert_eq!(header, decoded);
//! decoded.validate(&format).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod checksum;
mod error;
mod format;
mod layout;

pub use error::{CodecError, CodecResult};
pub use format::Format;
pub use layout::{
    FileHeader, IndexEntry, IndexHeader, PacketHeader, FILE_HEADER_LEN, INDEX_ENTRY_LEN,
    INDEX_HEADER_LEN, PACKET_HEADER_LEN, SEGMENT_NAME_LEN,
};
