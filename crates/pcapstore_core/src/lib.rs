//! Segmented packet record and replay store.
//!
//! A store is a directory of fixed-format segment files plus a sparse
//! time index over them. [`StoreWriter`] appends timestamped packets,
//! rotating to a new segment file after a configured packet count and
//! sampling the index once per elapsed interval. [`StoreReader`] replays
//! the packets in order and seeks by time or ordinal, using the index to
//! bound each seek's forward scan.
//!
//! The on-disk layout for a store named `capture` under `base/`:
//!
//! ```text
//! base/capture.pcap          project index
//! base/capture/data_*.pcap   segment files, named by creation stamp
//! ```
//!
//! ```no_run
//! use pcapstore_core::{Packet, StoreConfig, StoreReader, StoreWriter, Timestamp};
//! use std::path::Path;
//!
//! # fn main() -> pcapstore_core::CoreResult<()> {
//! let config = StoreConfig::default();
//! let mut writer = StoreWriter::create(Path::new("/tmp/stores"), "capture", config.clone())?;
//! writer.write_packet(&Packet::new(Timestamp::now(), vec![0xAB; 64]))?;
//! writer.close()?;
//!
//! let mut reader = StoreReader::open(Path::new("/tmp/stores"), "capture", config)?;
//! while let Some(read) = reader.next_packet()? {
//!     println!("{} {} bytes", read.packet.timestamp(), read.packet.payload().len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! With the `tokio` feature the [`nonblocking`] module wraps both facades
//! for use from async code.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dir;
pub mod error;
pub mod index;
#[cfg(feature = "tokio")]
pub mod nonblocking;
pub mod packet;
pub mod segment;
pub mod store;
pub mod types;

pub use config::StoreConfig;
pub use dir::StoreLayout;
pub use error::{CoreError, CoreResult};
pub use index::ProjectIndex;
pub use packet::{Packet, ReadPacket};
pub use segment::{SegmentReader, SegmentWriter};
pub use store::{StoreReader, StoreWriter};
pub use types::{PacketLocation, Timestamp};

#[cfg(feature = "tokio")]
pub use nonblocking::{AsyncStoreReader, AsyncStoreWriter};

pub use pcapstore_codec::Format;
