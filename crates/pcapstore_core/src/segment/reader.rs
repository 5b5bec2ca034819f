//! Segment file reader.

use crate::error::{CoreError, CoreResult};
use crate::packet::{Packet, ReadPacket};
use pcapstore_codec::{checksum, FileHeader, Format, PacketHeader, FILE_HEADER_LEN, PACKET_HEADER_LEN};
use pcapstore_storage::{FileBackend, StorageBackend};
use std::path::{Path, PathBuf};

/// Sequentially decodes one segment file.
///
/// The file header is validated on open; packets are then decoded pair by
/// pair at the read cursor. A clean end of file yields `None`, while a file
/// that ends mid-packet yields [`CoreError::Truncated`] carrying the offset
/// of the torn packet, so a partially-written tail is reported rather than
/// silently dropped.
pub struct SegmentReader {
    backend: Box<dyn StorageBackend>,
    path: PathBuf,
    format: Format,
    total_size: u64,
    offset: u64,
    packets_read: u64,
}

impl SegmentReader {
    /// Opens a segment file and validates its header.
    ///
    /// # Errors
    ///
    /// Returns `Format` (with the path) on magic or version mismatch, or an
    /// I/O error if the file cannot be read.
    pub fn open(path: &Path, format: &Format) -> CoreResult<Self> {
        let backend = FileBackend::open_existing(path)?;
        Self::with_backend(Box::new(backend), path.to_path_buf(), format)
    }

    /// Opens a reader over a pre-opened backend. Used by tests to decode
    /// in-memory segments.
    pub(crate) fn with_backend(
        backend: Box<dyn StorageBackend>,
        path: PathBuf,
        format: &Format,
    ) -> CoreResult<Self> {
        let total_size = backend.size()?;
        if total_size < FILE_HEADER_LEN as u64 {
            return Err(CoreError::format(
                &path,
                format!("file is {total_size} bytes, smaller than the file header"),
            ));
        }

        let header_bytes = backend.read_at(0, FILE_HEADER_LEN)?;
        let header = FileHeader::decode(&header_bytes)?;
        header
            .validate(format)
            .map_err(|e| CoreError::format(&path, e.to_string()))?;

        Ok(Self {
            backend,
            path,
            format: *format,
            total_size,
            offset: FILE_HEADER_LEN as u64,
            packets_read: 0,
        })
    }

    /// Decodes the packet at the current cursor.
    ///
    /// Returns `Ok(None)` at the logical end of the file. When `verify` is
    /// set, the payload checksum is recomputed and a mismatch is reported
    /// through [`ReadPacket::checksum_ok`] with the stream left intact.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` when the file ends inside a header or payload,
    /// `Format` when a header is undecodable or declares a payload above
    /// the format's limit, or a storage error.
    pub fn next_packet(&mut self, verify: bool) -> CoreResult<Option<ReadPacket>> {
        if self.offset >= self.total_size {
            return Ok(None);
        }
        let start = self.offset;

        if self.total_size - start < PACKET_HEADER_LEN as u64 {
            return Err(CoreError::truncated(&self.path, start));
        }
        let header_bytes = self.backend.read_at(start, PACKET_HEADER_LEN)?;
        let header = PacketHeader::decode(&header_bytes)
            .map_err(|e| CoreError::format(&self.path, format!("packet at offset {start}: {e}")))?;

        if header.payload_len > self.format.max_packet_size {
            return Err(CoreError::format(
                &self.path,
                format!(
                    "packet at offset {start} declares {} payload bytes, limit is {}",
                    header.payload_len, self.format.max_packet_size
                ),
            ));
        }
        if start + header.total_size() > self.total_size {
            return Err(CoreError::truncated(&self.path, start));
        }

        let payload = self
            .backend
            .read_at(start + PACKET_HEADER_LEN as u64, header.payload_len as usize)?;
        let checksum_ok = !verify || checksum::verify(&payload, header.checksum);
        let packet = Packet::from_wire(&header, payload);

        self.offset = start + header.total_size();
        self.packets_read += 1;

        Ok(Some(ReadPacket {
            packet,
            offset: start,
            checksum_ok,
        }))
    }

    /// Repositions the cursor to an absolute byte offset.
    ///
    /// The offset must be the start of a packet header; only offsets
    /// produced by the project index satisfy this. An offset on any other
    /// byte makes subsequent decodes meaningless.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the offset lies inside the file header or
    /// beyond the end of the file.
    pub fn seek_to_offset(&mut self, offset: u64) -> CoreResult<()> {
        if offset < FILE_HEADER_LEN as u64 || offset > self.total_size {
            return Err(CoreError::validation(format!(
                "offset {offset} is outside the packet region of {}",
                self.path.display()
            )));
        }
        self.offset = offset;
        Ok(())
    }

    /// Whole packets decoded so far.
    #[must_use]
    pub fn packets_read(&self) -> u64 {
        self.packets_read
    }

    /// The segment's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The segment's size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.total_size
    }
}

impl std::fmt::Debug for SegmentReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentReader")
            .field("path", &self.path)
            .field("offset", &self.offset)
            .field("total_size", &self.total_size)
            .field("packets_read", &self.packets_read)
            .finish()
    }
}
