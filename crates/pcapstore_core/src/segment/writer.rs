//! Segment file writer.

use crate::error::{CoreError, CoreResult};
use crate::packet::Packet;
use pcapstore_codec::{FileHeader, Format, FILE_HEADER_LEN};
use pcapstore_storage::{FileBackend, StorageBackend};
use std::path::{Path, PathBuf};

/// Appends packets to one segment file.
///
/// The writer stamps the file header on creation and then appends each
/// packet's header and payload as one logical unit. It tracks its own
/// packet and byte counters so the store writer can evaluate the rotation
/// policy without touching the file system; rotation itself is the store
/// writer's decision, never this type's.
///
/// Packet appends are not durable until [`SegmentWriter::flush`] returns.
pub struct SegmentWriter {
    backend: Option<Box<dyn StorageBackend>>,
    path: PathBuf,
    file_name: String,
    format: Format,
    sync_on_flush: bool,
    packet_count: u64,
    size: u64,
}

impl SegmentWriter {
    /// Creates a new segment file and writes its header.
    ///
    /// # Errors
    ///
    /// Fails with an `AlreadyExists` I/O error if the path exists, or with
    /// any other file-creation error.
    pub fn create(path: &Path, format: &Format, sync_on_flush: bool) -> CoreResult<Self> {
        let backend = FileBackend::create_new(path)?;
        Self::with_backend(Box::new(backend), path.to_path_buf(), format, sync_on_flush)
    }

    /// Creates a writer over a pre-opened backend. Used by tests to write
    /// segments in memory.
    pub(crate) fn with_backend(
        mut backend: Box<dyn StorageBackend>,
        path: PathBuf,
        format: &Format,
        sync_on_flush: bool,
    ) -> CoreResult<Self> {
        backend.append(&FileHeader::new(format).encode())?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .ok_or_else(|| CoreError::validation(format!("{} has no file name", path.display())))?;

        Ok(Self {
            backend: Some(backend),
            path,
            file_name,
            format: *format,
            sync_on_flush,
            packet_count: 0,
            size: FILE_HEADER_LEN as u64,
        })
    }

    /// Appends one packet, returning the number of bytes written.
    ///
    /// Header and payload are encoded into a single buffer and handed to
    /// the backend as one append, so a packet is never split across two
    /// writes.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an oversized payload (nothing is written),
    /// `InvalidState` after close, or a storage error.
    pub fn append(&mut self, packet: &Packet) -> CoreResult<u64> {
        if packet.payload().len() as u64 > u64::from(self.format.max_packet_size) {
            return Err(CoreError::validation(format!(
                "payload is {} bytes, limit is {}",
                packet.payload().len(),
                self.format.max_packet_size
            )));
        }
        let backend = self.backend_mut()?;

        let header = packet.header()?;
        let mut buf = Vec::with_capacity(packet.total_size() as usize);
        buf.extend_from_slice(&header.encode());
        buf.extend_from_slice(packet.payload());

        backend.append(&buf)?;

        self.packet_count += 1;
        self.size += buf.len() as u64;
        Ok(buf.len() as u64)
    }

    /// Forces written packets to stable storage.
    ///
    /// Cheap and idempotent when nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` after close, or a storage error.
    pub fn flush(&mut self) -> CoreResult<()> {
        let sync = self.sync_on_flush;
        let backend = self.backend_mut()?;
        if sync {
            backend.sync()?;
        } else {
            backend.flush()?;
        }
        Ok(())
    }

    /// Flushes and releases the file handle. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the final flush fails; the handle is
    /// released either way.
    pub fn close(&mut self) -> CoreResult<()> {
        if let Some(mut backend) = self.backend.take() {
            backend.sync()?;
        }
        Ok(())
    }

    /// Whether the writer still holds its file handle.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    /// Packets appended so far.
    #[must_use]
    pub fn packet_count(&self) -> u64 {
        self.packet_count
    }

    /// Current file size in bytes, header included. This is also the
    /// offset the next packet header will be written at.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The segment's file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The segment's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backend_mut(&mut self) -> CoreResult<&mut Box<dyn StorageBackend>> {
        self.backend.as_mut().ok_or_else(|| {
            CoreError::invalid_state(format!("segment {} is closed", self.file_name))
        })
    }
}

impl Drop for SegmentWriter {
    fn drop(&mut self) {
        // Release-on-scope-end: make written packets durable even when the
        // owner unwinds without calling close.
        if let Some(backend) = self.backend.as_mut() {
            let _ = backend.sync();
        }
    }
}

impl std::fmt::Debug for SegmentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentWriter")
            .field("file_name", &self.file_name)
            .field("packet_count", &self.packet_count)
            .field("size", &self.size)
            .field("open", &self.backend.is_some())
            .finish()
    }
}
