//! The recording facade.

use crate::config::StoreConfig;
use crate::dir::StoreLayout;
use crate::error::{CoreError, CoreResult};
use crate::index::ProjectIndex;
use crate::packet::Packet;
use crate::segment::{segment_file_name, SegmentWriter};
use crate::types::Timestamp;
use chrono::{DateTime, Utc};
use pcapstore_storage::FileBackend;
use std::path::Path;

/// Appends packets to a store, rotating segment files and sampling the
/// project index as it goes.
///
/// Segments are opened lazily: creating a writer creates the directory
/// layout and the index file, and the first `write_packet` call creates
/// the first segment. Rotation happens after the packet that fills a
/// segment, so every segment except possibly the last holds exactly the
/// configured maximum.
#[derive(Debug)]
pub struct StoreWriter {
    layout: StoreLayout,
    config: StoreConfig,
    index: ProjectIndex,
    segment: Option<SegmentWriter>,
    last_sample_ts: Option<Timestamp>,
    last_segment_stamp: Option<DateTime<Utc>>,
    total_packets: u64,
    total_bytes: u64,
    segments_created: u64,
    closed: bool,
}

impl StoreWriter {
    /// Creates a new store under `base` named `name`.
    ///
    /// This lays out the directory tree and the index file. The first
    /// segment file is not created here; it is opened by the first
    /// [`write_packet`](Self::write_packet), so a store that never
    /// receives a packet holds no empty segment.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an unusable name, or an I/O error if the
    /// directories cannot be created or the index file already exists.
    pub fn create(base: &Path, name: &str, config: StoreConfig) -> CoreResult<Self> {
        let layout = StoreLayout::new(base, name)?;
        layout.create_dirs()?;

        let backend = FileBackend::create_new(&layout.index_path())?;
        let index = ProjectIndex::create(Box::new(backend), &config.format)?;

        tracing::info!(
            store = %layout.index_path().display(),
            "created store"
        );

        Ok(Self {
            layout,
            config,
            index,
            segment: None,
            last_sample_ts: None,
            last_segment_stamp: None,
            total_packets: 0,
            total_bytes: 0,
            segments_created: 0,
            closed: false,
        })
    }

    /// Appends one packet.
    ///
    /// The packet's timestamp drives both index sampling and rotation
    /// bookkeeping. The first packet of a store is always sampled; later
    /// packets are sampled once per elapsed index interval.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the payload exceeds the format's packet
    /// size limit, or a storage error from the segment or index file.
    pub fn write_packet(&mut self, packet: &Packet) -> CoreResult<()> {
        if self.closed {
            return Err(CoreError::invalid_state("writer is closed"));
        }
        if self.segment.is_none() {
            self.open_segment()?;
        }
        let (offset, written, segment_name, segment_full) = {
            let segment = self
                .segment
                .as_mut()
                .ok_or_else(|| CoreError::invalid_state("writer has no open segment"))?;
            let offset = segment.size();
            let written = segment.append(packet)?;
            let full =
                segment.packet_count() >= u64::from(self.config.max_packets_per_segment);
            (offset, written, segment.file_name().to_owned(), full)
        };
        self.total_packets += 1;
        self.total_bytes += written;

        let ts = packet.timestamp();
        if self.sample_due(ts) {
            self.index
                .append_sample(ts, &segment_name, offset, packet.total_size() as u32)?;
            self.last_sample_ts = Some(ts);
        }

        if segment_full {
            self.rotate()?;
        }
        Ok(())
    }

    /// Appends a batch of packets, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Same as [`StoreWriter::write_packet`]. Packets before the failing
    /// one stay written.
    pub fn write_packets(&mut self, packets: &[Packet]) -> CoreResult<()> {
        for packet in packets {
            self.write_packet(packet)?;
        }
        Ok(())
    }

    fn sample_due(&self, ts: Timestamp) -> bool {
        match self.last_sample_ts {
            None => true,
            // duration_since saturates to zero for out-of-order input, so
            // a backward timestamp never produces an index sample.
            Some(last) => ts.duration_since(last) >= self.config.index_interval,
        }
    }

    fn open_segment(&mut self) -> CoreResult<()> {
        // Segment names carry a 100ns-resolution creation stamp. Rotating
        // faster than the clock advances would reuse a name, so the stamp
        // is bumped past the previous one when needed.
        let mut stamp = Utc::now();
        if let Some(last) = self.last_segment_stamp {
            if stamp <= last {
                stamp = last + chrono::Duration::nanoseconds(100);
            }
        }
        let file_name = segment_file_name(stamp);
        let path = self.layout.segment_path(&file_name);
        let segment = SegmentWriter::create(&path, &self.config.format, self.config.sync_on_flush)?;

        tracing::debug!(segment = %path.display(), "opened segment");
        self.last_segment_stamp = Some(stamp);
        self.segment = Some(segment);
        self.segments_created += 1;
        Ok(())
    }

    fn rotate(&mut self) -> CoreResult<()> {
        if let Some(mut segment) = self.segment.take() {
            tracing::debug!(
                segment = segment.file_name(),
                packets = segment.packet_count(),
                "rotating full segment"
            );
            segment.close()?;
        }
        Ok(())
    }

    /// Flushes the open segment and the index to their files.
    ///
    /// # Errors
    ///
    /// Returns a storage error if either flush fails.
    pub fn flush(&mut self) -> CoreResult<()> {
        if let Some(segment) = self.segment.as_mut() {
            segment.flush()?;
        }
        self.index.flush()?;
        Ok(())
    }

    /// Closes the current segment and syncs the index. Idempotent; later
    /// writes fail `InvalidState`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the final sync fails.
    pub fn close(&mut self) -> CoreResult<()> {
        self.closed = true;
        if let Some(mut segment) = self.segment.take() {
            segment.close()?;
        }
        self.index.flush()?;
        Ok(())
    }

    /// Whether [`StoreWriter::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Total packets written through this writer.
    #[must_use]
    pub fn packet_count(&self) -> u64 {
        self.total_packets
    }

    /// Total packet bytes written, headers included. File headers are
    /// not counted.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes
    }

    /// Number of segment files this writer has created.
    #[must_use]
    pub fn segment_count(&self) -> u64 {
        self.segments_created
    }

    /// Number of index samples taken so far.
    #[must_use]
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// File name of the segment currently being written, if one is open.
    #[must_use]
    pub fn current_segment(&self) -> Option<&str> {
        self.segment.as_ref().map(SegmentWriter::file_name)
    }

    /// The store's directory layout.
    #[must_use]
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }
}
