//! The replay facade.

use crate::config::StoreConfig;
use crate::dir::StoreLayout;
use crate::error::{CoreError, CoreResult};
use crate::index::ProjectIndex;
use crate::packet::ReadPacket;
use crate::segment::SegmentReader;
use crate::types::Timestamp;
use pcapstore_storage::FileBackend;
use std::path::{Path, PathBuf};

/// Replays a store's packets in segment order.
///
/// The segment directory listing is authoritative: every readable segment
/// is replayed even when the project index never sampled it. The index is
/// a seek accelerator only, and a missing or corrupt index degrades seeks
/// to a linear scan without affecting sequential reads.
///
/// Unreadable segments (bad header, wrong magic) are skipped with a
/// warning and recorded in [`StoreReader::skipped_segments`]. A truncated
/// packet ends the stream: the error is returned once and later calls
/// report end of stream.
pub struct StoreReader {
    layout: StoreLayout,
    config: StoreConfig,
    segments: Vec<PathBuf>,
    index: Option<ProjectIndex>,
    current: Option<SegmentReader>,
    next_segment: usize,
    pending: Option<ReadPacket>,
    finished: bool,
    skipped: Vec<PathBuf>,
    packets_returned: u64,
}

enum SeekPlan {
    /// Target predates the first packet.
    Predates,
    /// Start at this (segment position, byte offset) and scan forward.
    Anchor(usize, u64),
    /// Scan from the start of the stream.
    Scan,
}

impl StoreReader {
    /// Opens the store under `base` named `name`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an unusable name, or an I/O error if the
    /// segment directory cannot be listed. A bad index file is not an
    /// error here.
    pub fn open(base: &Path, name: &str, config: StoreConfig) -> CoreResult<Self> {
        Self::with_layout(StoreLayout::new(base, name)?, config)
    }

    /// Opens the store whose index file or segment directory is at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`StoreReader::open`], plus `Validation` if the path has no
    /// usable stem.
    pub fn open_path(path: &Path, config: StoreConfig) -> CoreResult<Self> {
        Self::with_layout(StoreLayout::from_path(path)?, config)
    }

    fn with_layout(layout: StoreLayout, config: StoreConfig) -> CoreResult<Self> {
        let segments = layout.list_segments()?;
        let index_path = layout.index_path();
        let index = match FileBackend::open_existing(&index_path)
            .map_err(CoreError::from)
            .and_then(|b| ProjectIndex::load(Box::new(b), &config.format, &index_path))
        {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::warn!(
                    index = %index_path.display(),
                    error = %e,
                    "index unusable, seeks fall back to linear scan"
                );
                None
            }
        };

        Ok(Self {
            layout,
            config,
            segments,
            index,
            current: None,
            next_segment: 0,
            pending: None,
            finished: false,
            skipped: Vec::new(),
            packets_returned: 0,
        })
    }

    /// Returns the next packet, or `None` at end of stream.
    ///
    /// A packet whose stored checksum does not match its payload is still
    /// returned, with [`ReadPacket::checksum_ok`] cleared, when checksum
    /// verification is enabled.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` exactly once when a segment ends mid-packet;
    /// the stream is finished afterwards.
    pub fn next_packet(&mut self) -> CoreResult<Option<ReadPacket>> {
        if let Some(packet) = self.pending.take() {
            self.packets_returned += 1;
            return Ok(Some(packet));
        }
        if self.finished {
            return Ok(None);
        }

        loop {
            if self.current.is_none() && !self.advance_segment() {
                self.finished = true;
                return Ok(None);
            }
            let reader = match self.current.as_mut() {
                Some(reader) => reader,
                None => continue,
            };

            match reader.next_packet(self.config.verify_checksums) {
                Ok(Some(packet)) => {
                    self.packets_returned += 1;
                    return Ok(Some(packet));
                }
                Ok(None) => {
                    self.current = None;
                }
                Err(e @ CoreError::Truncated { .. }) => {
                    self.finished = true;
                    self.current = None;
                    return Err(e);
                }
                Err(CoreError::Format { path, message }) => {
                    tracing::warn!(
                        segment = %path.display(),
                        %message,
                        "skipping unreadable segment data"
                    );
                    self.mark_skipped(path);
                    self.current = None;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Returns up to `n` packets, fewer only at end of stream.
    ///
    /// # Errors
    ///
    /// Same as [`StoreReader::next_packet`]; packets read before the
    /// failure are dropped.
    pub fn read_many(&mut self, n: usize) -> CoreResult<Vec<ReadPacket>> {
        let mut packets = Vec::with_capacity(n.min(1024));
        while packets.len() < n {
            match self.next_packet()? {
                Some(packet) => packets.push(packet),
                None => break,
            }
        }
        Ok(packets)
    }

    /// Opens the next listed segment, skipping any whose header is
    /// unreadable. Returns false when the list is exhausted.
    fn advance_segment(&mut self) -> bool {
        while self.next_segment < self.segments.len() {
            let path = self.segments[self.next_segment].clone();
            self.next_segment += 1;
            match SegmentReader::open(&path, &self.config.format) {
                Ok(reader) => {
                    self.current = Some(reader);
                    return true;
                }
                Err(e) => {
                    tracing::warn!(
                        segment = %path.display(),
                        error = %e,
                        "skipping unreadable segment"
                    );
                    self.mark_skipped(path);
                }
            }
        }
        false
    }

    fn mark_skipped(&mut self, path: PathBuf) {
        if !self.skipped.contains(&path) {
            self.skipped.push(path);
        }
    }

    /// Rewinds to the start of the stream.
    ///
    /// Skipped-segment records are cleared; they are re-recorded as the
    /// stream is read again.
    pub fn reset(&mut self) {
        self.current = None;
        self.next_segment = 0;
        self.pending = None;
        self.finished = false;
        self.skipped.clear();
        self.packets_returned = 0;
    }

    /// Positions the stream at the first packet whose timestamp is at or
    /// after `ts`.
    ///
    /// Returns `false`, leaving the stream at the start, when `ts`
    /// predates the whole store. Returns `true` when the target lies past
    /// the last packet; the stream is then at end of stream.
    ///
    /// Uses the project index when one loaded, scanning forward from the
    /// floor sample; otherwise scans from the start.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` if the scan runs into a torn packet, or a
    /// storage error.
    pub fn seek_to_time(&mut self, ts: Timestamp) -> CoreResult<bool> {
        self.reset();

        let anchored = match self.seek_plan(ts) {
            SeekPlan::Predates => return Ok(false),
            SeekPlan::Anchor(pos, offset) => self.anchor_at(pos, offset),
            SeekPlan::Scan => false,
        };
        self.scan_forward_to(ts, anchored)
    }

    fn seek_plan(&self, ts: Timestamp) -> SeekPlan {
        let Some(index) = &self.index else {
            return SeekPlan::Scan;
        };
        match index.locate(ts) {
            // The first packet is always sampled, so a target below the
            // first sample predates the whole store.
            None if !index.is_empty() => SeekPlan::Predates,
            None => SeekPlan::Scan,
            Some(location) => {
                let pos = self.segments.iter().position(|p| {
                    p.file_name().and_then(|n| n.to_str()) == Some(location.segment_name.as_str())
                });
                match pos {
                    Some(pos) => SeekPlan::Anchor(pos, location.offset),
                    // The directory no longer holds the named segment;
                    // the listing wins.
                    None => SeekPlan::Scan,
                }
            }
        }
    }

    /// Positions the cursor at `offset` inside segment `pos`. A stale
    /// anchor (segment unreadable, offset past its end) degrades to a
    /// scan from the start.
    fn anchor_at(&mut self, pos: usize, offset: u64) -> bool {
        let path = self.segments[pos].clone();
        let opened = SegmentReader::open(&path, &self.config.format).and_then(|mut reader| {
            reader.seek_to_offset(offset)?;
            Ok(reader)
        });
        match opened {
            Ok(reader) => {
                self.next_segment = pos + 1;
                self.current = Some(reader);
                true
            }
            Err(e) => {
                tracing::warn!(
                    segment = %path.display(),
                    error = %e,
                    "stale index anchor, falling back to linear scan"
                );
                self.current = None;
                self.next_segment = 0;
                false
            }
        }
    }

    fn scan_forward_to(&mut self, ts: Timestamp, anchored: bool) -> CoreResult<bool> {
        let mut seen_any = false;
        loop {
            match self.next_packet()? {
                Some(packet) => {
                    if packet.packet.timestamp() >= ts {
                        // Without an anchor, a first packet strictly past
                        // the target means the target predates the store.
                        if !anchored && !seen_any && packet.packet.timestamp() > ts {
                            self.reset();
                            return Ok(false);
                        }
                        self.pending = Some(packet);
                        self.packets_returned -= 1;
                        return Ok(true);
                    }
                    seen_any = true;
                }
                // Target past the last packet: the stream stays at end of
                // stream and the seek still counts as positioned.
                None => return Ok(anchored || seen_any),
            }
        }
    }

    /// Positions the stream so the next packet returned is packet `n`
    /// (zero-based, in stream order).
    ///
    /// Returns `false` when the store holds `n` packets or fewer.
    ///
    /// # Errors
    ///
    /// Returns `Truncated` if the skip runs into a torn packet, or a
    /// storage error.
    pub fn seek_to_packet(&mut self, n: u64) -> CoreResult<bool> {
        self.reset();
        for _ in 0..n {
            if self.next_packet()?.is_none() {
                return Ok(false);
            }
        }
        match self.next_packet()? {
            Some(packet) => {
                self.pending = Some(packet);
                self.packets_returned -= 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Counts all readable packets without disturbing the cursor.
    ///
    /// # Errors
    ///
    /// Returns a storage error. Truncated and unreadable segments are
    /// counted as far as they can be read.
    pub fn packet_count(&self) -> CoreResult<u64> {
        let mut count = 0;
        self.scan_all(|_| {
            count += 1;
        })?;
        Ok(count)
    }

    /// First and last packet timestamps, without disturbing the cursor.
    ///
    /// Returns `None` for a store with no readable packets.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn time_range(&self) -> CoreResult<Option<(Timestamp, Timestamp)>> {
        let mut range: Option<(Timestamp, Timestamp)> = None;
        self.scan_all(|packet| {
            let ts = packet.packet.timestamp();
            range = Some(match range {
                None => (ts, ts),
                Some((first, last)) => (first.min(ts), last.max(ts)),
            });
        })?;
        Ok(range)
    }

    /// Scans every segment with fresh readers, feeding each packet to
    /// `visit`. Torn tails end a segment's scan; unreadable segments are
    /// passed over.
    fn scan_all(&self, mut visit: impl FnMut(&ReadPacket)) -> CoreResult<()> {
        for path in &self.segments {
            let mut reader = match SegmentReader::open(path, &self.config.format) {
                Ok(reader) => reader,
                Err(_) => continue,
            };
            loop {
                match reader.next_packet(false) {
                    Ok(Some(packet)) => visit(&packet),
                    Ok(None) => break,
                    Err(CoreError::Truncated { .. }) | Err(CoreError::Format { .. }) => break,
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Timestamp of the first readable packet.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn first_timestamp(&self) -> CoreResult<Option<Timestamp>> {
        Ok(self.time_range()?.map(|(first, _)| first))
    }

    /// Timestamp of the last readable packet.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn last_timestamp(&self) -> CoreResult<Option<Timestamp>> {
        Ok(self.time_range()?.map(|(_, last)| last))
    }

    /// Total on-disk size of all segment files in bytes.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a segment file cannot be stat'd.
    pub fn total_size(&self) -> CoreResult<u64> {
        let mut total = 0;
        for path in &self.segments {
            total += std::fs::metadata(path)?.len();
        }
        Ok(total)
    }

    /// All segment file paths, in replay order.
    #[must_use]
    pub fn segment_paths(&self) -> &[PathBuf] {
        &self.segments
    }

    /// Number of segment files listed at open time.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Segments skipped as unreadable since the last reset.
    #[must_use]
    pub fn skipped_segments(&self) -> &[PathBuf] {
        &self.skipped
    }

    /// Packets returned since the last reset.
    #[must_use]
    pub fn packets_returned(&self) -> u64 {
        self.packets_returned
    }

    /// Whether a project index loaded.
    #[must_use]
    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// The store's directory layout.
    #[must_use]
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }
}

impl std::fmt::Debug for StoreReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreReader")
            .field("segments", &self.segments.len())
            .field("next_segment", &self.next_segment)
            .field("finished", &self.finished)
            .field("has_index", &self.index.is_some())
            .finish_non_exhaustive()
    }
}
