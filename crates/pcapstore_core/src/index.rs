//! The project index: a sparse time-to-location map over all segments.
//!
//! Entries are appended at the sampling cadence as packets are written, one
//! entry per elapsed interval rather than one per packet, so the index
//! stays small while still bounding every seek's forward scan by one
//! interval's packet volume.

use crate::error::{CoreError, CoreResult};
use crate::types::{PacketLocation, Timestamp};
use pcapstore_codec::{Format, IndexEntry, IndexHeader, INDEX_ENTRY_LEN, INDEX_HEADER_LEN};
use pcapstore_storage::StorageBackend;
use std::path::Path;

fn entry_ts(entry: &IndexEntry) -> Timestamp {
    Timestamp::new(entry.ts_secs, entry.ts_nanos)
}

/// Ordered, append-only mapping from sampled timestamps to packet
/// locations.
///
/// Kept fully in memory and persisted incrementally: every accepted sample
/// is appended to the backing file before it becomes visible to
/// [`ProjectIndex::find_floor`]. On load the entry sequence is rebuilt by
/// linear scan; a torn trailing entry ends the scan without failing the
/// load.
pub struct ProjectIndex {
    backend: Box<dyn StorageBackend>,
    entries: Vec<IndexEntry>,
}

impl ProjectIndex {
    /// Creates a fresh index, writing its header to the backend.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the header cannot be written.
    pub fn create(mut backend: Box<dyn StorageBackend>, format: &Format) -> CoreResult<Self> {
        backend.append(&IndexHeader::new(format).encode())?;
        Ok(Self {
            backend,
            entries: Vec::new(),
        })
    }

    /// Loads an existing index by scanning the backend.
    ///
    /// # Errors
    ///
    /// Returns `Format` (with `path` for context) if the header is missing,
    /// carries the wrong magic or version, an entry fails to decode, or
    /// the entry timestamps are not monotonically non-decreasing. Callers
    /// treat any such error as "no usable index" and fall back to a linear
    /// scan.
    pub fn load(
        backend: Box<dyn StorageBackend>,
        format: &Format,
        path: &Path,
    ) -> CoreResult<Self> {
        let size = backend.size()?;
        if size < INDEX_HEADER_LEN as u64 {
            return Err(CoreError::format(
                path,
                format!("index file is {size} bytes, smaller than its header"),
            ));
        }

        let header_bytes = backend.read_at(0, INDEX_HEADER_LEN)?;
        let header = IndexHeader::decode(&header_bytes)?;
        header
            .validate(format)
            .map_err(|e| CoreError::format(path, e.to_string()))?;

        let mut entries = Vec::new();
        let mut offset = INDEX_HEADER_LEN as u64;
        while offset + INDEX_ENTRY_LEN as u64 <= size {
            let bytes = backend.read_at(offset, INDEX_ENTRY_LEN)?;
            let entry = IndexEntry::decode(&bytes)
                .map_err(|e| CoreError::format(path, format!("entry at offset {offset}: {e}")))?;

            if let Some(last) = entries.last() {
                if entry_ts(&entry) < entry_ts(last) {
                    return Err(CoreError::format(
                        path,
                        format!("entry at offset {offset} breaks timestamp order"),
                    ));
                }
            }
            entries.push(entry);
            offset += INDEX_ENTRY_LEN as u64;
        }

        if offset < size {
            // Torn trailing entry from an interrupted writer; the whole
            // entries before it are still good.
            tracing::warn!(
                index = %path.display(),
                tail_bytes = size - offset,
                "ignoring torn trailing index entry"
            );
        }

        Ok(Self { backend, entries })
    }

    /// Appends one sample.
    ///
    /// The write path is monotonic by contract, so a timestamp older than
    /// the last accepted sample is a fatal caller error.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for a backward timestamp, `Codec` for an
    /// unencodable segment name, or a storage error.
    pub fn append_sample(
        &mut self,
        ts: Timestamp,
        segment_name: &str,
        offset: u64,
        packet_size: u32,
    ) -> CoreResult<()> {
        if let Some(last) = self.entries.last() {
            if ts < entry_ts(last) {
                return Err(CoreError::invalid_state(format!(
                    "index sample at {ts} is older than the last sample at {}",
                    entry_ts(last)
                )));
            }
        }

        let entry = IndexEntry {
            ts_secs: ts.secs(),
            ts_nanos: ts.nanos(),
            offset,
            packet_size,
            segment_name: segment_name.to_owned(),
        };
        let bytes = entry.encode()?;
        self.backend.append(&bytes)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Finds the last entry whose timestamp is at or before `ts`.
    ///
    /// When several entries share that timestamp the earliest of them is
    /// returned, so a forward scan from the result cannot miss packets at
    /// the exact target time. Returns `None` when `ts` predates the first
    /// sample.
    #[must_use]
    pub fn find_floor(&self, ts: Timestamp) -> Option<&IndexEntry> {
        let upper = self.entries.partition_point(|e| entry_ts(e) <= ts);
        if upper == 0 {
            return None;
        }
        let floor_ts = entry_ts(&self.entries[upper - 1]);
        let first_of_run = self.entries.partition_point(|e| entry_ts(e) < floor_ts);
        self.entries.get(first_of_run)
    }

    /// Resolves `ts` to the packet location to start a forward scan from.
    ///
    /// Convenience over [`ProjectIndex::find_floor`].
    #[must_use]
    pub fn locate(&self, ts: Timestamp) -> Option<PacketLocation> {
        self.find_floor(ts).map(|entry| PacketLocation {
            segment_name: entry.segment_name.clone(),
            offset: entry.offset,
        })
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All samples in append order.
    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// The first sample.
    #[must_use]
    pub fn first(&self) -> Option<&IndexEntry> {
        self.entries.first()
    }

    /// The last sample.
    #[must_use]
    pub fn last(&self) -> Option<&IndexEntry> {
        self.entries.last()
    }

    /// Timestamp of the first sample.
    #[must_use]
    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.entries.first().map(entry_ts)
    }

    /// Forces appended samples to stable storage.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the sync fails.
    pub fn flush(&mut self) -> CoreResult<()> {
        self.backend.sync()?;
        Ok(())
    }
}

impl std::fmt::Debug for ProjectIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectIndex")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
