//! Async wrappers over the blocking store facades.
//!
//! All file work happens on the tokio blocking pool. Each wrapper owns
//! its facade behind an `Arc<Mutex<_>>` so a clone of the handle can be
//! moved into the pool; calls on one handle serialize, matching the
//! single-writer and single-cursor contracts of the blocking types.

use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::packet::{Packet, ReadPacket};
use crate::store::{StoreReader, StoreWriter};
use crate::types::Timestamp;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

async fn on_pool<S, T, F>(inner: Arc<Mutex<S>>, f: F) -> CoreResult<T>
where
    S: Send + 'static,
    T: Send + 'static,
    F: FnOnce(&mut S) -> CoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&mut *inner.lock()))
        .await
        .map_err(|e| CoreError::invalid_state(format!("blocking task failed: {e}")))?
}

/// Async handle to a [`StoreWriter`].
#[derive(Debug, Clone)]
pub struct AsyncStoreWriter {
    inner: Arc<Mutex<StoreWriter>>,
}

impl AsyncStoreWriter {
    /// Creates a new store under `base` named `name`.
    ///
    /// # Errors
    ///
    /// Same as [`StoreWriter::create`].
    pub async fn create(base: &Path, name: &str, config: StoreConfig) -> CoreResult<Self> {
        let base = base.to_owned();
        let name = name.to_owned();
        let writer =
            tokio::task::spawn_blocking(move || StoreWriter::create(&base, &name, config))
                .await
                .map_err(|e| CoreError::invalid_state(format!("blocking task failed: {e}")))??;
        Ok(Self {
            inner: Arc::new(Mutex::new(writer)),
        })
    }

    /// Appends one packet.
    ///
    /// # Errors
    ///
    /// Same as [`StoreWriter::write_packet`].
    pub async fn write_packet(&self, packet: Packet) -> CoreResult<()> {
        on_pool(self.inner.clone(), move |w| w.write_packet(&packet)).await
    }

    /// Appends a batch of packets, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Same as [`StoreWriter::write_packets`].
    pub async fn write_packets(&self, packets: Vec<Packet>) -> CoreResult<()> {
        on_pool(self.inner.clone(), move |w| w.write_packets(&packets)).await
    }

    /// Flushes the open segment and the index.
    ///
    /// # Errors
    ///
    /// Same as [`StoreWriter::flush`].
    pub async fn flush(&self) -> CoreResult<()> {
        on_pool(self.inner.clone(), StoreWriter::flush).await
    }

    /// Closes the current segment and syncs the index.
    ///
    /// # Errors
    ///
    /// Same as [`StoreWriter::close`].
    pub async fn close(&self) -> CoreResult<()> {
        on_pool(self.inner.clone(), StoreWriter::close).await
    }

    /// Total packets written.
    pub async fn packet_count(&self) -> u64 {
        self.inner.lock().packet_count()
    }
}

/// Async handle to a [`StoreReader`].
#[derive(Debug, Clone)]
pub struct AsyncStoreReader {
    inner: Arc<Mutex<StoreReader>>,
}

impl AsyncStoreReader {
    /// Opens the store under `base` named `name`.
    ///
    /// # Errors
    ///
    /// Same as [`StoreReader::open`].
    pub async fn open(base: &Path, name: &str, config: StoreConfig) -> CoreResult<Self> {
        let base = base.to_owned();
        let name = name.to_owned();
        Self::wrap(tokio::task::spawn_blocking(move || {
            StoreReader::open(&base, &name, config)
        }))
        .await
    }

    /// Opens the store whose index file or segment directory is at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`StoreReader::open_path`].
    pub async fn open_path(path: &Path, config: StoreConfig) -> CoreResult<Self> {
        let path = path.to_owned();
        Self::wrap(tokio::task::spawn_blocking(move || {
            StoreReader::open_path(&path, config)
        }))
        .await
    }

    async fn wrap(
        handle: tokio::task::JoinHandle<CoreResult<StoreReader>>,
    ) -> CoreResult<Self> {
        let reader = handle
            .await
            .map_err(|e| CoreError::invalid_state(format!("blocking task failed: {e}")))??;
        Ok(Self {
            inner: Arc::new(Mutex::new(reader)),
        })
    }

    /// Returns the next packet, or `None` at end of stream.
    ///
    /// # Errors
    ///
    /// Same as [`StoreReader::next_packet`].
    pub async fn next_packet(&self) -> CoreResult<Option<ReadPacket>> {
        on_pool(self.inner.clone(), StoreReader::next_packet).await
    }

    /// Positions the stream at the first packet at or after `ts`.
    ///
    /// # Errors
    ///
    /// Same as [`StoreReader::seek_to_time`].
    pub async fn seek_to_time(&self, ts: Timestamp) -> CoreResult<bool> {
        on_pool(self.inner.clone(), move |r| r.seek_to_time(ts)).await
    }

    /// Positions the stream so the next packet returned is packet `n`.
    ///
    /// # Errors
    ///
    /// Same as [`StoreReader::seek_to_packet`].
    pub async fn seek_to_packet(&self, n: u64) -> CoreResult<bool> {
        on_pool(self.inner.clone(), move |r| r.seek_to_packet(n)).await
    }

    /// Rewinds to the start of the stream.
    pub async fn reset(&self) {
        self.inner.lock().reset();
    }

    /// Counts all readable packets.
    ///
    /// # Errors
    ///
    /// Same as [`StoreReader::packet_count`].
    pub async fn packet_count(&self) -> CoreResult<u64> {
        on_pool(self.inner.clone(), |r| r.packet_count()).await
    }

    /// First and last packet timestamps.
    ///
    /// # Errors
    ///
    /// Same as [`StoreReader::time_range`].
    pub async fn time_range(&self) -> CoreResult<Option<(Timestamp, Timestamp)>> {
        on_pool(self.inner.clone(), |r| r.time_range()).await
    }

    /// Segments skipped as unreadable since the last reset.
    pub async fn skipped_segments(&self) -> Vec<PathBuf> {
        self.inner.lock().skipped_segments().to_vec()
    }
}
