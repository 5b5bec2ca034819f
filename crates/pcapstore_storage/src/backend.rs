//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level append-only byte store.
///
/// Backends never interpret the bytes they hold; pcapstore owns all format
/// knowledge. The contract is deliberately small:
///
/// - `append` writes at the end and returns the offset written to
/// - `read_at` returns exactly the bytes previously appended at that offset
/// - `flush` pushes buffered data to the OS, `sync` makes it durable
/// - `truncate` shrinks the store (tests use it to model torn writes)
///
/// Backends must be `Send + Sync` so readers and the async wrappers can move
/// them across threads.
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `ReadPastEnd` if the range extends past the current size,
    /// or an I/O error from the underlying store.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data at the end and returns the offset it was written to.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Flushes buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Syncs data and metadata to durable storage.
    ///
    /// Stronger than `flush`: after a successful sync the appended bytes
    /// survive process and OS termination.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size in bytes (the next append offset).
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Truncates the store to `new_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns `TruncateBeyondEnd` if `new_size` exceeds the current size,
    /// or an I/O error from the underlying store.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
