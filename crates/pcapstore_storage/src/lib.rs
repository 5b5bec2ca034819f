//! # pcapstore Storage
//!
//! Append-only storage backends for pcapstore.
//!
//! Backends are **opaque byte stores**: they read, append, flush and sync
//! bytes without interpreting them. Segment headers, packet framing and the
//! project index format all live in the layers above.
//!
//! ## Available backends
//!
//! - [`FileBackend`] - persistent storage on the local file system
//! - [`InMemoryBackend`] - for tests and torn-write simulation
//!
//! ## Example
//!
//! ```rust
//! use pcapstore_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"packet bytes").unwrap();
//! assert_eq!(backend.read_at(offset, 12).unwrap(), b"packet bytes");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
