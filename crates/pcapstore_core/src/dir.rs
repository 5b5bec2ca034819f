//! Store directory layout.
//!
//! A store named `N` under base directory `B` occupies:
//!
//! ```text
//! B/
//! ├─ N.pcap      # project index file
//! └─ N/          # segment directory
//!    ├─ data_<created>.pcap
//!    └─ data_<created>.pcap ...
//! ```
//!
//! Segment file names embed their creation timestamp, which doubles as the
//! fallback ordering key when the project index is missing.

use crate::error::{CoreError, CoreResult};
use crate::segment::parse_segment_stamp;
use std::fs;
use std::path::{Path, PathBuf};

/// Extension shared by index and segment files.
const PCAP_EXT: &str = "pcap";

/// Resolves the paths of one store.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    base: PathBuf,
    name: String,
}

impl StoreLayout {
    /// Builds the layout for store `name` under `base`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the name is empty or contains a path
    /// separator.
    pub fn new(base: &Path, name: &str) -> CoreResult<Self> {
        if name.is_empty() {
            return Err(CoreError::validation("store name must not be empty"));
        }
        if name.contains(['/', '\\']) {
            return Err(CoreError::validation(format!(
                "store name {name:?} must not contain path separators"
            )));
        }
        Ok(Self {
            base: base.to_path_buf(),
            name: name.to_owned(),
        })
    }

    /// Derives a layout from a path to either the index file (`B/N.pcap`)
    /// or the segment directory (`B/N`).
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the path has no parent or no usable name.
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let base = path
            .parent()
            .ok_or_else(|| CoreError::validation(format!("{} has no parent", path.display())))?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CoreError::validation(format!("{} has no store name", path.display())))?;
        Self::new(base, name)
    }

    /// The store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the project index file, `B/N.pcap`.
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.base.join(format!("{}.{PCAP_EXT}", self.name))
    }

    /// Path of the segment directory, `B/N/`.
    #[must_use]
    pub fn segment_dir(&self) -> PathBuf {
        self.base.join(&self.name)
    }

    /// Path of a segment file inside the segment directory.
    #[must_use]
    pub fn segment_path(&self, file_name: &str) -> PathBuf {
        self.segment_dir().join(file_name)
    }

    /// Creates the segment directory (and parents) on disk.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation fails.
    pub fn create_dirs(&self) -> CoreResult<()> {
        fs::create_dir_all(self.segment_dir())?;
        Ok(())
    }

    /// Lists segment files sorted by their embedded creation timestamp.
    ///
    /// Files whose names do not parse as segment names are ignored.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the segment directory cannot be read.
    pub fn list_segments(&self) -> CoreResult<Vec<PathBuf>> {
        let dir = self.segment_dir();
        let mut segments = Vec::new();

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            match parse_segment_stamp(file_name) {
                Some(stamp) => segments.push((stamp, path)),
                None => {
                    tracing::debug!(file = %path.display(), "ignoring non-segment file");
                }
            }
        }

        segments.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(segments.into_iter().map(|(_, path)| path).collect())
    }
}
