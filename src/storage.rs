//! Backing stores for the persisted byte region.
//!
//! The registry keeps its working copy of the region in RAM and pushes the
//! whole region through [`Backing::commit`] after every mutation, the same
//! load-once / commit-per-write lifecycle the monitor firmware uses for its
//! EEPROM page. A commit that returns `Ok` means the bytes survive power
//! loss; a commit that fails must report it so the triggering operation can
//! fail rather than pretend success.

use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use crate::Error;

/// Durable storage for one flat byte region.
///
/// Implementations are synchronous: `commit` blocks until the region is
/// durable. The registry is the sole writer; implementations never mutate
/// the region themselves.
pub trait Backing {
    /// Read the persisted region, or `None` if nothing was ever committed.
    fn load(&mut self) -> Result<Option<Vec<u8>>, Error>;

    /// Persist the region. Must not return `Ok` until the bytes would
    /// survive a power cycle.
    fn commit(&mut self, region: &[u8]) -> Result<(), Error>;
}

/// In-memory backing with no durability, for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct MemoryBacking {
    committed: Option<Vec<u8>>,
}

impl MemoryBacking {
    /// Create an empty backing (first load returns `None`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backing pre-seeded with an already-persisted region.
    pub fn with_region(region: Vec<u8>) -> Self {
        Self {
            committed: Some(region),
        }
    }

    /// The last committed region, if any.
    pub fn committed(&self) -> Option<&[u8]> {
        self.committed.as_deref()
    }
}

impl Backing for MemoryBacking {
    fn load(&mut self) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.committed.clone())
    }

    fn commit(&mut self, region: &[u8]) -> Result<(), Error> {
        self.committed = Some(region.to_vec());
        Ok(())
    }
}

/// File-backed region. `commit` writes the file and fsyncs it before
/// returning.
#[derive(Debug, Clone)]
pub struct FileBacking {
    path: PathBuf,
}

impl FileBacking {
    /// Use the file at `path` as the persisted region. The file is created
    /// on first commit.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl Backing for FileBacking {
    fn load(&mut self) -> Result<Option<Vec<u8>>, Error> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn commit(&mut self, region: &[u8]) -> Result<(), Error> {
        let mut file = File::create(&self.path)?;
        file.write_all(region)?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("battreg-{}-{}", name, std::process::id()));
        path
    }

    #[test]
    fn test_memory_backing_round_trip() {
        let mut backing = MemoryBacking::new();
        assert!(backing.load().unwrap().is_none());

        backing.commit(&[1, 2, 3]).unwrap();
        assert_eq!(backing.load().unwrap().as_deref(), Some(&[1, 2, 3][..]));
        assert_eq!(backing.committed(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn test_file_backing_missing_file_loads_none() {
        let path = temp_path("missing");
        let _ = std::fs::remove_file(&path);

        let mut backing = FileBacking::new(&path);
        assert!(backing.load().unwrap().is_none());
    }

    #[test]
    fn test_file_backing_round_trip() {
        let path = temp_path("round-trip");
        let _ = std::fs::remove_file(&path);

        let mut backing = FileBacking::new(&path);
        backing.commit(&[9, 8, 7]).unwrap();

        // A fresh instance sees what the old one committed.
        let mut reopened = FileBacking::new(&path);
        assert_eq!(reopened.load().unwrap().as_deref(), Some(&[9, 8, 7][..]));

        let _ = std::fs::remove_file(&path);
    }
}
