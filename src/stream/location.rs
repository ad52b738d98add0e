//! Pull-based byte sources that decouple the streaming core from any
//! particular storage backend.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::errors::*;
use crate::vfs::FilesystemDriver;

/// A pull-based source of one resource's raw bytes.
///
/// The size must stay stable for the lifetime of the location; it is
/// queried once when the resource is linked and drives the scratch buffer
/// sizing of the channel that eventually fetches the bytes.
pub trait ResourceLocation: Send + Sync + 'static {
    /// Byte length of the resource.
    fn data_size(&self) -> usize;

    /// Fills `buf` with exactly `data_size()` bytes.
    fn fetch_data(&self, buf: &mut [u8]) -> Result<()>;
}

/// A location backed by a mounted filesystem path.
///
/// The byte length is captured eagerly at construction; a backing store
/// that cannot report its length fails here instead of surfacing later
/// inside a channel thread.
pub struct FsLocation {
    driver: Arc<FilesystemDriver>,
    path: PathBuf,
    size: usize,
    scratch: Mutex<Vec<u8>>,
}

impl FsLocation {
    pub fn new<P>(driver: Arc<FilesystemDriver>, path: P) -> Result<Self>
    where
        P: Into<PathBuf>,
    {
        let path = path.into();
        let size = driver.len(&path)? as usize;

        Ok(FsLocation {
            driver: driver,
            path: path,
            size: size,
            scratch: Mutex::new(Vec::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResourceLocation for FsLocation {
    fn data_size(&self) -> usize {
        self.size
    }

    fn fetch_data(&self, buf: &mut [u8]) -> Result<()> {
        let mut scratch = self.scratch.lock().unwrap();
        scratch.clear();
        self.driver.load_into(&self.path, &mut scratch)?;

        if scratch.len() != buf.len() {
            bail!(
                "File {:?} changed size since it was linked ({} bytes, expected {}).",
                self.path,
                scratch.len(),
                buf.len()
            );
        }

        buf.copy_from_slice(&scratch);
        Ok(())
    }
}

/// A location over an in-memory blob.
pub struct BytesLocation {
    bytes: Vec<u8>,
}

impl BytesLocation {
    pub fn new<T>(bytes: T) -> Self
    where
        T: Into<Vec<u8>>,
    {
        BytesLocation {
            bytes: bytes.into(),
        }
    }
}

impl ResourceLocation for BytesLocation {
    fn data_size(&self) -> usize {
        self.bytes.len()
    }

    fn fetch_data(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() != self.bytes.len() {
            bail!(
                "Destination buffer is {} bytes, expected {}.",
                buf.len(),
                self.bytes.len()
            );
        }

        buf.copy_from_slice(&self.bytes);
        Ok(())
    }
}
