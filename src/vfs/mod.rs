//! The virtual file-system layer the streaming manager pulls bytes from.
//!
//! A [`Filesystem`] is a pluggable byte store; the [`FilesystemDriver`]
//! mounts any number of them under string identifiers, so a path like
//! `/res/models/crate.mdl` resolves to the file `models/crate.mdl` inside
//! whatever store was mounted as `res` — a host directory, an archive, or
//! anything user-provided.

pub mod archive;
pub mod errors;

pub use self::archive::{Archive, ArchiveBuilder, ArchiveFS};

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Component, Components, Path, PathBuf};
use std::sync::Arc;

use inlinable_string::InlinableString;

use self::errors::*;

/// The io operations a backing store has to support.
pub trait Filesystem: Send + Sync {
    /// Return whether the path points at an existing file.
    fn exists(&self, path: &Path) -> bool;

    /// Byte length of the file at `path`.
    fn len(&self, path: &Path) -> Result<u64>;

    /// Read all bytes of the file at `path`, appending them onto `buf`.
    fn load_into(&self, path: &Path, buf: &mut Vec<u8>) -> Result<()>;
}

/// The driver of the virtual filesystem.
#[derive(Default)]
pub struct FilesystemDriver {
    mounts: HashMap<InlinableString, Arc<dyn Filesystem>>,
}

impl FilesystemDriver {
    pub fn new() -> Self {
        FilesystemDriver {
            mounts: HashMap::new(),
        }
    }

    /// Mount a backing store under `ident`.
    pub fn mount<S, F>(&mut self, ident: S, fs: F) -> Result<()>
    where
        S: Into<InlinableString>,
        F: Filesystem + 'static,
    {
        let ident = ident.into();
        if self.mounts.contains_key(&ident) {
            return Err(Error::MountDuplicated(ident));
        }

        info!("Mounted filesystem '{}'.", ident);
        self.mounts.insert(ident, Arc::new(fs));
        Ok(())
    }

    /// Unmount the backing store under `ident`.
    pub fn unmount<S>(&mut self, ident: S)
    where
        S: AsRef<str>,
    {
        let ident = InlinableString::from(ident.as_ref());
        if self.mounts.remove(&ident).is_some() {
            info!("Unmounted filesystem '{}'.", ident);
        }
    }

    /// Return whether the path points at an existing file in one of the
    /// mounted stores.
    pub fn exists<P>(&self, path: P) -> bool
    where
        P: AsRef<Path>,
    {
        self.locate(path.as_ref())
            .map(|(fs, file)| fs.exists(file))
            .unwrap_or(false)
    }

    /// Byte length of the file at `path`.
    pub fn len<P>(&self, path: P) -> Result<u64>
    where
        P: AsRef<Path>,
    {
        let (fs, file) = self.locate(path.as_ref())?;
        fs.len(file)
    }

    /// Read all bytes of the file at `path`, appending them onto `buf`.
    pub fn load_into<P>(&self, path: P, buf: &mut Vec<u8>) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let (fs, file) = self.locate(path.as_ref())?;
        fs.load_into(file, buf)
    }

    /// Splits `path` into its mount identifier and the in-store remainder,
    /// resolving the identifier against the mounted stores.
    fn locate<'a>(&self, path: &'a Path) -> Result<(&Arc<dyn Filesystem>, &'a Path)> {
        let (ident, file) = FilesystemDriver::split(path.components())
            .ok_or_else(|| Error::FileNotFound(path.into()))?;

        let ident = InlinableString::from(ident);
        match self.mounts.get(&ident) {
            Some(fs) => Ok((fs, file)),
            None => Err(Error::MountNotFound(ident)),
        }
    }

    fn split(mut cmps: Components) -> Option<(&str, &Path)> {
        while let Some(v) = cmps.next() {
            if let Component::Normal(ident) = v {
                if let Some(ident) = ident.to_str() {
                    return Some((ident, cmps.as_path()));
                }
            }
        }

        None
    }
}

/// Maps a local host directory into the virtual file system.
pub struct DirectoryFS {
    root: PathBuf,
}

impl DirectoryFS {
    /// Create a new directory filesystem. Fails if `path` does not point at
    /// a directory.
    pub fn new<T>(path: T) -> Result<Self>
    where
        T: AsRef<Path>,
    {
        let meta = fs::metadata(&path)?;
        if meta.is_dir() {
            Ok(DirectoryFS {
                root: path.as_ref().to_owned(),
            })
        } else {
            Err(Error::FilesystemNotFound(path.as_ref().to_owned()))
        }
    }
}

impl Filesystem for DirectoryFS {
    fn exists(&self, path: &Path) -> bool {
        fs::metadata(self.root.join(path)).is_ok()
    }

    fn len(&self, path: &Path) -> Result<u64> {
        Ok(fs::metadata(self.root.join(path))?.len())
    }

    fn load_into(&self, path: &Path, buf: &mut Vec<u8>) -> Result<()> {
        let mut file = fs::File::open(self.root.join(path))?;
        file.read_to_end(buf)?;
        Ok(())
    }
}
