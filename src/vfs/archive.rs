//! A simple directory-indexed blob container.
//!
//! Layout: an 8-byte MAGIC, the byte length of the directory, the
//! bincode-serialized directory, then the blobs packed back to back.
//! Blob offsets are relative to the end of the directory, so the
//! directory can be written without knowing its own serialized size.

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::errors::*;
use super::Filesystem;

pub const MAGIC: [u8; 8] = [
    'C' as u8, 'V' as u8, 'Y' as u8, 'R' as u8, ' ' as u8, 0, 0, 1,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    name: String,
    offset: u64,
    len: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Directory {
    entries: Vec<Entry>,
}

/// Accumulates named blobs and packs them into the container layout.
#[derive(Default)]
pub struct ArchiveBuilder {
    blobs: Vec<(String, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        ArchiveBuilder { blobs: Vec::new() }
    }

    pub fn add<S, T>(&mut self, name: S, bytes: T) -> &mut Self
    where
        S: Into<String>,
        T: Into<Vec<u8>>,
    {
        self.blobs.push((name.into(), bytes.into()));
        self
    }

    pub fn write_to<W>(&self, mut out: W) -> Result<()>
    where
        W: Write,
    {
        let mut entries = Vec::with_capacity(self.blobs.len());
        let mut offset = 0u64;
        for &(ref name, ref bytes) in &self.blobs {
            entries.push(Entry {
                name: name.clone(),
                offset: offset,
                len: bytes.len() as u64,
            });
            offset += bytes.len() as u64;
        }

        let directory = bincode::serialize(&Directory { entries: entries })?;

        out.write_all(&MAGIC)?;
        out.write_u64::<LittleEndian>(directory.len() as u64)?;
        out.write_all(&directory)?;

        for &(_, ref bytes) in &self.blobs {
            out.write_all(bytes)?;
        }

        Ok(())
    }
}

/// Reads blobs back out of a container.
pub struct Archive<R> {
    file: R,
    entries: HashMap<String, (u64, u64)>,
    blob_base: u64,
}

impl<R> Archive<R>
where
    R: Read + Seek,
{
    pub fn new(mut file: R) -> Result<Self> {
        let mut magic = [0u8; 8];
        file.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(Error::Malformed("MAGIC number not match".into()));
        }

        let len = file.read_u64::<LittleEndian>()?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf)?;

        let directory: Directory = bincode::deserialize(&buf)?;
        let entries = directory
            .entries
            .into_iter()
            .map(|v| (v.name, (v.offset, v.len)))
            .collect();

        Ok(Archive {
            file: file,
            entries: entries,
            blob_base: 16 + len,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self, name: &str) -> Option<u64> {
        self.entries.get(name).map(|&(_, len)| len)
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|v| v.as_str())
    }

    /// Reads the blob named `name`, appending its bytes onto `buf`.
    pub fn read(&mut self, name: &str, buf: &mut Vec<u8>) -> Result<()> {
        let (offset, len) = match self.entries.get(name) {
            Some(&v) => v,
            None => return Err(Error::FileNotFound(name.into())),
        };

        self.file.seek(SeekFrom::Start(self.blob_base + offset))?;

        let start = buf.len();
        buf.resize(start + len as usize, 0);
        self.file.read_exact(&mut buf[start..])?;
        Ok(())
    }
}

/// A virtual filesystem over an on-disk container.
pub struct ArchiveFS {
    archive: Mutex<Archive<fs::File>>,
}

impl ArchiveFS {
    pub fn new<T>(path: T) -> Result<Self>
    where
        T: AsRef<Path>,
    {
        let file = fs::File::open(path)?;
        Ok(ArchiveFS {
            archive: Mutex::new(Archive::new(file)?),
        })
    }
}

impl Filesystem for ArchiveFS {
    fn exists(&self, path: &Path) -> bool {
        path.to_str()
            .map(|name| self.archive.lock().unwrap().contains(name))
            .unwrap_or(false)
    }

    fn len(&self, path: &Path) -> Result<u64> {
        path.to_str()
            .and_then(|name| self.archive.lock().unwrap().len(name))
            .ok_or_else(|| Error::FileNotFound(path.to_owned()))
    }

    fn load_into(&self, path: &Path, buf: &mut Vec<u8>) -> Result<()> {
        match path.to_str() {
            Some(name) => self.archive.lock().unwrap().read(name, buf),
            None => Err(Error::FileNotFound(path.to_owned())),
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn round_trip() {
        let mut builder = ArchiveBuilder::new();
        builder.add("foo/a.bin", vec![1u8, 2, 3, 4]);
        builder.add("b.bin", b"hello".to_vec());

        let mut bytes = Vec::new();
        builder.write_to(&mut bytes).unwrap();

        let mut archive = Archive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.contains("foo/a.bin"));
        assert!(archive.contains("b.bin"));
        assert!(!archive.contains("c.bin"));
        assert_eq!(archive.len("foo/a.bin"), Some(4));
        assert_eq!(archive.len("b.bin"), Some(5));

        let mut buf = Vec::new();
        archive.read("b.bin", &mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        buf.clear();
        archive.read("foo/a.bin", &mut buf).unwrap();
        assert_eq!(buf, vec![1, 2, 3, 4]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Archive::new(Cursor::new(vec![0u8; 64])).is_err());
        assert!(Archive::new(Cursor::new(Vec::new())).is_err());
    }
}
