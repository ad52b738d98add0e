use std::path::PathBuf;

use inlinable_string::InlinableString;

#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{}", _0)]
    Io(::std::io::Error),
    #[fail(display = "{}", _0)]
    Bincode(::bincode::Error),
    #[fail(display = "Filesystem identifier '{}' has been mounted already.", _0)]
    MountDuplicated(InlinableString),
    #[fail(display = "Failed to find filesystem with identifier '{}'.", _0)]
    MountNotFound(InlinableString),
    #[fail(display = "Failed to find filesystem at {:?}.", _0)]
    FilesystemNotFound(PathBuf),
    #[fail(display = "Failed to find file at {:?}.", _0)]
    FileNotFound(PathBuf),
    #[fail(display = "Archive is malformed: {}.", _0)]
    Malformed(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl From<::std::io::Error> for Error {
    fn from(err: ::std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<::bincode::Error> for Error {
    fn from(err: ::bincode::Error) -> Self {
        Error::Bincode(err)
    }
}
