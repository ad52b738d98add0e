pub use crate::stream;
pub use crate::stream::location::{BytesLocation, FsLocation, ResourceLocation};
pub use crate::stream::table::{ResourceId, ResourceStatus};
pub use crate::stream::{
    StreamMan, StreamManShared, StreamSetup, StreamStatistics, StreamingTypeInterface,
};

pub use crate::vfs;
pub use crate::vfs::{ArchiveBuilder, ArchiveFS, DirectoryFS, Filesystem, FilesystemDriver};
