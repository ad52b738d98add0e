//! `conveyor` is a small, portable streaming resource manager for games.
//!
//! It loads coarse-grained binary resources (models, textures, collision
//! data) asynchronously over a fixed pool of worker channels, tracks their
//! lifecycle behind small integer handles, and pulls bytes from pluggable
//! backing stores — host directories, archive containers, or anything
//! implementing the [`vfs::Filesystem`] or
//! [`stream::location::ResourceLocation`] boundary.
//!
//! ```
//! use std::sync::Arc;
//! use conveyor::prelude::*;
//!
//! struct Models;
//!
//! impl StreamingTypeInterface for Models {
//!     fn load_resource(&self, _local_id: u32, _bytes: &[u8]) {}
//!     fn unload_resource(&self, _local_id: u32) {}
//!     fn object_memory_size(&self, _local_id: u32) -> usize {
//!         0
//!     }
//! }
//!
//! fn main() -> conveyor::errors::Result<()> {
//!     let man = StreamMan::new(StreamSetup::default())?;
//!     let stream = man.shared();
//!
//!     stream.register_resource_type(0, 500, Arc::new(Models));
//!     stream.link_resource(7, "crate.mdl", Arc::new(BytesLocation::new(vec![0u8; 1024])));
//!
//!     stream.request(7);
//!     stream.loading_barrier();
//!
//!     assert_eq!(stream.resource_status(7), Some(ResourceStatus::Loaded));
//!     Ok(())
//! }
//! ```

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

pub mod errors;
pub mod prelude;
pub mod stream;
pub mod vfs;

pub use self::stream::{StreamMan, StreamManShared, StreamSetup, StreamStatistics};
