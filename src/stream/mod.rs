//! The streaming resource manager.
//!
//! `StreamMan` loads, tracks and evicts coarse-grained binary resources
//! (models, textures, collision data) identified by small integer handles,
//! without ever blocking the caller that issues load requests.
//!
//! # Types and spans
//!
//! A subsystem that wants resources streamed to it implements
//! [`StreamingTypeInterface`] and registers it together with a contiguous
//! span of identifiers. Spans of different types must float completely
//! apart from each other; a registration whose span touches a registered
//! one, even at a single coordinate, is rejected. When raw bytes arrive,
//! the subsystem is handed its own zero-based numbering (`id - base`), so
//! it never needs to know where its span sits in the global handle space.
//!
//! # Channels
//!
//! Requests are spread round-robin over a fixed set of worker channels.
//! Each channel is one OS thread with a private FIFO and a private scratch
//! buffer that grows to the largest resource it has seen. Within one
//! channel requests complete strictly in order; across channels no order
//! is guaranteed, so callers that need two resources loaded in sequence
//! must not rely on request issuing order alone.
//!
//! # Requests are accepted, not promised
//!
//! [`StreamManShared::request`] returns once the request is enqueued.
//! A request naming an unknown identifier, or a resource that is not
//! sitting at `Unloaded`, is silently dropped by the channel that picks it
//! up. Use [`StreamManShared::wait_for_resource`] or
//! [`StreamManShared::loading_barrier`] to observe completion.

pub mod channel;
pub mod interval;
pub mod location;
pub mod registry;
pub mod table;

pub mod prelude {
    pub use super::location::{BytesLocation, FsLocation, ResourceLocation};
    pub use super::table::{ResourceId, ResourceStatus};
    pub use super::{StreamMan, StreamManShared, StreamSetup, StreamingTypeInterface};
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use inlinable_string::InlinableString;

use crate::errors::*;

use self::channel::{Channel, Command};
use self::location::ResourceLocation;
use self::registry::TypeRegistry;
use self::table::{ResourceId, ResourceStatus, ResourceTable};

/// The callbacks a subsystem implements to receive raw resource bytes.
///
/// Identifiers handed to these callbacks are local to the subsystem's
/// registered span, starting at zero.
pub trait StreamingTypeInterface: Send + Sync + 'static {
    /// Decodes the fetched bytes of resource `local_id` into the
    /// subsystem's own in-memory structures.
    fn load_resource(&self, local_id: u32, bytes: &[u8]);

    /// Releases whatever `load_resource` built for `local_id`.
    fn unload_resource(&self, local_id: u32);

    /// In-memory footprint of the decoded resource `local_id`.
    fn object_memory_size(&self, local_id: u32) -> usize;
}

/// Construction parameters of `StreamMan`.
#[derive(Debug, Clone, Copy)]
pub struct StreamSetup {
    /// Number of worker channels to spawn.
    pub num_channels: usize,
    /// Reported memory ceiling. The manager reports it through
    /// [`StreamStatistics`] and does not evict against it.
    pub max_memory: usize,
}

impl Default for StreamSetup {
    fn default() -> Self {
        StreamSetup {
            num_channels: 2,
            max_memory: 64 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamStatistics {
    /// Sum of the byte lengths of all resources currently `Loaded`.
    pub memory_in_use: usize,
    pub max_memory: usize,
}

/// Owns the worker channels and tears them down on drop.
pub struct StreamMan {
    shared: Arc<StreamManShared>,
    joins: Vec<thread::JoinHandle<()>>,
}

impl StreamMan {
    /// Creates a new `StreamMan` and spawns its worker channels.
    pub fn new(setup: StreamSetup) -> Result<Self> {
        let table = Arc::new(RwLock::new(ResourceTable::new()));
        let registry = Arc::new(RwLock::new(TypeRegistry::new()));

        let num = setup.num_channels.max(1);
        let mut channels = Vec::with_capacity(num);
        let mut joins = Vec::with_capacity(num);

        for index in 0..num {
            let (channel, join) = Channel::spawn(index, table.clone(), registry.clone())?;
            channels.push(channel);
            joins.push(join);
        }

        info!("Streaming manager up with {} channels.", num);

        let shared = Arc::new(StreamManShared {
            table: table,
            registry: registry,
            channels: channels,
            cursor: AtomicUsize::new(0),
            max_memory: setup.max_memory,
        });

        Ok(StreamMan {
            shared: shared,
            joins: joins,
        })
    }

    /// Returns the multi-thread friendly parts of `StreamMan`.
    pub fn shared(&self) -> Arc<StreamManShared> {
        self.shared.clone()
    }
}

impl Drop for StreamMan {
    fn drop(&mut self) {
        for channel in &self.shared.channels {
            channel.stop();
        }

        for join in self.joins.drain(..) {
            let _ = join.join();
        }

        info!("Streaming manager down.");
    }
}

/// The multi-thread friendly parts of `StreamMan`.
pub struct StreamManShared {
    table: Arc<RwLock<ResourceTable>>,
    registry: Arc<RwLock<TypeRegistry>>,
    channels: Vec<Channel>,
    cursor: AtomicUsize,
    max_memory: usize,
}

const BACKOFF: Duration = Duration::from_millis(1);

impl StreamManShared {
    /// Binds the identifier span `[base, base + count)` to `interface`.
    /// Fails if the span is not completely apart from every registered one.
    pub fn register_resource_type(
        &self,
        base: u32,
        count: u32,
        interface: Arc<dyn StreamingTypeInterface>,
    ) -> bool {
        let accepted = self.registry.write().unwrap().register(base, count, interface);

        if accepted {
            info!("Registered streaming type over [{}, {}).", base, base + count);
        } else {
            warn!(
                "Rejected streaming type over [{}, {}); the span collides with a registered one.",
                base,
                base + count
            );
        }

        accepted
    }

    /// Removes the registration whose span starts at `base` and unlinks
    /// every resource inside the vacated span, whatever its status. A load
    /// that is mid-flight on one of those identifiers completes as a silent
    /// no-op.
    pub fn unregister_resource_type(&self, base: u32) -> bool {
        let record = self.registry.write().unwrap().unregister(base);

        match record {
            None => false,
            Some(record) => {
                let mut table = self.table.write().unwrap();
                for id in table.ids_in(&record.span) {
                    table.unlink(id);
                }

                info!("Unregistered streaming type at base {}.", base);
                true
            }
        }
    }

    /// Links resource `id` to a byte source. The byte length is captured
    /// from the location here and stays fixed until the resource is
    /// unlinked. Fails if `id` is already occupied.
    pub fn link_resource<T>(&self, id: ResourceId, name: T, location: Arc<dyn ResourceLocation>) -> bool
    where
        T: Into<InlinableString>,
    {
        self.table.write().unwrap().link(id, name, location)
    }

    /// Removes resource `id` from the table; returns whether anything was
    /// removed. Channel work already in flight for `id` is not cancelled;
    /// it finishes against its own handle of the byte source.
    pub fn unlink_resource(&self, id: ResourceId) -> bool {
        self.table.write().unwrap().unlink(id)
    }

    /// Enqueues a load of resource `id` on the next channel in round-robin
    /// order. Returns true once enqueued; acceptance, not completion.
    pub fn request(&self, id: ResourceId) -> bool {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.channels.len();

        {
            let mut table = self.table.write().unwrap();
            if let Some(record) = table.get_mut(id) {
                record.owning_channel = Some(index);
            }
        }

        self.channels[index].enqueue(Command::Load(id));
        true
    }

    /// Not supported; requests cannot be recalled once enqueued. Always
    /// returns false.
    pub fn cancel_request(&self, _: ResourceId) -> bool {
        false
    }

    /// Enqueues an unload of resource `id`; the mirror of [`request`].
    ///
    /// [`request`]: StreamManShared::request
    pub fn unload(&self, id: ResourceId) -> bool {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.channels.len();

        {
            let mut table = self.table.write().unwrap();
            if let Some(record) = table.get_mut(id) {
                record.owning_channel = Some(index);
            }
        }

        self.channels[index].enqueue(Command::Unload(id));
        true
    }

    /// Blocks until no channel has queued or in-flight work.
    ///
    /// The check is a sleep-and-recheck poll and is approximate across
    /// channels; pair it with [`wait_for_resource`] or
    /// [`resource_status`] when a per-resource guarantee is needed.
    ///
    /// [`wait_for_resource`]: StreamManShared::wait_for_resource
    /// [`resource_status`]: StreamManShared::resource_status
    pub fn loading_barrier(&self) {
        while !self.channels.iter().all(Channel::is_idle) {
            thread::sleep(BACKOFF);
        }
    }

    /// Blocks until resource `id` has no queued or in-flight request and
    /// its status is stable; returns whether it ended up `Loaded`. Returns
    /// false immediately if `id` is not linked.
    pub fn wait_for_resource(&self, id: ResourceId) -> bool {
        loop {
            {
                let table = self.table.read().unwrap();
                match table.get(id) {
                    None => return false,
                    Some(record) => match record.status {
                        ResourceStatus::Buffering
                        | ResourceStatus::Loading
                        | ResourceStatus::Unloading => {}
                        status => {
                            if record.owning_channel.is_none() {
                                return status == ResourceStatus::Loaded;
                            }
                        }
                    },
                }
            }

            thread::sleep(BACKOFF);
        }
    }

    pub fn resource_status(&self, id: ResourceId) -> Option<ResourceStatus> {
        self.table.read().unwrap().status(id)
    }

    pub fn statistics(&self) -> StreamStatistics {
        StreamStatistics {
            memory_in_use: self.table.read().unwrap().loaded_bytes(),
            max_memory: self.max_memory,
        }
    }
}
