//! Worker channels.
//!
//! A channel is one long-lived OS thread with a private FIFO of commands
//! and a private scratch buffer. Slow I/O on one channel never blocks
//! enqueueing onto another channel, and never blocks status readers; the
//! table lock is held only across map/field mutations.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, RwLock};
use std::thread;

use crate::errors::*;

use super::registry::TypeRegistry;
use super::table::{ResourceId, ResourceStatus, ResourceTable};
use super::StreamingTypeInterface;

pub enum Command {
    Load(ResourceId),
    Unload(ResourceId),
    Stop,
}

#[derive(Default)]
struct ChannelState {
    /// Commands enqueued but not yet picked up by the worker.
    pending: AtomicUsize,
    /// True while the worker is processing a dequeued command.
    busy: AtomicBool,
}

/// The enqueue-side handle of one worker channel.
pub struct Channel {
    chan: Mutex<mpsc::Sender<Command>>,
    state: Arc<ChannelState>,
}

impl Channel {
    /// Spawns the worker thread of channel `index`.
    pub fn spawn(
        index: usize,
        table: Arc<RwLock<ResourceTable>>,
        registry: Arc<RwLock<TypeRegistry>>,
    ) -> Result<(Channel, thread::JoinHandle<()>)> {
        let (tx, rx) = mpsc::channel();
        let state = Arc::new(ChannelState::default());

        let join = {
            let state = state.clone();
            thread::Builder::new()
                .name(format!("CHANNEL-{}", index))
                .spawn(move || {
                    let worker = Worker {
                        index: index,
                        state: state,
                        table: table,
                        registry: registry,
                        buf: Vec::new(),
                    };

                    worker.run(&rx);
                })?
        };

        let channel = Channel {
            chan: Mutex::new(tx),
            state: state,
        };

        Ok((channel, join))
    }

    pub fn enqueue(&self, cmd: Command) {
        self.state.pending.fetch_add(1, Ordering::SeqCst);

        if self.chan.lock().unwrap().send(cmd).is_err() {
            self.state.pending.fetch_sub(1, Ordering::SeqCst);
            warn!("Command dropped; the channel thread has terminated.");
        }
    }

    /// Asks the worker to exit once the commands queued ahead have drained.
    pub fn stop(&self) {
        let _ = self.chan.lock().unwrap().send(Command::Stop);
    }

    /// True when the channel has neither queued nor in-flight work.
    pub fn is_idle(&self) -> bool {
        self.state.pending.load(Ordering::SeqCst) == 0 && !self.state.busy.load(Ordering::SeqCst)
    }
}

struct Worker {
    index: usize,
    state: Arc<ChannelState>,
    table: Arc<RwLock<ResourceTable>>,
    registry: Arc<RwLock<TypeRegistry>>,
    buf: Vec<u8>,
}

impl Worker {
    fn run(mut self, chan: &mpsc::Receiver<Command>) {
        loop {
            // recv also returns Err once every sender is gone, which doubles
            // as a termination signal when the manager is torn down early.
            let cmd = match chan.recv() {
                Ok(v) => v,
                Err(_) => break,
            };

            let id = match cmd {
                Command::Load(id) | Command::Unload(id) => id,
                Command::Stop => break,
            };

            // `busy` is raised before `pending` drops so the barrier never
            // observes a command in neither counter.
            self.state.busy.store(true, Ordering::SeqCst);
            self.state.pending.fetch_sub(1, Ordering::SeqCst);

            match cmd {
                Command::Load(_) => self.load(id),
                Command::Unload(_) => self.unload(id),
                Command::Stop => unreachable!(),
            }

            self.state.busy.store(false, Ordering::SeqCst);
        }

        debug!("Channel {} terminated.", self.index);
    }

    fn load(&mut self, id: ResourceId) {
        // Accept only resources sitting at Unloaded; anything else means the
        // request raced another one and is dropped, best-effort.
        let (location, size, name) = {
            let mut table = self.table.write().unwrap();
            let record = match table.get_mut(id) {
                Some(v) => v,
                None => {
                    warn!("Channel {} dropped a load of unknown resource {}.", self.index, id);
                    return;
                }
            };

            if record.status != ResourceStatus::Unloaded {
                warn!(
                    "Channel {} dropped a load of resource {} ({:?}).",
                    self.index, id, record.status
                );

                if record.owning_channel == Some(self.index) {
                    record.owning_channel = None;
                }

                return;
            }

            record.status = ResourceStatus::Buffering;
            record.owning_channel = Some(self.index);
            (record.location.clone(), record.size, record.name.clone())
        };

        // Scratch grows to the largest resource seen and stays there.
        if self.buf.len() < size {
            self.buf.resize(size, 0);
        }

        // The fetch may block on I/O; no lock is held across it.
        if let Err(err) = location.fetch_data(&mut self.buf[..size]) {
            error!(
                "Channel {} failed to fetch resource {} '{}': {}.",
                self.index, id, name, err
            );
            self.settle(id, ResourceStatus::Unloaded);
            return;
        }

        self.transition(id, ResourceStatus::Loading);

        // The owning type is resolved at dispatch time; a span unregistered
        // while the fetch was in flight turns the load into a silent no-op.
        let resolved = self.resolve(id);
        let (interface, base) = match resolved {
            Some(v) => v,
            None => {
                warn!("No streaming type registered at resource {}.", id);
                self.settle(id, ResourceStatus::Unloaded);
                return;
            }
        };

        interface.load_resource(id - base, &self.buf[..size]);
        self.settle(id, ResourceStatus::Loaded);

        debug!(
            "Channel {} loaded resource {} '{}' ({} bytes).",
            self.index, id, name, size
        );
    }

    fn unload(&mut self, id: ResourceId) {
        {
            let mut table = self.table.write().unwrap();
            let record = match table.get_mut(id) {
                Some(v) => v,
                None => {
                    warn!("Channel {} dropped an unload of unknown resource {}.", self.index, id);
                    return;
                }
            };

            if record.status != ResourceStatus::Loaded {
                warn!(
                    "Channel {} dropped an unload of resource {} ({:?}).",
                    self.index, id, record.status
                );

                if record.owning_channel == Some(self.index) {
                    record.owning_channel = None;
                }

                return;
            }

            record.status = ResourceStatus::Unloading;
            record.owning_channel = Some(self.index);
        }

        let resolved = self.resolve(id);
        let (interface, base) = match resolved {
            Some(v) => v,
            None => {
                warn!("No streaming type registered at resource {}.", id);
                self.settle(id, ResourceStatus::Loaded);
                return;
            }
        };

        interface.unload_resource(id - base);
        self.settle(id, ResourceStatus::Unloaded);

        debug!("Channel {} unloaded resource {}.", self.index, id);
    }

    fn resolve(&self, id: ResourceId) -> Option<(Arc<dyn StreamingTypeInterface>, u32)> {
        self.registry
            .read()
            .unwrap()
            .type_at(id)
            .map(|v| (v.interface.clone(), v.span.base))
    }

    fn transition(&self, id: ResourceId, status: ResourceStatus) {
        let mut table = self.table.write().unwrap();
        if let Some(record) = table.get_mut(id) {
            record.status = status;
        }
    }

    /// Final transition of a request; releases the channel's claim unless a
    /// newer request has already been routed elsewhere.
    fn settle(&self, id: ResourceId, status: ResourceStatus) {
        let mut table = self.table.write().unwrap();
        if let Some(record) = table.get_mut(id) {
            record.status = status;
            if record.owning_channel == Some(self.index) {
                record.owning_channel = None;
            }
        }
    }
}
