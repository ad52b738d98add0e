//! Bookkeeping for every linked resource.
//!
//! The table itself is a plain map; `StreamManShared` wraps it in a
//! readers/writer lock so that status queries from any number of threads
//! proceed together, while structural mutations and status transitions
//! take exclusive access for the duration of the map/field mutation only.

use std::collections::HashMap;
use std::sync::Arc;

use inlinable_string::InlinableString;

use super::interval::IdSpan;
use super::location::ResourceLocation;

/// A process-wide unique handle of a streamable resource.
pub type ResourceId = u32;

/// Lifecycle of a linked resource, driven by the channel that owns the
/// in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceStatus {
    Unloaded,
    Buffering,
    Loading,
    Loaded,
    Unloading,
}

pub struct ResourceRecord {
    pub name: InlinableString,
    pub status: ResourceStatus,
    pub location: Arc<dyn ResourceLocation>,
    pub size: usize,
    pub owning_channel: Option<usize>,
}

#[derive(Default)]
pub struct ResourceTable {
    records: HashMap<ResourceId, ResourceRecord>,
}

impl ResourceTable {
    pub fn new() -> Self {
        ResourceTable {
            records: HashMap::new(),
        }
    }

    /// Inserts a record for `id`, capturing the byte length from the
    /// location. Fails if `id` is already occupied.
    pub fn link<T>(&mut self, id: ResourceId, name: T, location: Arc<dyn ResourceLocation>) -> bool
    where
        T: Into<InlinableString>,
    {
        if self.records.contains_key(&id) {
            return false;
        }

        let size = location.data_size();
        self.records.insert(
            id,
            ResourceRecord {
                name: name.into(),
                status: ResourceStatus::Unloaded,
                location: location,
                size: size,
                owning_channel: None,
            },
        );

        true
    }

    /// Removes the record for `id` if present. Does not synchronize with a
    /// channel that is mid-flight on the same identifier; the channel
    /// finishes its dispatch against its own clone of the location.
    pub fn unlink(&mut self, id: ResourceId) -> bool {
        self.records.remove(&id).is_some()
    }

    #[inline]
    pub fn get(&self, id: ResourceId) -> Option<&ResourceRecord> {
        self.records.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut ResourceRecord> {
        self.records.get_mut(&id)
    }

    pub fn status(&self, id: ResourceId) -> Option<ResourceStatus> {
        self.records.get(&id).map(|v| v.status)
    }

    /// Sum of the byte lengths of all resources currently resident.
    pub fn loaded_bytes(&self) -> usize {
        self.records
            .values()
            .filter(|v| v.status == ResourceStatus::Loaded)
            .map(|v| v.size)
            .sum()
    }

    /// Identifiers of every record falling inside `span`.
    pub fn ids_in(&self, span: &IdSpan) -> Vec<ResourceId> {
        self.records
            .keys()
            .cloned()
            .filter(|&id| span.contains(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::super::location::BytesLocation;
    use super::*;

    #[test]
    fn link_captures_size() {
        let mut table = ResourceTable::new();
        let location = Arc::new(BytesLocation::new(vec![0u8; 64]));

        assert!(table.link(1, "a", location.clone()));
        assert_eq!(table.get(1).unwrap().size, 64);
        assert_eq!(table.status(1), Some(ResourceStatus::Unloaded));

        // Second link on the occupied identifier leaves the record alone.
        assert!(!table.link(1, "b", Arc::new(BytesLocation::new(vec![0u8; 8]))));
        assert_eq!(table.get(1).unwrap().size, 64);
        assert_eq!(&*table.get(1).unwrap().name, "a");
    }

    #[test]
    fn unlink() {
        let mut table = ResourceTable::new();
        let location = Arc::new(BytesLocation::new(vec![0u8; 16]));

        assert!(table.link(7, "x", location));
        assert!(table.unlink(7));
        assert!(!table.unlink(7));
        assert_eq!(table.status(7), None);
    }

    #[test]
    fn loaded_bytes() {
        let mut table = ResourceTable::new();
        table.link(1, "a", Arc::new(BytesLocation::new(vec![0u8; 100])));
        table.link(2, "b", Arc::new(BytesLocation::new(vec![0u8; 200])));

        assert_eq!(table.loaded_bytes(), 0);

        table.get_mut(1).unwrap().status = ResourceStatus::Loaded;
        assert_eq!(table.loaded_bytes(), 100);

        table.get_mut(2).unwrap().status = ResourceStatus::Loaded;
        assert_eq!(table.loaded_bytes(), 300);

        table.get_mut(1).unwrap().status = ResourceStatus::Unloaded;
        assert_eq!(table.loaded_bytes(), 200);
    }

    #[test]
    fn ids_in_span() {
        let mut table = ResourceTable::new();
        for id in 100..105 {
            table.link(id, "r", Arc::new(BytesLocation::new(vec![0u8; 4])));
        }
        table.link(300, "r", Arc::new(BytesLocation::new(vec![0u8; 4])));

        let mut ids = table.ids_in(&IdSpan::new(100, 10));
        ids.sort();
        assert_eq!(ids, vec![100, 101, 102, 103, 104]);
    }
}
