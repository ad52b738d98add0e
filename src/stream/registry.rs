//! Registry of identifier spans, each bound to one streaming type.

use std::sync::Arc;

use smallvec::SmallVec;

use super::interval::IdSpan;
use super::table::ResourceId;
use super::StreamingTypeInterface;

pub struct TypeRecord {
    pub span: IdSpan,
    pub interface: Arc<dyn StreamingTypeInterface>,
}

/// Maps disjoint identifier spans to the subsystems that decode them.
#[derive(Default)]
pub struct TypeRegistry {
    types: SmallVec<[TypeRecord; 8]>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry {
            types: SmallVec::new(),
        }
    }

    /// Binds `[base, base + count)` to `interface`. The new span must float
    /// completely apart from every registered span; any overlap, border
    /// touches included, fails the call with nothing mutated.
    pub fn register(
        &mut self,
        base: u32,
        count: u32,
        interface: Arc<dyn StreamingTypeInterface>,
    ) -> bool {
        let span = IdSpan::new(base, count);
        if self.types.iter().any(|v| !span.is_disjoint(&v.span)) {
            return false;
        }

        self.types.push(TypeRecord {
            span: span,
            interface: interface,
        });

        true
    }

    /// Removes the registration whose span starts at `base`, handing the
    /// record back so the caller can cascade over the vacated span.
    pub fn unregister(&mut self, base: u32) -> Option<TypeRecord> {
        self.types
            .iter()
            .position(|v| v.span.base == base)
            .map(|index| self.types.remove(index))
    }

    /// Resolves `id` to its owning registration.
    pub fn type_at(&self, id: ResourceId) -> Option<&TypeRecord> {
        self.types.iter().find(|v| v.span.contains(id))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }
}
