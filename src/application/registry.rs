//! Dense id → node handle index, populated once at startup.

use generational_arena::Index;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DomainError, NodeId};

/// Maps every declared id in `[0, N)` to its node handle.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    slots: Vec<Option<Index>>,
}

impl NodeRegistry {
    /// Registry for ids `0..count`, all undeclared.
    pub fn with_capacity(count: usize) -> ApplicationResult<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(count)
            .map_err(|e| DomainError::ResourceExhausted(format!("node registry of {count}: {e}")))?;
        slots.resize(count, None);
        Ok(Self { slots })
    }

    /// Size of the id space.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        self.position(id).is_some()
    }

    /// Records the handle of a freshly declared node.
    pub fn declare(&mut self, id: NodeId, idx: Index) -> ApplicationResult<()> {
        let pos = self.checked_position(id)?;
        if self.slots[pos].is_some() {
            return Err(ApplicationError::DuplicateId(id));
        }
        self.slots[pos] = Some(idx);
        Ok(())
    }

    /// Handle bound to `id`. The node may have been removed since.
    pub fn get(&self, id: NodeId) -> ApplicationResult<Index> {
        let pos = self.checked_position(id)?;
        self.slots[pos].ok_or(ApplicationError::Domain(DomainError::UnknownNode(id)))
    }

    /// Points `id` at another handle, e.g. after payloads moved between slots.
    pub fn rebind(&mut self, id: NodeId, idx: Index) -> ApplicationResult<()> {
        let pos = self.checked_position(id)?;
        self.slots[pos] = Some(idx);
        Ok(())
    }

    fn position(&self, id: NodeId) -> Option<usize> {
        usize::try_from(id).ok().filter(|&pos| pos < self.slots.len())
    }

    fn checked_position(&self, id: NodeId) -> ApplicationResult<usize> {
        self.position(id).ok_or(ApplicationError::IdOutOfRange {
            id,
            count: self.slots.len(),
        })
    }
}
