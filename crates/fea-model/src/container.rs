//! Ordered, exclusively-owning entity collection.

use tracing::debug;

use crate::entity::DomainEntity;
use crate::error::{ModelError, Result};
use crate::ids::{EntityId, OwnerRef};

/// Members of one owner, kept in insertion order.
#[derive(Debug, Clone)]
pub struct Container<T> {
    members: Vec<T>,
}

impl<T> Default for Container<T> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
        }
    }
}

impl<T: DomainEntity> Container<T> {
    /// Empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True when the container has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.members.iter()
    }

    /// Member with identifier `id`.
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.members.iter().find(|m| m.id() == id)
    }

    /// True when `id` is a direct member.
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Member identifiers in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.members.iter().map(DomainEntity::id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.members.iter_mut().find(|m| m.id() == id)
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.members.iter_mut()
    }

    /// Attaches `entity` to `owner`. Entities that still belong to
    /// another container are refused rather than reparented.
    pub(crate) fn insert(&mut self, owner: OwnerRef, mut entity: T) -> Result<&mut T> {
        if let Some(current) = entity.owner() {
            return Err(ModelError::AlreadyOwned {
                kind: entity.kind(),
                id: entity.id(),
                owner: current,
            });
        }
        if self.contains(entity.id()) {
            return Err(ModelError::DuplicateIdentifier { id: entity.id() });
        }

        entity.data_mut().attach(owner);
        debug!(kind = %entity.kind(), id = %entity.id(), owner = %owner, "attached");
        let index = self.members.len();
        self.members.push(entity);
        Ok(&mut self.members[index])
    }

    /// Detaches the member `id` and clears its back-reference.
    pub(crate) fn take(&mut self, owner: OwnerRef, id: EntityId) -> Result<T> {
        let index = self
            .members
            .iter()
            .position(|m| m.id() == id)
            .ok_or(ModelError::NotOwned { id, container: owner })?;

        let mut entity = self.members.remove(index);
        entity.data_mut().detach();
        debug!(kind = %entity.kind(), id = %id, owner = %owner, "detached");
        Ok(entity)
    }

    /// Re-points every member at a new owner handle.
    pub(crate) fn rebind(&mut self, owner: OwnerRef) {
        for member in &mut self.members {
            member.data_mut().attach(owner);
        }
    }
}

impl<'a, T> IntoIterator for &'a Container<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}
