use std::collections::HashMap;

use crate::{EntityId, RemoteEntity};

/// Every remote participant this process currently knows about, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct RemoteEntities {
    entities: HashMap<EntityId, RemoteEntity>,
}

impl RemoteEntities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the id is already present. Returns `true` if inserted.
    /// An existing entry is never replaced, so its color stays the first one seen.
    pub fn insert_if_absent(&mut self, entity: RemoteEntity) -> bool {
        if self.entities.contains_key(entity.id()) {
            return false;
        }
        self.entities.insert(entity.id().clone(), entity);
        true
    }

    pub fn get(&self, id: &EntityId) -> Option<&RemoteEntity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut RemoteEntity> {
        self.entities.get_mut(id)
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<RemoteEntity> {
        self.entities.remove(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteEntity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RemoteEntity> {
        self.entities.values_mut()
    }

    /// Ids in sorted order, handy for stable log output.
    pub fn ids(&self) -> Vec<&EntityId> {
        let mut ids: Vec<_> = self.entities.keys().collect();
        ids.sort();
        ids
    }
}
