//! Columnar component storage.
//!
//! Per the design notes (spec §9 "Archetype columns and SoA views"), storage is a flat
//! column indexed by entity slot, not a hash map — so iteration order is always
//! ascending entity index, never hash-table insertion order (spec §5 O4).

use super::entity::Entity;

/// A single component column: one slot per entity index, tagged with the generation
/// that wrote it so stale reads after despawn/respawn are rejected.
pub struct ComponentStorage<T> {
    entries: Vec<Option<(u8, T)>>,
}

impl<T> Default for ComponentStorage<T> {
    fn default() -> Self {
        ComponentStorage { entries: Vec::new() }
    }
}

impl<T> ComponentStorage<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        let index = entity.index() as usize;
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, || None);
        }
        let prev = self.entries[index].take();
        self.entries[index] = Some((entity.generation(), value));
        prev.map(|(_, v)| v)
    }

    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let index = entity.index() as usize;
        match self.entries.get_mut(index) {
            Some(slot) if slot.as_ref().map(|(g, _)| *g) == Some(entity.generation()) => {
                slot.take().map(|(_, v)| v)
            }
            _ => None,
        }
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.entries
            .get(entity.index() as usize)
            .and_then(|slot| slot.as_ref())
            .filter(|(g, _)| *g == entity.generation())
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let generation = entity.generation();
        self.entries
            .get_mut(entity.index() as usize)
            .and_then(|slot| slot.as_mut())
            .filter(|(g, _)| *g == generation)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    /// Iterate in ascending entity-index order — the only order this storage ever
    /// produces.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entries.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|(gen, value)| (Entity::new(index as u32, *gen), value))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entries.iter_mut().enumerate().filter_map(|(index, slot)| {
            slot.as_mut()
                .map(|(gen, value)| (Entity::new(index as u32, *gen), value))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::entity::EntityAllocator;

    #[test]
    fn insert_get_remove_roundtrip() {
        let mut alloc = EntityAllocator::new();
        let mut storage: ComponentStorage<i32> = ComponentStorage::new();
        let a = alloc.spawn();
        let b = alloc.spawn();
        storage.insert(a, 1);
        storage.insert(b, 2);
        assert_eq!(storage.get(a), Some(&1));
        assert_eq!(storage.get(b), Some(&2));
        assert_eq!(storage.remove(a), Some(1));
        assert_eq!(storage.get(a), None);
    }

    #[test]
    fn stale_generation_is_invisible() {
        let mut alloc = EntityAllocator::new();
        let mut storage: ComponentStorage<i32> = ComponentStorage::new();
        let a = alloc.spawn();
        storage.insert(a, 42);
        alloc.despawn(a);
        let b = alloc.spawn();
        assert_eq!(a.index(), b.index());
        assert_eq!(storage.get(a), None, "stale handle must not see new occupant's slot");
        assert_eq!(storage.get(b), None, "new occupant has no component yet");
    }

    #[test]
    fn iteration_order_is_ascending_index() {
        let mut alloc = EntityAllocator::new();
        let mut storage: ComponentStorage<i32> = ComponentStorage::new();
        let entities: Vec<_> = (0..5).map(|_| alloc.spawn()).collect();
        for e in entities.iter().rev() {
            storage.insert(*e, e.index() as i32);
        }
        let indices: Vec<_> = storage.iter().map(|(e, _)| e.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }
}
