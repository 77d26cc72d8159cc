//! Per-world entity registry
//!
//! Entities are owned here and referenced by id. Additions and removals are
//! staged and applied by `update_lists` once per frame, before updates are
//! dispatched; the committed list and every tag list stay sorted by
//! `(update_order, id)`.

use glam::Mat4;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{Component, Entity, EntityId, WorldId};
use crate::core::FrameContext;
use crate::render::{RenderableList, RenderableRef, SortKey};

/// What a flush changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub added: usize,
    pub removed: usize,
}

impl FlushStats {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Entities of one world
#[derive(Debug, Default)]
pub struct EntityList {
    /// Every entity that is committed or staged
    storage: FxHashMap<EntityId, Entity>,
    /// Committed ids in update order
    entities: Vec<EntityId>,
    to_add: Vec<EntityId>,
    to_remove: Vec<EntityId>,
    unsorted: bool,
    /// Committed ids by tag, in update order
    tags: FxHashMap<i32, Vec<EntityId>>,
    unsorted_tags: FxHashSet<i32>,
    /// Entities that left without being destroyed, waiting to be taken
    detached: Vec<Entity>,
}

impl EntityList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an entity for addition.
    ///
    /// # Panics
    ///
    /// Panics if the entity is already contained or belongs to a world.
    pub fn add(&mut self, entity: Entity) {
        let id = entity.id();
        assert!(!self.contains(id), "Entity {id:?} is already in this world");
        assert!(
            entity.world().is_none(),
            "Entity {id:?} still belongs to another world"
        );
        self.storage.insert(id, entity);
        self.to_add.push(id);
    }

    /// Stage an entity for removal. Removing an entity that is only staged
    /// for addition cancels the addition.
    pub fn remove(&mut self, id: EntityId) {
        if self.to_remove.contains(&id) {
            log::warn!("Entity {id:?} is already pending removal");
            return;
        }
        if let Some(pos) = self.to_add.iter().position(|&e| e == id) {
            self.to_add.remove(pos);
            if let Some(mut entity) = self.storage.remove(&id) {
                if entity.is_destroyed() {
                    entity.components_mut().remove_all(id, None);
                } else {
                    self.detached.push(entity);
                }
            }
            return;
        }
        if !self.storage.contains_key(&id) {
            log::warn!("Removing entity {id:?} that is not in this world");
            return;
        }
        self.to_remove.push(id);
    }

    /// True if committed or staged for addition
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.storage.contains_key(&id)
    }

    #[must_use]
    pub fn is_pending_removal(&self, id: EntityId) -> bool {
        self.to_remove.contains(&id)
    }

    /// Apply staged removals and additions, then restore sort order
    pub fn update_lists(&mut self, world: WorldId, renderables: &mut RenderableList) -> FlushStats {
        let mut stats = FlushStats::default();

        for id in std::mem::take(&mut self.to_remove) {
            let Some(mut entity) = self.storage.remove(&id) else {
                continue;
            };
            if let Some(list) = self.tags.get_mut(&entity.tag()) {
                list.retain(|&e| e != id);
            }
            self.entities.retain(|&e| e != id);
            entity.on_removed_from_scene(renderables);
            entity.set_world(None);
            if !entity.is_destroyed() {
                self.detached.push(entity);
            }
            stats.removed += 1;
        }

        let added = std::mem::take(&mut self.to_add);
        for &id in &added {
            let Some(entity) = self.storage.get_mut(&id) else {
                continue;
            };
            entity.set_world(Some(world));
            let tag = entity.tag();
            self.entities.push(id);
            self.tags.entry(tag).or_default().push(id);
            self.unsorted_tags.insert(tag);
            self.unsorted = true;
        }
        // Every addition is committed before any is notified
        for &id in &added {
            if let Some(entity) = self.storage.get_mut(&id) {
                entity.on_added_to_scene(renderables);
            }
        }
        stats.added = added.len();

        let storage = &self.storage;
        if self.unsorted {
            self.entities.sort_by_key(|id| storage.get(id).map(Entity::sort_key));
            self.unsorted = false;
        }
        for tag in self.unsorted_tags.drain() {
            if let Some(list) = self.tags.get_mut(&tag) {
                list.sort_by_key(|id| storage.get(id).map(Entity::sort_key));
            }
        }

        if stats.changed() {
            log::debug!(
                "Entity flush: {} added, {} removed, {} live",
                stats.added,
                stats.removed,
                self.entities.len()
            );
        }
        stats
    }

    /// Dispatch updates to enabled committed entities on their interval
    pub fn update(&mut self, frame: &mut FrameContext, renderables: &mut RenderableList) {
        let frame_count = frame.time.frame_count();
        for i in 0..self.entities.len() {
            let id = self.entities[i];
            let world_matrix = self.world_matrix(id);
            let Some(entity) = self.storage.get_mut(&id) else {
                continue;
            };
            let interval = u64::from(entity.update_interval());
            if entity.enabled() && (interval == 1 || frame_count % interval == 0) {
                entity.update(world_matrix, frame, renderables);
            }
        }
    }

    /// Compose local matrices up the parent chain
    #[must_use]
    pub fn world_matrix(&self, id: EntityId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node) = current {
            let Some(entity) = self.storage.get(&node) else {
                break;
            };
            matrix = entity.transform().local_matrix() * matrix;
            current = entity.transform().parent();
        }
        matrix
    }

    /// Change a tag, keeping the index consistent
    pub fn set_tag(&mut self, id: EntityId, tag: i32) {
        let committed = self.entities.contains(&id);
        let Some(entity) = self.storage.get_mut(&id) else {
            log::warn!("Tagging entity {id:?} that is not in this world");
            return;
        };
        let old = entity.tag();
        if old == tag {
            return;
        }
        entity.set_tag_unchecked(tag);
        if committed {
            if let Some(list) = self.tags.get_mut(&old) {
                list.retain(|&e| e != id);
            }
            self.tags.entry(tag).or_default().push(id);
            self.unsorted_tags.insert(tag);
        }
    }

    /// Change an update order; lists re-sort at the next flush
    pub fn set_update_order(&mut self, id: EntityId, update_order: i32) {
        let Some(entity) = self.storage.get_mut(&id) else {
            log::warn!("Reordering entity {id:?} that is not in this world");
            return;
        };
        if entity.update_order() == update_order {
            return;
        }
        entity.set_update_order_unchecked(update_order);
        self.unsorted = true;
        self.unsorted_tags.insert(entity.tag());
    }

    /// Drop every entity immediately. Staged entities are discarded, committed
    /// ones are destroyed and leave the scene.
    pub fn remove_all_entities(&mut self, renderables: &mut RenderableList) {
        for id in std::mem::take(&mut self.to_add) {
            if let Some(mut entity) = self.storage.remove(&id) {
                entity.mark_destroyed();
                entity.components_mut().remove_all(id, None);
            }
        }
        self.to_remove.clear();
        for id in std::mem::take(&mut self.entities) {
            if let Some(mut entity) = self.storage.remove(&id) {
                entity.mark_destroyed();
                entity.on_removed_from_scene(renderables);
                entity.set_world(None);
            }
        }
        self.storage.clear();
        self.tags.clear();
        self.unsorted_tags.clear();
        self.unsorted = false;
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.storage.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.storage.get_mut(&id)
    }

    /// Committed ids in update order
    #[must_use]
    pub fn ids(&self) -> &[EntityId] {
        &self.entities
    }

    /// Committed entities in update order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter_map(|id| self.storage.get(id))
    }

    /// Committed entities, then staged ones
    fn iter_all(&self) -> impl Iterator<Item = &Entity> {
        self.entities
            .iter()
            .chain(&self.to_add)
            .filter_map(|id| self.storage.get(id))
    }

    /// First entity with `name`, committed before staged
    #[must_use]
    pub fn find_entity(&self, name: &str) -> Option<EntityId> {
        self.iter_all().find(|e| e.name() == name).map(Entity::id)
    }

    /// Snapshot of the committed entities with `tag`
    #[must_use]
    pub fn entities_with_tag(&self, tag: i32) -> Vec<EntityId> {
        self.tags.get(&tag).cloned().unwrap_or_default()
    }

    /// First component of type `T` on an enabled entity
    #[must_use]
    pub fn find_component<T: Component>(&self) -> Option<&T> {
        self.iter_all()
            .filter(|e| e.enabled())
            .find_map(|e| e.components().get::<T>(false))
    }

    /// Every component of type `T` on enabled entities
    #[must_use]
    pub fn find_components<T: Component>(&self) -> Vec<&T> {
        self.iter_all()
            .filter(|e| e.enabled())
            .flat_map(|e| e.components().get_all::<T>())
            .collect()
    }

    /// Current sort keys of a registered renderable
    #[must_use]
    pub fn renderable_key(&self, renderable: RenderableRef) -> Option<SortKey> {
        let component = self
            .storage
            .get(&renderable.entity)?
            .components()
            .get_by_id(renderable.component)?;
        component.as_renderable().map(SortKey::of)
    }

    /// Take entities that left this world without being destroyed
    pub fn take_detached(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.detached)
    }

    /// Committed entities
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities staged for addition
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.to_add.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flush(list: &mut EntityList, world: WorldId, renderables: &mut RenderableList) -> FlushStats {
        list.update_lists(world, renderables)
    }

    struct Fixture {
        list: EntityList,
        world: WorldId,
        renderables: RenderableList,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                list: EntityList::new(),
                world: WorldId::next(),
                renderables: RenderableList::new(),
            }
        }

        fn add(&mut self, entity: Entity) -> EntityId {
            let id = entity.id();
            self.list.add(entity);
            id
        }

        fn flush(&mut self) -> FlushStats {
            flush(&mut self.list, self.world, &mut self.renderables)
        }

        fn remove(&mut self, id: EntityId) {
            self.list.remove(id);
        }
    }

    #[test]
    fn test_add_is_deferred() {
        let mut f = Fixture::new();
        let id = f.add(Entity::new("a"));

        assert!(f.list.contains(id));
        assert!(f.list.ids().is_empty());
        assert!(f.list.get(id).unwrap().world().is_none());

        let stats = f.flush();
        assert_eq!(stats, FlushStats { added: 1, removed: 0 });
        assert_eq!(f.list.ids(), &[id]);
        assert_eq!(f.list.get(id).unwrap().world(), Some(f.world));
    }

    #[test]
    fn test_add_then_remove_cancels() {
        let mut f = Fixture::new();
        let kept = f.add(Entity::new("kept").with_tag(2));
        f.flush();

        let id = f.add(Entity::new("a").with_tag(2));
        f.remove(id);
        assert!(!f.list.contains(id));

        let stats = f.flush();
        assert!(!stats.changed());
        assert_eq!(f.list.ids(), &[kept]);
        assert_eq!(f.list.entities_with_tag(2), vec![kept]);
        assert_eq!(f.list.find_entity("a"), None);

        // A cancelled, non-destroyed entity is handed back
        let detached = f.list.take_detached();
        assert_eq!(detached.len(), 1);
        assert_eq!(detached[0].id(), id);
    }

    #[test]
    fn test_remove_is_deferred() {
        let mut f = Fixture::new();
        let id = f.add(Entity::new("a"));
        f.flush();

        f.remove(id);
        f.remove(id);
        assert_eq!(f.list.ids(), &[id], "Still committed until the flush");
        assert!(f.list.is_pending_removal(id));

        let stats = f.flush();
        assert_eq!(stats.removed, 1);
        assert!(f.list.is_empty());
        assert!(!f.list.contains(id));
    }

    #[test]
    fn test_stable_order_after_churn() {
        let mut f = Fixture::new();
        let a = f.add(Entity::new("a").with_update_order(1));
        let b = f.add(Entity::new("b").with_update_order(0));
        let c = f.add(Entity::new("c").with_update_order(1));
        f.flush();
        assert_eq!(f.list.ids(), &[b, a, c]);

        let d = f.add(Entity::new("d").with_update_order(1));
        f.remove(a);
        f.flush();
        assert_eq!(f.list.ids(), &[b, c, d]);

        f.list.set_update_order(b, 1);
        f.flush();
        assert_eq!(f.list.ids(), &[b, c, d], "Equal orders fall back to id");

        f.list.set_update_order(c, -1);
        f.flush();
        assert_eq!(f.list.ids(), &[c, b, d]);
    }

    #[test]
    fn test_tag_index_consistency() {
        let mut f = Fixture::new();
        let a = f.add(Entity::new("a").with_tag(1));
        let b = f.add(Entity::new("b").with_tag(2));
        let c = f.add(Entity::new("c").with_tag(1).with_update_order(-5));
        f.flush();
        assert_eq!(f.list.entities_with_tag(1), vec![c, a]);

        f.list.set_tag(a, 2);
        f.remove(c);
        let d = f.add(Entity::new("d").with_tag(1));
        // Retagging a staged entity only changes the entity
        f.list.set_tag(d, 3);
        f.flush();

        for tag in 0..4 {
            let mut expected: Vec<_> = f
                .list
                .iter()
                .filter(|e| e.tag() == tag)
                .map(Entity::id)
                .collect();
            expected.sort();
            let mut indexed = f.list.entities_with_tag(tag);
            indexed.sort();
            assert_eq!(indexed, expected, "tag {tag}");
        }
        assert_eq!(f.list.entities_with_tag(2), vec![a, b]);
        assert!(f.list.entities_with_tag(9).is_empty());
    }

    #[test]
    fn test_find_by_name_prefers_committed() {
        let mut f = Fixture::new();
        let first = f.add(Entity::new("twin"));
        f.flush();
        let second = f.add(Entity::new("twin"));

        assert_eq!(f.list.find_entity("twin"), Some(first));
        f.remove(first);
        f.flush();
        assert_eq!(f.list.find_entity("twin"), Some(second));
    }

    #[test]
    fn test_destroyed_removal_is_not_detached() {
        let mut f = Fixture::new();
        let id = f.add(Entity::new("a"));
        f.flush();

        f.list.get_mut(id).unwrap().mark_destroyed();
        f.remove(id);
        f.flush();
        assert!(f.list.take_detached().is_empty());
    }

    #[test]
    fn test_remove_all_entities() {
        let mut f = Fixture::new();
        f.add(Entity::new("a").with_tag(1));
        f.flush();
        f.add(Entity::new("b"));

        f.list.remove_all_entities(&mut f.renderables);
        assert!(f.list.is_empty());
        assert_eq!(f.list.pending_count(), 0);
        assert!(f.list.entities_with_tag(1).is_empty());
        assert!(f.list.take_detached().is_empty());
    }
}
