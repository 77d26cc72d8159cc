//! Scene graph world
//!
//! Owns the entity registry and the renderable list and runs the per-frame
//! protocol: flush staged entity changes, dispatch updates, apply queued
//! commands, then flush the renderable list for the next render.

use glam::{Mat4, Quat, Vec3};
use smallvec::SmallVec;

use super::{Command, Component, Entity, EntityId, EntityList, Transform, WorldId};
use crate::core::{EventQueue, FrameContext, SceneEvent};
use crate::render::{RenderBackend, RenderFrame, RenderableList};

type ChildIds = SmallVec<[EntityId; 8]>;

/// A scene: entities, their hierarchy and what they render
#[derive(Debug)]
pub struct World {
    id: WorldId,
    entities: EntityList,
    renderables: RenderableList,
    events: EventQueue,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: WorldId::next(),
            entities: EntityList::new(),
            renderables: RenderableList::new(),
            events: EventQueue::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> WorldId {
        self.id
    }

    // -------------------------------------------------------------------------
    // Frame protocol
    // -------------------------------------------------------------------------

    /// Run one frame
    pub fn update(&mut self, frame: &mut FrameContext) {
        self.events.swap();
        self.flush_entities();
        self.entities.update(frame, &mut self.renderables);
        self.apply_commands(frame);
        self.flush_renderables();
    }

    /// Commit staged changes without updating
    pub fn flush(&mut self) {
        self.flush_entities();
        self.flush_renderables();
    }

    fn flush_entities(&mut self) {
        let stats = self.entities.update_lists(self.id, &mut self.renderables);
        if stats.changed() {
            self.events.push(SceneEvent::EntitiesChanged {
                added: stats.added,
                removed: stats.removed,
            });
        }
    }

    fn flush_renderables(&mut self) {
        let entities = &self.entities;
        self.renderables
            .update_lists(|renderable| entities.renderable_key(renderable));
    }

    fn apply_commands(&mut self, frame: &mut FrameContext) {
        let commands: Vec<Command> = frame.commands.drain().collect();
        for command in commands {
            match command {
                Command::Spawn(entity) => self.add_entity(entity),
                Command::Destroy(id) => self.destroy_entity(id),
                Command::Detach(id) => self.detach_entity(id),
            }
        }
    }

    /// Draw every enabled renderable in draw order
    pub fn render(&mut self, frame: &FrameContext, backend: &mut dyn RenderBackend) {
        let order = self.renderables.as_slice().to_vec();
        for renderable in order {
            let world_matrix = self.entities.world_matrix(renderable.entity);
            let Some(entity) = self.entities.get_mut(renderable.entity) else {
                continue;
            };
            if !entity.enabled() || !entity.components().is_enabled(renderable.component) {
                continue;
            }
            let Some(target) = entity
                .components_mut()
                .get_by_id_mut(renderable.component)
                .and_then(|c| c.as_renderable_mut())
            else {
                continue;
            };
            let render_frame = RenderFrame {
                entity: renderable.entity,
                world_matrix,
                camera: frame.camera.as_ref(),
                lights: &frame.lights,
            };
            target.render(&render_frame, backend);
        }
    }

    // -------------------------------------------------------------------------
    // Membership
    // -------------------------------------------------------------------------

    /// Stage an entity; it joins the world at the next flush
    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.add(entity);
    }

    /// Stage several entities, e.g. ones taken from another world
    pub fn attach_entities(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            self.add_entity(entity);
        }
    }

    /// Stage a removal without destroying
    pub fn remove_entity(&mut self, id: EntityId) {
        self.entities.remove(id);
    }

    /// Destroy an entity and, depth first from the last child, its
    /// descendants. Components are dropped when the removal is flushed.
    pub fn destroy_entity(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get_mut(id) else {
            log::warn!("Destroying entity {id:?} that is not in this world");
            return;
        };
        if entity.is_destroyed() {
            return;
        }
        entity.mark_destroyed();
        let children = ChildIds::from_slice(entity.transform().children());

        self.unparent(id);
        self.entities.remove(id);
        for &child in children.iter().rev() {
            self.destroy_entity(child);
        }
        self.events.push(SceneEvent::EntityDestroyed { entity: id });
    }

    /// Pull an entity and its descendants out of the world, keeping their
    /// components. Take them with [`World::take_detached`] after a flush.
    pub fn detach_entity(&mut self, id: EntityId) {
        if !self.entities.contains(id) {
            log::warn!("Detaching entity {id:?} that is not in this world");
            return;
        }
        if self.entities.is_pending_removal(id) {
            log::warn!("Entity {id:?} is already leaving this world");
            return;
        }
        self.unparent(id);
        self.detach_subtree(id);
    }

    fn detach_subtree(&mut self, id: EntityId) {
        let children = self
            .entities
            .get(id)
            .map(|e| ChildIds::from_slice(e.transform().children()))
            .unwrap_or_default();
        self.entities.remove(id);
        for child in children {
            self.detach_subtree(child);
        }
        self.events.push(SceneEvent::EntityDetached { entity: id });
    }

    /// Entities that left without being destroyed since the last call
    pub fn take_detached(&mut self) -> Vec<Entity> {
        self.entities.take_detached()
    }

    /// Destroy every committed entity; takes effect at the next flush
    pub fn destroy_all_entities(&mut self) {
        let ids = self.entities.ids().to_vec();
        for id in ids {
            self.destroy_entity(id);
        }
    }

    /// Drop every entity immediately
    pub fn remove_all_entities(&mut self) {
        self.entities.remove_all_entities(&mut self.renderables);
        self.renderables.clear();
    }

    // -------------------------------------------------------------------------
    // Hierarchy and transforms
    // -------------------------------------------------------------------------

    /// Re-parent `child`; `None` makes it a root.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is `child` or one of its descendants.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) {
        if !self.entities.contains(child) {
            log::warn!("Parenting entity {child:?} that is not in this world");
            return;
        }
        if let Some(parent) = parent {
            if !self.entities.contains(parent) {
                log::warn!("Parent {parent:?} is not in this world");
                return;
            }
            let mut ancestor = Some(parent);
            while let Some(node) = ancestor {
                assert!(node != child, "Parenting {child:?} under {parent:?} creates a cycle");
                ancestor = self.entities.get(node).and_then(|e| e.transform().parent());
            }
        }

        self.unparent(child);
        if let Some(parent) = parent {
            if let Some(entity) = self.entities.get_mut(parent) {
                entity.transform_mut().add_child(child);
            }
            if let Some(entity) = self.entities.get_mut(child) {
                entity.transform_mut().set_parent(Some(parent));
            }
        }
        self.mark_subtree_changed(child);
    }

    fn unparent(&mut self, child: EntityId) {
        let Some(parent) = self.entities.get(child).and_then(|e| e.transform().parent()) else {
            return;
        };
        if let Some(entity) = self.entities.get_mut(parent) {
            entity.transform_mut().remove_child(child);
        }
        if let Some(entity) = self.entities.get_mut(child) {
            entity.transform_mut().set_parent(None);
        }
    }

    #[must_use]
    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.entities.get(id)?.transform().parent()
    }

    #[must_use]
    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.entities
            .get(id)
            .map(|e| e.transform().children())
            .unwrap_or(&[])
    }

    /// Local matrices composed up the parent chain
    #[must_use]
    pub fn world_matrix(&self, id: EntityId) -> Mat4 {
        self.entities.world_matrix(id)
    }

    /// Mutate a local transform; descendants are notified as well
    pub fn modify_transform(&mut self, id: EntityId, f: impl FnOnce(&mut Transform)) {
        let Some(entity) = self.entities.get_mut(id) else {
            log::warn!("Moving entity {id:?} that is not in this world");
            return;
        };
        f(entity.transform_mut());
        self.mark_subtree_changed(id);
    }

    pub fn set_position(&mut self, id: EntityId, position: Vec3) {
        self.modify_transform(id, |t| t.set_position(position));
    }

    pub fn set_rotation(&mut self, id: EntityId, rotation: Quat) {
        self.modify_transform(id, |t| t.set_rotation(rotation));
    }

    pub fn set_scale(&mut self, id: EntityId, scale: Vec3) {
        self.modify_transform(id, |t| t.set_scale(scale));
    }

    fn mark_subtree_changed(&mut self, id: EntityId) {
        let mut stack: ChildIds = SmallVec::new();
        stack.push(id);
        while let Some(node) = stack.pop() {
            if let Some(entity) = self.entities.get_mut(node) {
                entity.transform_mut().mark_changed();
                stack.extend_from_slice(entity.transform().children());
            }
        }
    }

    // -------------------------------------------------------------------------
    // Registry-aware setters
    // -------------------------------------------------------------------------

    pub fn set_tag(&mut self, id: EntityId, tag: i32) {
        self.entities.set_tag(id, tag);
    }

    pub fn set_update_order(&mut self, id: EntityId, update_order: i32) {
        self.entities.set_update_order(id, update_order);
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains(id)
    }

    #[must_use]
    pub fn entities(&self) -> &EntityList {
        &self.entities
    }

    #[must_use]
    pub fn find_entity(&self, name: &str) -> Option<EntityId> {
        self.entities.find_entity(name)
    }

    #[must_use]
    pub fn entities_with_tag(&self, tag: i32) -> Vec<EntityId> {
        self.entities.entities_with_tag(tag)
    }

    #[must_use]
    pub fn find_component<T: Component>(&self) -> Option<&T> {
        self.entities.find_component::<T>()
    }

    #[must_use]
    pub fn find_components<T: Component>(&self) -> Vec<&T> {
        self.entities.find_components::<T>()
    }

    #[must_use]
    pub fn renderables(&self) -> &RenderableList {
        &self.renderables
    }

    /// Events raised during the previous frame
    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ecs::ComponentContext;
    use crate::render::{DrawCall, MaterialId, RenderSettings, Renderable, ResourceId};

    type Log = Rc<RefCell<Vec<(EntityId, &'static str)>>>;

    /// Records lifecycle events and updates
    struct Recorder {
        log: Log,
    }

    impl Recorder {
        fn new(log: &Log) -> Self {
            Self { log: Rc::clone(log) }
        }
    }

    impl Component for Recorder {
        fn kind(&self) -> &'static str {
            "recorder"
        }

        fn on_registered(&mut self, entity: EntityId) {
            self.log.borrow_mut().push((entity, "registered"));
        }

        fn on_deregistered(&mut self, entity: EntityId) {
            self.log.borrow_mut().push((entity, "deregistered"));
        }

        fn on_removed_from_entity(&mut self, entity: EntityId) {
            self.log.borrow_mut().push((entity, "removed"));
        }

        fn update(&mut self, ctx: &mut ComponentContext<'_>) {
            self.log.borrow_mut().push((ctx.entity, "update"));
        }
    }

    /// Counts transform notifications
    #[derive(Default)]
    struct MoveCounter(u32);

    impl Component for MoveCounter {
        fn kind(&self) -> &'static str {
            "move-counter"
        }

        fn on_entity_transform_changed(&mut self, _transform: &Transform) {
            self.0 += 1;
        }
    }

    /// Spawns one child entity on its first update
    struct Spawner {
        done: bool,
    }

    impl Component for Spawner {
        fn kind(&self) -> &'static str {
            "spawner"
        }

        fn update(&mut self, ctx: &mut ComponentContext<'_>) {
            if !self.done {
                ctx.frame.commands.spawn(Entity::new("spawned"));
                self.done = true;
            }
        }
    }

    struct Sprite {
        settings: RenderSettings,
        mesh: ResourceId,
    }

    impl Sprite {
        fn new(render_layer: i32) -> Self {
            Self {
                settings: RenderSettings::new().with_render_layer(render_layer),
                mesh: ResourceId::next(),
            }
        }
    }

    impl Renderable for Sprite {
        fn render_layer(&self) -> i32 {
            self.settings.render_layer()
        }

        fn layer_depth(&self) -> f32 {
            self.settings.layer_depth()
        }

        fn material(&self) -> Option<MaterialId> {
            self.settings.material()
        }

        fn render(&mut self, frame: &RenderFrame<'_>, backend: &mut dyn RenderBackend) {
            backend.draw(&DrawCall {
                mesh: self.mesh,
                index_count: 6,
                world_matrix: frame.world_matrix,
                material: self.settings.material(),
                textures: &[],
                lights: frame.lights,
            });
        }
    }

    impl Component for Sprite {
        fn kind(&self) -> &'static str {
            "sprite"
        }

        fn as_renderable(&self) -> Option<&dyn Renderable> {
            Some(self)
        }

        fn as_renderable_mut(&mut self) -> Option<&mut dyn Renderable> {
            Some(self)
        }
    }

    #[derive(Default)]
    struct RecordingBackend {
        draws: Vec<(ResourceId, Mat4)>,
    }

    impl RenderBackend for RecordingBackend {
        fn upload_mesh(&mut self, _mesh: ResourceId, _vertices: &[u8], _indices: &[u8]) {}

        fn upload_texture(&mut self, _texture: ResourceId, _w: u32, _h: u32, _texels: &[u8]) {}

        fn draw(&mut self, call: &DrawCall<'_>) {
            self.draws.push((call.mesh, call.world_matrix));
        }
    }

    fn count(log: &Log, entity: EntityId, event: &str) -> usize {
        log.borrow()
            .iter()
            .filter(|(e, name)| *e == entity && *name == event)
            .count()
    }

    /// A root with two children per level, each level hanging off the
    /// previous level's first child
    fn family(world: &mut World, depth: usize) -> Vec<EntityId> {
        let root = Entity::new("root");
        let mut ids = vec![root.id()];
        world.add_entity(root);
        let mut parent = ids[0];
        for level in 0..depth {
            let a = Entity::new(format!("a{level}"));
            let b = Entity::new(format!("b{level}"));
            let (a_id, b_id) = (a.id(), b.id());
            world.add_entity(a);
            world.add_entity(b);
            world.set_parent(a_id, Some(parent));
            world.set_parent(b_id, Some(parent));
            ids.push(a_id);
            ids.push(b_id);
            parent = a_id;
        }
        ids
    }

    #[test]
    fn test_end_to_end_frame_order() {
        let log = Log::default();
        let mut world = World::new();

        let mut ids = Vec::new();
        for order in [2, 1, 1] {
            let mut entity = Entity::new("e").with_update_order(order);
            entity.add_component(Recorder::new(&log));
            ids.push(entity.id());
            world.add_entity(entity);
        }

        world.flush();
        let mut frame = FrameContext::new();
        world.update(&mut frame);

        let updates: Vec<_> = log
            .borrow()
            .iter()
            .filter(|(_, name)| *name == "update")
            .map(|(e, _)| *e)
            .collect();
        assert_eq!(updates, vec![ids[1], ids[2], ids[0]]);
    }

    #[test]
    fn test_destroy_cascades_to_descendants() {
        let mut world = World::new();
        let ids = family(&mut world, 3);
        let outsider = Entity::new("outsider");
        let outsider_id = outsider.id();
        world.add_entity(outsider);
        world.flush();
        assert_eq!(world.entities().len(), ids.len() + 1);

        world.destroy_entity(ids[0]);
        for &id in &ids {
            assert!(world.entity(id).unwrap().is_destroyed());
        }
        assert!(!world.entity(outsider_id).unwrap().is_destroyed());

        world.flush();
        for &id in &ids {
            assert!(!world.contains(id));
        }
        assert_eq!(world.entities().ids(), &[outsider_id]);
        assert!(world.take_detached().is_empty());
    }

    #[test]
    fn test_destroy_removes_components() {
        let log = Log::default();
        let mut world = World::new();
        let mut entity = Entity::new("e");
        entity.add_component(Recorder::new(&log));
        let id = entity.id();
        world.add_entity(entity);
        world.flush();

        world.destroy_entity(id);
        world.destroy_entity(id);
        world.flush();
        assert_eq!(count(&log, id, "deregistered"), 1);
        assert_eq!(count(&log, id, "removed"), 1);
    }

    #[test]
    fn test_destroy_pending_entity() {
        let log = Log::default();
        let mut world = World::new();
        let mut entity = Entity::new("e");
        entity.add_component(Recorder::new(&log));
        let id = entity.id();
        world.add_entity(entity);

        world.destroy_entity(id);
        assert!(!world.contains(id));
        world.flush();
        assert!(world.entities().is_empty());
        assert!(world.take_detached().is_empty());
    }

    #[test]
    fn test_detach_and_reattach_keeps_components() {
        let log = Log::default();
        let mut first = World::new();
        let mut second = World::new();

        let mut entity = Entity::new("traveller");
        entity.add_component(Recorder::new(&log));
        entity.add_component(Recorder::new(&log));
        let id = entity.id();
        first.add_entity(entity);
        first.flush();
        assert_eq!(count(&log, id, "registered"), 2);

        first.detach_entity(id);
        first.flush();
        assert!(!first.contains(id));
        assert_eq!(count(&log, id, "deregistered"), 2);
        assert_eq!(count(&log, id, "removed"), 0);

        let detached = first.take_detached();
        assert_eq!(detached.len(), 1);
        assert_eq!(detached[0].components().len(), 2);

        second.attach_entities(detached);
        assert!(second.entities().ids().is_empty());
        second.flush();
        assert_eq!(second.entities().ids(), &[id]);
        assert_eq!(count(&log, id, "registered"), 4);
        assert_eq!(second.entity(id).unwrap().components().len(), 2);
        assert_eq!(second.entity(id).unwrap().world(), Some(second.id()));
    }

    #[test]
    fn test_detach_takes_children_along() {
        let mut world = World::new();
        let parent = Entity::new("parent");
        let child = Entity::new("child");
        let (parent_id, child_id) = (parent.id(), child.id());
        world.add_entity(parent);
        world.add_entity(child);
        world.set_parent(child_id, Some(parent_id));
        world.flush();

        world.detach_entity(parent_id);
        world.flush();
        let detached = world.take_detached();
        assert_eq!(detached.len(), 2);
        assert!(world.entities().is_empty());

        let mut other = World::new();
        other.attach_entities(detached);
        other.flush();
        assert_eq!(other.parent(child_id), Some(parent_id));
        assert_eq!(other.children(parent_id), &[child_id]);
    }

    #[test]
    fn test_commands_apply_after_update() {
        let mut world = World::new();
        let mut entity = Entity::new("spawner");
        entity.add_component(Spawner { done: false });
        world.add_entity(entity);
        world.flush();

        let mut frame = FrameContext::new();
        world.update(&mut frame);
        assert!(world.find_entity("spawned").is_some(), "Staged by the command");
        assert_eq!(world.entities().len(), 1);

        world.update(&mut frame);
        assert_eq!(world.entities().len(), 2);

        // Events raised during a frame are readable after the next swap
        world.update(&mut frame);
        assert!(
            world
                .events()
                .iter()
                .any(|e| matches!(e, SceneEvent::EntitiesChanged { added: 1, removed: 0 }))
        );
    }

    /// Queues the destruction of another entity on its first update
    struct Destroyer {
        target: EntityId,
        done: bool,
    }

    impl Component for Destroyer {
        fn kind(&self) -> &'static str {
            "destroyer"
        }

        fn update(&mut self, ctx: &mut ComponentContext<'_>) {
            if !self.done {
                ctx.frame.commands.destroy(self.target);
                self.done = true;
            }
        }
    }

    #[test]
    fn test_destroy_command_takes_effect_next_frame() {
        let log = Log::default();
        let mut world = World::new();
        let mut victim = Entity::new("victim").with_update_order(1);
        victim.add_component(Recorder::new(&log));
        let victim_id = victim.id();
        let mut killer = Entity::new("killer").with_update_order(0);
        killer.add_component(Destroyer {
            target: victim_id,
            done: false,
        });
        world.add_entity(victim);
        world.add_entity(killer);

        let mut frame = FrameContext::new();
        world.update(&mut frame);
        // Destroyed after the killer ran, yet updated in the same frame
        assert_eq!(count(&log, victim_id, "update"), 1);
        assert!(world.entities().ids().contains(&victim_id));
        assert!(world.entities().is_pending_removal(victim_id));
        assert!(world.entity(victim_id).unwrap().is_destroyed());
        assert_eq!(count(&log, victim_id, "removed"), 0);

        world.update(&mut frame);
        assert!(!world.contains(victim_id));
        assert!(!world.entities().ids().contains(&victim_id));
        assert_eq!(count(&log, victim_id, "update"), 1);
        assert_eq!(count(&log, victim_id, "removed"), 1);
    }

    #[test]
    fn test_update_interval_throttles() {
        let log = Log::default();
        let mut world = World::new();
        let mut entity = Entity::new("slow").with_update_interval(3);
        entity.add_component(Recorder::new(&log));
        let id = entity.id();
        world.add_entity(entity);

        let mut frame = FrameContext::new();
        for _ in 0..6 {
            frame.time.advance(0.016);
            world.update(&mut frame);
        }
        // Frames 1 through 6: only 3 and 6 are multiples of the interval
        assert_eq!(count(&log, id, "update"), 2);
    }

    #[test]
    fn test_disabled_entity_not_updated() {
        let log = Log::default();
        let mut world = World::new();
        let mut entity = Entity::new("off");
        entity.add_component(Recorder::new(&log));
        entity.set_enabled(false);
        let id = entity.id();
        world.add_entity(entity);

        let mut frame = FrameContext::new();
        world.update(&mut frame);
        assert_eq!(count(&log, id, "update"), 0);
    }

    #[test]
    fn test_world_matrix_composes_parents() {
        let mut world = World::new();
        let parent = Entity::new("parent");
        let child = Entity::new("child");
        let (parent_id, child_id) = (parent.id(), child.id());
        world.add_entity(parent);
        world.add_entity(child);
        world.set_parent(child_id, Some(parent_id));
        world.set_position(parent_id, Vec3::new(1.0, 0.0, 0.0));
        world.set_position(child_id, Vec3::new(0.0, 2.0, 0.0));

        let position = world.world_matrix(child_id).transform_point3(Vec3::ZERO);
        assert!((position - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_moving_parent_notifies_children() {
        let mut world = World::new();
        let mut parent = Entity::new("parent");
        let mut child = Entity::new("child");
        let parent_component = parent.add_component(MoveCounter::default());
        let child_component = child.add_component(MoveCounter::default());
        let (parent_id, child_id) = (parent.id(), child.id());
        world.add_entity(parent);
        world.add_entity(child);
        world.set_parent(child_id, Some(parent_id));

        let mut frame = FrameContext::new();
        world.update(&mut frame);
        world.set_position(parent_id, Vec3::X);
        world.update(&mut frame);

        let moves = |id: EntityId, component| {
            world
                .entity(id)
                .and_then(|e| e.component::<MoveCounter>(component))
                .map(|c| c.0)
        };
        assert_eq!(moves(parent_id, parent_component), Some(1));
        assert_eq!(moves(child_id, child_component), Some(2));
    }

    #[test]
    #[should_panic(expected = "creates a cycle")]
    fn test_parent_cycle_panics() {
        let mut world = World::new();
        let a = Entity::new("a");
        let b = Entity::new("b");
        let (a_id, b_id) = (a.id(), b.id());
        world.add_entity(a);
        world.add_entity(b);
        world.set_parent(b_id, Some(a_id));
        world.set_parent(a_id, Some(b_id));
    }

    #[test]
    fn test_set_tag_through_world() {
        let mut world = World::new();
        let entity = Entity::new("e").with_tag(1);
        let id = entity.id();
        world.add_entity(entity);
        world.flush();

        world.set_tag(id, 5);
        assert_eq!(world.entities_with_tag(5), vec![id]);
        assert!(world.entities_with_tag(1).is_empty());
        assert_eq!(world.entity(id).unwrap().tag(), 5);
    }

    #[test]
    fn test_find_components_skips_disabled_entities() {
        let mut world = World::new();
        let mut on = Entity::new("on");
        on.add_component(MoveCounter(1));
        let mut off = Entity::new("off");
        off.add_component(MoveCounter(2));
        off.set_enabled(false);
        world.add_entity(on);
        world.add_entity(off);
        world.flush();

        assert_eq!(world.find_component::<MoveCounter>().map(|c| c.0), Some(1));
        assert_eq!(world.find_components::<MoveCounter>().len(), 1);
        assert!(world.find_component::<Spawner>().is_none());
    }

    #[test]
    fn test_render_in_draw_order() {
        let mut world = World::new();
        let mut low = Entity::new("low");
        low.add_component(Sprite::new(0));
        let mut high = Entity::new("high");
        high.add_component(Sprite::new(4));
        high.transform_mut().set_position(Vec3::new(0.0, 3.0, 0.0));
        let (low_id, high_id) = (low.id(), high.id());
        world.add_entity(low);
        world.add_entity(high);

        let mut frame = FrameContext::new();
        world.update(&mut frame);
        assert_eq!(world.renderables().len(), 2);
        let first = world.renderables().as_slice()[0];
        assert_eq!(first.entity, high_id);

        let mut backend = RecordingBackend::default();
        world.render(&frame, &mut backend);
        assert_eq!(backend.draws.len(), 2);
        assert_eq!(backend.draws[0].1.w_axis.truncate(), Vec3::new(0.0, 3.0, 0.0));

        // Disabled entities are skipped, destroyed ones leave the list
        world.entity_mut(high_id).unwrap().set_enabled(false);
        let mut backend = RecordingBackend::default();
        world.render(&frame, &mut backend);
        assert_eq!(backend.draws.len(), 1);

        world.destroy_entity(low_id);
        world.update(&mut frame);
        assert_eq!(world.renderables().len(), 1);
    }

    #[test]
    fn test_remove_all_entities_clears_renderables() {
        let mut world = World::new();
        let mut entity = Entity::new("e");
        entity.add_component(Sprite::new(0));
        world.add_entity(entity);
        world.flush();
        assert_eq!(world.renderables().len(), 1);

        world.remove_all_entities();
        assert!(world.entities().is_empty());
        assert!(world.renderables().is_empty());
    }
}
