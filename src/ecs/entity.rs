//! Scene graph node
//!
//! An entity is a named, taggable, orderable node that owns its components
//! and a transform. Worlds own entities; everything else refers to them by
//! [`EntityId`].

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Mat4;
use serde::{Deserialize, Serialize};

use super::component::{downcast_mut, downcast_ref};
use super::{Component, ComponentContext, ComponentId, ComponentList, Transform};
use crate::core::FrameContext;
use crate::render::RenderableList;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_WORLD_ID: AtomicU64 = AtomicU64::new(1);

/// Unique, process-lifetime entity identity; ids grow in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Rebuild an id from its raw value
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Identity of a world, used as the entity back-reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(u64);

impl WorldId {
    pub(crate) fn next() -> Self {
        Self(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A node in the scene graph
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    name: String,
    tag: i32,
    enabled: bool,
    update_interval: u32,
    update_order: i32,
    destroyed: bool,
    world: Option<WorldId>,
    transform: Transform,
    components: ComponentList,
}

impl Entity {
    /// Create a standalone entity (not in any world)
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::next(),
            name: name.into(),
            tag: 0,
            enabled: true,
            update_interval: 1,
            update_order: 0,
            destroyed: false,
            world: None,
            transform: Transform::new(),
            components: ComponentList::new(),
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: i32) -> Self {
        self.tag = tag;
        self
    }

    #[must_use]
    pub fn with_update_order(mut self, update_order: i32) -> Self {
        self.update_order = update_order;
        self
    }

    /// Update every `interval` frames (at least 1)
    #[must_use]
    pub fn with_update_interval(mut self, interval: u32) -> Self {
        self.update_interval = interval.max(1);
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[must_use]
    pub fn tag(&self) -> i32 {
        self.tag
    }

    /// Set the tag of a standalone entity.
    ///
    /// # Panics
    ///
    /// Panics if the entity is in a world; use `World::set_tag` so the tag
    /// index stays consistent.
    pub fn set_tag(&mut self, tag: i32) {
        assert!(
            self.world.is_none(),
            "Entity {:?} is in a world; change its tag through the world",
            self.id
        );
        self.tag = tag;
    }

    pub(crate) fn set_tag_unchecked(&mut self, tag: i32) {
        self.tag = tag;
    }

    #[must_use]
    pub fn update_order(&self) -> i32 {
        self.update_order
    }

    /// Set the update order of a standalone entity.
    ///
    /// # Panics
    ///
    /// Panics if the entity is in a world; use `World::set_update_order`.
    pub fn set_update_order(&mut self, update_order: i32) {
        assert!(
            self.world.is_none(),
            "Entity {:?} is in a world; change its update order through the world",
            self.id
        );
        self.update_order = update_order;
    }

    pub(crate) fn set_update_order_unchecked(&mut self, update_order: i32) {
        self.update_order = update_order;
    }

    #[must_use]
    pub fn update_interval(&self) -> u32 {
        self.update_interval
    }

    pub fn set_update_interval(&mut self, interval: u32) {
        self.update_interval = interval.max(1);
    }

    /// Total order used by registries: update order, then id
    #[must_use]
    pub fn sort_key(&self) -> (i32, EntityId) {
        (self.update_order, self.id)
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable; components are notified on change
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.components.on_owner_enabled_changed(enabled);
        }
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub(crate) fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }

    /// World this entity is committed to, if any
    #[must_use]
    pub fn world(&self) -> Option<WorldId> {
        self.world
    }

    pub(crate) fn set_world(&mut self, world: Option<WorldId>) {
        self.world = world;
    }

    // -------------------------------------------------------------------------
    // Transform
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Local transform. Hierarchy links are maintained by the world.
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    // -------------------------------------------------------------------------
    // Components
    // -------------------------------------------------------------------------

    /// Stage a component; it is committed at the next flush
    pub fn add_component<T: Component>(&mut self, component: T) -> ComponentId {
        self.components.add(Box::new(component))
    }

    pub fn add_boxed_component(&mut self, component: Box<dyn Component>) -> ComponentId {
        self.components.add(component)
    }

    /// Stage a removal; unknown ids are logged and ignored
    pub fn remove_component(&mut self, id: ComponentId) -> bool {
        self.components.remove(id)
    }

    pub fn set_component_enabled(&mut self, id: ComponentId, enabled: bool) {
        self.components.set_enabled(id, enabled, self.enabled);
    }

    /// First committed component of type `T`
    #[must_use]
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.components.get::<T>(true)
    }

    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components.get_mut::<T>(true)
    }

    /// Component by id, committed only
    pub fn component_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.components.get_by_id_mut(id).and_then(downcast_mut::<T>)
    }

    /// Mutate a committed component in place. A changed update order
    /// re-sorts the components before their next update.
    pub fn modify_component<T: Component>(&mut self, id: ComponentId, f: impl FnOnce(&mut T)) -> bool {
        let Some(component) = self.component_mut::<T>(id) else {
            return false;
        };
        let before = component.update_order();
        f(&mut *component);
        let reordered = component.update_order() != before;
        if reordered {
            self.components.mark_unsorted();
        }
        true
    }

    #[must_use]
    pub fn component<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.components.get_by_id(id).and_then(downcast_ref::<T>)
    }

    #[must_use]
    pub fn components(&self) -> &ComponentList {
        &self.components
    }

    pub(crate) fn components_mut(&mut self) -> &mut ComponentList {
        &mut self.components
    }

    /// Commit staged components of a standalone entity
    pub fn flush_components(&mut self) {
        if self.world.is_some() {
            log::warn!("Entity {:?} is in a world; its components flush on update", self.id);
            return;
        }
        self.components.update_lists(self.id, self.enabled, None);
    }

    // -------------------------------------------------------------------------
    // Scene lifecycle, driven by the entity list
    // -------------------------------------------------------------------------

    pub(crate) fn on_added_to_scene(&mut self, renderables: &mut RenderableList) {
        self.components.register_all(self.id, renderables);
        self.components.update_lists(self.id, self.enabled, Some(renderables));
    }

    /// Destroyed entities lose their components; detached ones keep them
    pub(crate) fn on_removed_from_scene(&mut self, renderables: &mut RenderableList) {
        if self.destroyed {
            self.components.remove_all(self.id, Some(renderables));
        } else {
            self.components.deregister_all(self.id, renderables);
        }
    }

    pub(crate) fn update(
        &mut self,
        world_matrix: Mat4,
        frame: &mut FrameContext,
        renderables: &mut RenderableList,
    ) {
        if self.transform.take_changed() {
            self.components.on_entity_transform_changed(&self.transform);
        }
        let mut ctx = ComponentContext {
            entity: self.id,
            world_matrix,
            transform: &mut self.transform,
            frame,
        };
        self.components.update(&mut ctx, Some(renderables));
    }
}
