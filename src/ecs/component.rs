//! Component capability trait and per-update context

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Mat4;
use serde::{Deserialize, Serialize};

use super::{EntityId, Transform};
use crate::core::FrameContext;
use crate::render::Renderable;

/// Global counter for component ids
static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique, process-lifetime component identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(u64);

impl ComponentId {
    pub(crate) fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
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

/// Upcast helper so trait objects can be downcast to concrete components
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Data handed to a component while it updates
pub struct ComponentContext<'a> {
    /// Owning entity
    pub entity: EntityId,
    /// Owner's world matrix at the start of its update
    pub world_matrix: Mat4,
    /// Owner's local transform
    pub transform: &'a mut Transform,
    /// Frame-wide state: time, camera, lights, pointer and deferred commands
    pub frame: &'a mut FrameContext,
}

/// Behaviour attached to an entity.
///
/// Every hook has an empty default; implementors override what they need.
pub trait Component: AsAny {
    /// Stable key used by the component factory and scene documents
    fn kind(&self) -> &'static str;

    /// Lower values update first within an entity
    fn update_order(&self) -> i32 {
        0
    }

    /// Called once, when the component is handed to an entity
    fn initialize(&mut self) {}

    /// Called when the owner's component list commits this component
    fn on_added_to_entity(&mut self, _entity: EntityId) {}

    fn on_removed_from_entity(&mut self, _entity: EntityId) {}

    /// Called when the owner joins a world (or the component joins an
    /// entity that already is in one)
    fn on_registered(&mut self, _entity: EntityId) {}

    fn on_deregistered(&mut self, _entity: EntityId) {}

    fn on_enabled(&mut self) {}

    fn on_disabled(&mut self) {}

    fn on_entity_transform_changed(&mut self, _transform: &Transform) {}

    fn update(&mut self, _ctx: &mut ComponentContext<'_>) {}

    fn as_renderable(&self) -> Option<&dyn Renderable> {
        None
    }

    fn as_renderable_mut(&mut self) -> Option<&mut dyn Renderable> {
        None
    }

    /// Persistent state for scene documents; `None` saves nothing
    fn save(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Downcast a component trait object
pub fn downcast_ref<T: Component>(component: &dyn Component) -> Option<&T> {
    component.as_any().downcast_ref::<T>()
}

/// Downcast a mutable component trait object
pub fn downcast_mut<T: Component>(component: &mut dyn Component) -> Option<&mut T> {
    component.as_any_mut().downcast_mut::<T>()
}
