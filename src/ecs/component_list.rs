//! Per-entity component registry
//!
//! Additions and removals are staged and committed by `update_lists`, so a
//! component may add or remove siblings from inside its own update without
//! disturbing the iteration in progress.

use super::component::{downcast_mut, downcast_ref};
use super::{Component, ComponentContext, ComponentId, EntityId, Transform};
use crate::render::{RenderableList, RenderableRef};

struct ComponentSlot {
    id: ComponentId,
    enabled: bool,
    /// Set once `on_added_to_entity` has fired
    initialized: bool,
    /// In the owner's world registries
    registered: bool,
    component: Box<dyn Component>,
}

impl ComponentSlot {
    fn renderable_ref(&self, owner: EntityId) -> Option<RenderableRef> {
        self.component.as_renderable().map(|_| RenderableRef {
            entity: owner,
            component: self.id,
        })
    }

    fn register(&mut self, owner: EntityId, renderables: &mut RenderableList) {
        if self.registered {
            return;
        }
        if let Some(renderable) = self.renderable_ref(owner) {
            renderables.add(renderable);
        }
        self.registered = true;
        self.component.on_registered(owner);
    }

    fn deregister(&mut self, owner: EntityId, renderables: &mut RenderableList) {
        if !self.registered {
            return;
        }
        if let Some(renderable) = self.renderable_ref(owner) {
            renderables.remove(renderable);
        }
        self.registered = false;
        self.component.on_deregistered(owner);
    }
}

/// Components owned by one entity
#[derive(Default)]
pub struct ComponentList {
    /// Committed components in update order
    components: Vec<ComponentSlot>,
    to_add: Vec<ComponentSlot>,
    to_remove: Vec<ComponentId>,
    unsorted: bool,
}

impl std::fmt::Debug for ComponentList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<_> = self.components.iter().map(|s| s.component.kind()).collect();
        f.debug_struct("ComponentList")
            .field("components", &kinds)
            .field("to_add", &self.to_add.len())
            .field("to_remove", &self.to_remove.len())
            .finish()
    }
}

impl ComponentList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a component; `initialize` fires immediately
    pub fn add(&mut self, mut component: Box<dyn Component>) -> ComponentId {
        component.initialize();
        let id = ComponentId::next();
        self.to_add.push(ComponentSlot {
            id,
            enabled: true,
            initialized: false,
            registered: false,
            component,
        });
        id
    }

    /// Stage a removal. Removing a component that is only pending addition
    /// cancels the addition. Returns false for unknown ids.
    pub fn remove(&mut self, id: ComponentId) -> bool {
        if let Some(pos) = self.to_add.iter().position(|s| s.id == id) {
            self.to_add.remove(pos);
            return true;
        }
        if self.to_remove.contains(&id) {
            log::warn!("Component {id:?} is already pending removal");
            return false;
        }
        if !self.components.iter().any(|s| s.id == id) {
            log::warn!("Removing component {id:?} that is not on this entity");
            return false;
        }
        self.to_remove.push(id);
        true
    }

    /// True if committed or pending addition
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.iter().chain(&self.to_add).any(|s| s.id == id)
    }

    /// Commit staged changes.
    ///
    /// With `renderables`, the owner is in a world: removed components are
    /// deregistered and added ones registered.
    pub fn update_lists(
        &mut self,
        owner: EntityId,
        owner_enabled: bool,
        mut renderables: Option<&mut RenderableList>,
    ) {
        for id in std::mem::take(&mut self.to_remove) {
            let Some(pos) = self.components.iter().position(|s| s.id == id) else {
                continue;
            };
            let mut slot = self.components.remove(pos);
            if let Some(list) = renderables.as_deref_mut() {
                slot.deregister(owner, list);
            }
            slot.component.on_removed_from_entity(owner);
        }

        if self.to_add.is_empty() {
            return;
        }
        let first_new = self.components.len();
        for mut slot in std::mem::take(&mut self.to_add) {
            if let Some(list) = renderables.as_deref_mut() {
                slot.register(owner, list);
            }
            self.components.push(slot);
        }
        // Every addition of this flush is committed before any is notified
        for slot in &mut self.components[first_new..] {
            slot.component.on_added_to_entity(owner);
            slot.initialized = true;
            if slot.enabled && owner_enabled {
                slot.component.on_enabled();
            }
        }

        // Stable: equal orders keep insertion order
        self.components.sort_by_key(|s| s.component.update_order());
        self.unsorted = false;
    }

    /// Flush, then update every enabled component
    pub fn update(&mut self, ctx: &mut ComponentContext<'_>, renderables: Option<&mut RenderableList>) {
        self.update_lists(ctx.entity, true, renderables);
        if self.unsorted {
            self.components.sort_by_key(|s| s.component.update_order());
            self.unsorted = false;
        }
        for slot in &mut self.components {
            if slot.enabled && slot.initialized {
                slot.component.update(ctx);
            }
        }
    }

    /// Remove everything immediately, committed and staged
    pub fn remove_all(&mut self, owner: EntityId, mut renderables: Option<&mut RenderableList>) {
        self.to_add.clear();
        self.to_remove.clear();
        for mut slot in self.components.drain(..) {
            if let Some(list) = renderables.as_deref_mut() {
                slot.deregister(owner, list);
            }
            slot.component.on_removed_from_entity(owner);
        }
    }

    /// Register committed components with the owner's new world
    pub fn register_all(&mut self, owner: EntityId, renderables: &mut RenderableList) {
        for slot in &mut self.components {
            slot.register(owner, renderables);
        }
    }

    /// Leave the owner's world; components stay on the entity
    pub fn deregister_all(&mut self, owner: EntityId, renderables: &mut RenderableList) {
        for slot in &mut self.components {
            slot.deregister(owner, renderables);
        }
    }

    /// Forward owner enable/disable to active components
    pub fn on_owner_enabled_changed(&mut self, enabled: bool) {
        for slot in &mut self.components {
            if slot.enabled && slot.initialized {
                if enabled {
                    slot.component.on_enabled();
                } else {
                    slot.component.on_disabled();
                }
            }
        }
    }

    /// Enable or disable one component
    pub fn set_enabled(&mut self, id: ComponentId, enabled: bool, owner_enabled: bool) {
        let Some(slot) = self
            .components
            .iter_mut()
            .chain(&mut self.to_add)
            .find(|s| s.id == id)
        else {
            log::warn!("Enabling unknown component {id:?}");
            return;
        };
        if slot.enabled == enabled {
            return;
        }
        slot.enabled = enabled;
        if slot.initialized && owner_enabled {
            if enabled {
                slot.component.on_enabled();
            } else {
                slot.component.on_disabled();
            }
        }
    }

    #[must_use]
    pub fn is_enabled(&self, id: ComponentId) -> bool {
        self.components
            .iter()
            .chain(&self.to_add)
            .any(|s| s.id == id && s.enabled)
    }

    pub fn on_entity_transform_changed(&mut self, transform: &Transform) {
        for slot in &mut self.components {
            slot.component.on_entity_transform_changed(transform);
        }
    }

    /// Re-sort by update order at the next update; call after a committed
    /// component changes its order
    pub fn mark_unsorted(&mut self) {
        self.unsorted = true;
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// First component of type `T`. With `only_initialized`, staged
    /// components are skipped.
    #[must_use]
    pub fn get<T: Component>(&self, only_initialized: bool) -> Option<&T> {
        self.components
            .iter()
            .filter(|s| s.initialized)
            .chain(self.to_add.iter().filter(|_| !only_initialized))
            .find_map(|s| downcast_ref::<T>(s.component.as_ref()))
    }

    pub fn get_mut<T: Component>(&mut self, only_initialized: bool) -> Option<&mut T> {
        self.components
            .iter_mut()
            .filter(|s| s.initialized)
            .chain(self.to_add.iter_mut().filter(|_| !only_initialized))
            .find_map(|s| downcast_mut::<T>(s.component.as_mut()))
    }

    /// Every component of type `T`, committed then staged
    #[must_use]
    pub fn get_all<T: Component>(&self) -> Vec<&T> {
        self.components
            .iter()
            .chain(&self.to_add)
            .filter_map(|s| downcast_ref::<T>(s.component.as_ref()))
            .collect()
    }

    /// Committed component by id
    #[must_use]
    pub fn get_by_id(&self, id: ComponentId) -> Option<&dyn Component> {
        self.components
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.component.as_ref())
    }

    pub fn get_by_id_mut(&mut self, id: ComponentId) -> Option<&mut dyn Component> {
        self.components
            .iter_mut()
            .find(|s| s.id == id)
            .map(|s| s.component.as_mut())
    }

    /// Committed components with their ids and enabled flags, in update order
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, bool, &dyn Component)> {
        self.components
            .iter()
            .map(|s| (s.id, s.enabled, s.component.as_ref()))
    }

    /// Ids in update order, committed only
    #[must_use]
    pub fn ids(&self) -> Vec<ComponentId> {
        self.components.iter().map(|s| s.id).collect()
    }

    /// Committed components
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Components staged for addition
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.to_add.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::core::FrameContext;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Tracer {
        name: &'static str,
        order: i32,
        log: Log,
    }

    impl Tracer {
        fn boxed(name: &'static str, order: i32, log: &Log) -> Box<dyn Component> {
            Box::new(Self {
                name,
                order,
                log: Rc::clone(log),
            })
        }

        fn record(&self, event: &str) {
            self.log.borrow_mut().push(format!("{}:{event}", self.name));
        }
    }

    impl Component for Tracer {
        fn kind(&self) -> &'static str {
            "tracer"
        }

        fn update_order(&self) -> i32 {
            self.order
        }

        fn initialize(&mut self) {
            self.record("init");
        }

        fn on_added_to_entity(&mut self, _entity: EntityId) {
            self.record("added");
        }

        fn on_removed_from_entity(&mut self, _entity: EntityId) {
            self.record("removed");
        }

        fn on_enabled(&mut self) {
            self.record("enabled");
        }

        fn on_disabled(&mut self) {
            self.record("disabled");
        }

        fn update(&mut self, _ctx: &mut ComponentContext<'_>) {
            self.record("update");
        }
    }

    struct Marker;

    impl Component for Marker {
        fn kind(&self) -> &'static str {
            "marker"
        }
    }

    fn owner() -> EntityId {
        EntityId::from_raw(1)
    }

    fn run_update(list: &mut ComponentList) {
        let mut transform = Transform::new();
        let mut frame = FrameContext::new();
        let mut ctx = ComponentContext {
            entity: owner(),
            world_matrix: glam::Mat4::IDENTITY,
            transform: &mut transform,
            frame: &mut frame,
        };
        list.update(&mut ctx, None);
    }

    #[test]
    fn test_add_is_deferred() {
        let log = Log::default();
        let mut list = ComponentList::new();
        let id = list.add(Tracer::boxed("a", 0, &log));

        assert!(list.contains(id));
        assert!(list.is_empty());
        assert_eq!(*log.borrow(), vec!["a:init"]);

        list.update_lists(owner(), true, None);
        assert_eq!(list.len(), 1);
        assert_eq!(*log.borrow(), vec!["a:init", "a:added", "a:enabled"]);
    }

    #[test]
    fn test_remove_cancels_pending_add() {
        let log = Log::default();
        let mut list = ComponentList::new();
        let id = list.add(Tracer::boxed("a", 0, &log));
        assert!(list.remove(id));
        assert!(!list.contains(id));

        list.update_lists(owner(), true, None);
        assert!(list.is_empty());
        assert_eq!(*log.borrow(), vec!["a:init"]);
    }

    #[test]
    fn test_remove_is_deferred_and_idempotent() {
        let log = Log::default();
        let mut list = ComponentList::new();
        let id = list.add(Tracer::boxed("a", 0, &log));
        list.update_lists(owner(), true, None);

        assert!(list.remove(id));
        assert!(!list.remove(id), "Second removal is a tolerated no-op");
        assert_eq!(list.len(), 1);

        list.update_lists(owner(), true, None);
        assert!(list.is_empty());
        assert_eq!(log.borrow().last().unwrap(), "a:removed");
        assert!(!list.remove(ComponentId::from_raw(u64::MAX)));
    }

    #[test]
    fn test_update_order_is_stable() {
        let log = Log::default();
        let mut list = ComponentList::new();
        list.add(Tracer::boxed("late", 5, &log));
        list.add(Tracer::boxed("first", 0, &log));
        list.add(Tracer::boxed("second", 0, &log));
        run_update(&mut list);

        let updates: Vec<_> = log
            .borrow()
            .iter()
            .filter(|e| e.ends_with(":update"))
            .cloned()
            .collect();
        assert_eq!(updates, vec!["first:update", "second:update", "late:update"]);
    }

    #[test]
    fn test_mark_unsorted_resorts_committed() {
        let log = Log::default();
        let mut list = ComponentList::new();
        let early = list.add(Tracer::boxed("early", 0, &log));
        list.add(Tracer::boxed("middle", 1, &log));
        run_update(&mut list);

        let slot = list.get_by_id_mut(early).and_then(downcast_mut::<Tracer>).unwrap();
        slot.order = 2;
        log.borrow_mut().clear();
        run_update(&mut list);
        assert_eq!(*log.borrow(), vec!["early:update", "middle:update"], "No re-sort without a mark");

        list.mark_unsorted();
        log.borrow_mut().clear();
        run_update(&mut list);
        assert_eq!(*log.borrow(), vec!["middle:update", "early:update"]);
    }

    #[test]
    fn test_disabled_component_skips_update() {
        let log = Log::default();
        let mut list = ComponentList::new();
        let id = list.add(Tracer::boxed("a", 0, &log));
        list.update_lists(owner(), true, None);

        list.set_enabled(id, false, true);
        log.borrow_mut().clear();
        run_update(&mut list);
        assert_eq!(*log.borrow(), Vec::<String>::new());

        list.set_enabled(id, true, true);
        assert_eq!(*log.borrow(), vec!["a:enabled"]);
    }

    #[test]
    fn test_typed_lookup() {
        let log = Log::default();
        let mut list = ComponentList::new();
        list.add(Box::new(Marker));
        list.add(Tracer::boxed("a", 0, &log));

        assert!(list.get::<Marker>(true).is_none());
        assert!(list.get::<Marker>(false).is_some());

        list.update_lists(owner(), true, None);
        assert!(list.get::<Marker>(true).is_some());
        assert_eq!(list.get::<Tracer>(true).map(|p| p.name), Some("a"));
        assert_eq!(list.get_all::<Marker>().len(), 1);
        assert!(list.get_mut::<Tracer>(true).is_some());
    }

    #[test]
    fn test_remove_all_is_immediate() {
        let log = Log::default();
        let mut list = ComponentList::new();
        list.add(Tracer::boxed("a", 0, &log));
        list.update_lists(owner(), true, None);
        list.add(Tracer::boxed("b", 0, &log));

        list.remove_all(owner(), None);
        assert!(list.is_empty());
        assert_eq!(list.pending_count(), 0);
        assert!(log.borrow().contains(&String::from("a:removed")));
        assert!(!log.borrow().contains(&String::from("b:removed")));
    }
}
