//! Renderable components and the per-world render list
//!
//! The list keeps references to renderable components, not the components
//! themselves. Membership changes are staged and committed once per frame,
//! mirroring the entity list.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{RenderBackend, RenderFrame};
use crate::ecs::{ComponentId, EntityId};

/// Opaque material identity used as the final sort tiebreak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

/// Capability implemented by components that draw something
pub trait Renderable {
    /// Higher layers are drawn first
    fn render_layer(&self) -> i32;

    /// Depth within the layer in `[0, 1]`; higher values are drawn first
    fn layer_depth(&self) -> f32;

    fn material(&self) -> Option<MaterialId>;

    /// Submit draws for this frame
    fn render(&mut self, frame: &RenderFrame<'_>, backend: &mut dyn RenderBackend);
}

/// Sort settings embedded in renderable components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    render_layer: i32,
    layer_depth: f32,
    material: Option<MaterialId>,
}

impl RenderSettings {
    #[must_use]
    pub fn new() -> Self {
        Self {
            render_layer: 0,
            layer_depth: 0.0,
            material: None,
        }
    }

    #[must_use]
    pub fn with_render_layer(mut self, render_layer: i32) -> Self {
        self.render_layer = render_layer;
        self
    }

    #[must_use]
    pub fn with_layer_depth(mut self, layer_depth: f32) -> Self {
        self.set_layer_depth(layer_depth);
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    #[must_use]
    pub fn render_layer(&self) -> i32 {
        self.render_layer
    }

    pub fn set_render_layer(&mut self, render_layer: i32) {
        self.render_layer = render_layer;
    }

    #[must_use]
    pub fn layer_depth(&self) -> f32 {
        self.layer_depth
    }

    /// Set the depth, clamped to `[0, 1]`
    pub fn set_layer_depth(&mut self, layer_depth: f32) {
        self.layer_depth = layer_depth.clamp(0.0, 1.0);
    }

    #[must_use]
    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    pub fn set_material(&mut self, material: Option<MaterialId>) {
        self.material = material;
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Reference to a renderable component on an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderableRef {
    pub entity: EntityId,
    pub component: ComponentId,
}

/// Cached sort keys of a renderable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortKey {
    pub render_layer: i32,
    pub layer_depth: f32,
    pub material: Option<MaterialId>,
}

impl SortKey {
    /// Read the keys from a renderable, clamping the depth
    #[must_use]
    pub fn of(renderable: &dyn Renderable) -> Self {
        Self {
            render_layer: renderable.render_layer(),
            layer_depth: renderable.layer_depth().clamp(0.0, 1.0),
            material: renderable.material(),
        }
    }

    /// Draw order: layer descending, depth descending, then material
    /// (components with a material before those without).
    #[must_use]
    pub fn draw_order(&self, other: &Self) -> Ordering {
        other
            .render_layer
            .cmp(&self.render_layer)
            .then_with(|| other.layer_depth.total_cmp(&self.layer_depth))
            .then_with(|| match (self.material, other.material) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    }
}

/// Sorted, deferred list of renderable components in a world
#[derive(Debug, Default)]
pub struct RenderableList {
    /// Committed references in draw order
    components: Vec<RenderableRef>,
    keys: FxHashMap<RenderableRef, SortKey>,
    to_add: Vec<RenderableRef>,
    to_remove: Vec<RenderableRef>,
    /// Committed references grouped by render layer, in draw order
    by_layer: FxHashMap<i32, Vec<RenderableRef>>,
    unsorted: bool,
}

impl RenderableList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a renderable for addition
    pub fn add(&mut self, renderable: RenderableRef) {
        if let Some(pos) = self.to_remove.iter().position(|r| *r == renderable) {
            // Re-registered before the removal was committed
            self.to_remove.swap_remove(pos);
            return;
        }
        if self.contains(renderable) {
            log::warn!("Renderable {renderable:?} is already registered");
            return;
        }
        self.to_add.push(renderable);
    }

    /// Stage a renderable for removal
    pub fn remove(&mut self, renderable: RenderableRef) {
        if let Some(pos) = self.to_add.iter().position(|r| *r == renderable) {
            self.to_add.remove(pos);
            return;
        }
        if self.to_remove.contains(&renderable) {
            log::warn!("Renderable {renderable:?} is already pending removal");
            return;
        }
        if !self.keys.contains_key(&renderable) {
            log::warn!("Removing renderable {renderable:?} that was never registered");
            return;
        }
        self.to_remove.push(renderable);
    }

    /// True if committed or pending addition
    #[must_use]
    pub fn contains(&self, renderable: RenderableRef) -> bool {
        self.keys.contains_key(&renderable) || self.to_add.contains(&renderable)
    }

    /// Commit staged changes and re-sort when membership or any sort key
    /// changed. `lookup` reads the current keys; references it cannot
    /// resolve are dropped.
    pub fn update_lists(&mut self, lookup: impl Fn(RenderableRef) -> Option<SortKey>) {
        for renderable in self.to_remove.drain(..) {
            self.components.retain(|r| *r != renderable);
            self.keys.remove(&renderable);
            self.unsorted = true;
        }

        for renderable in self.to_add.drain(..) {
            self.components.push(renderable);
            self.unsorted = true;
        }

        let keys = &mut self.keys;
        let mut stale = false;
        for &renderable in &self.components {
            match lookup(renderable) {
                Some(key) => {
                    if keys.get(&renderable) != Some(&key) {
                        keys.insert(renderable, key);
                        self.unsorted = true;
                    }
                }
                None => {
                    log::warn!("Dropping renderable {renderable:?} whose component is gone");
                    keys.remove(&renderable);
                    stale = true;
                }
            }
        }
        if stale {
            self.components.retain(|r| keys.contains_key(r));
            self.unsorted = true;
        }

        if self.unsorted {
            let keys = &self.keys;
            // Stable: equal keys keep registration order
            self.components.sort_by(|a, b| match (keys.get(a), keys.get(b)) {
                (Some(ka), Some(kb)) => ka.draw_order(kb),
                _ => Ordering::Equal,
            });

            self.by_layer.clear();
            for &renderable in &self.components {
                if let Some(key) = keys.get(&renderable) {
                    self.by_layer.entry(key.render_layer).or_default().push(renderable);
                }
            }
            self.unsorted = false;
        }
    }

    /// Committed references in draw order
    #[must_use]
    pub fn as_slice(&self) -> &[RenderableRef] {
        &self.components
    }

    /// Iterate committed references in draw order
    pub fn iter(&self) -> impl Iterator<Item = &RenderableRef> {
        self.components.iter()
    }

    /// Committed references on one render layer, in draw order
    #[must_use]
    pub fn components_with_render_layer(&self, render_layer: i32) -> &[RenderableRef] {
        self.by_layer
            .get(&render_layer)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of committed references
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Drop everything, committed and staged
    pub fn clear(&mut self) {
        self.components.clear();
        self.keys.clear();
        self.to_add.clear();
        self.to_remove.clear();
        self.by_layer.clear();
        self.unsorted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(n: u64) -> RenderableRef {
        RenderableRef {
            entity: EntityId::from_raw(n),
            component: ComponentId::from_raw(n),
        }
    }

    fn key(render_layer: i32, layer_depth: f32, material: Option<u32>) -> SortKey {
        SortKey {
            render_layer,
            layer_depth,
            material: material.map(MaterialId),
        }
    }

    fn keyed_list(entries: &[(u64, SortKey)]) -> RenderableList {
        let mut list = RenderableList::new();
        for (n, _) in entries {
            list.add(reference(*n));
        }
        let table: FxHashMap<_, _> = entries.iter().map(|(n, k)| (reference(*n), *k)).collect();
        list.update_lists(|r| table.get(&r).copied());
        list
    }

    #[test]
    fn test_sort_layer_then_depth_then_material() {
        let list = keyed_list(&[
            (1, key(0, 0.5, None)),
            (2, key(5, 0.0, None)),
            (3, key(0, 0.9, None)),
            (4, key(0, 0.5, Some(7))),
            (5, key(0, 0.5, Some(2))),
        ]);

        let order: Vec<_> = list.iter().map(|r| r.entity.raw()).collect();
        assert_eq!(order, vec![2, 3, 5, 4, 1]);
    }

    #[test]
    fn test_equal_keys_keep_registration_order() {
        let list = keyed_list(&[(3, key(1, 0.0, None)), (1, key(1, 0.0, None)), (2, key(1, 0.0, None))]);
        let order: Vec<_> = list.iter().map(|r| r.entity.raw()).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_deferred_add_and_remove() {
        let mut list = RenderableList::new();
        list.add(reference(1));
        assert!(list.contains(reference(1)));
        assert!(list.is_empty(), "Not committed before update_lists");

        list.update_lists(|_| Some(key(0, 0.0, None)));
        assert_eq!(list.len(), 1);

        list.remove(reference(1));
        assert_eq!(list.len(), 1, "Removal waits for the next flush");
        list.update_lists(|_| Some(key(0, 0.0, None)));
        assert!(list.is_empty());
    }

    #[test]
    fn test_key_change_triggers_resort() {
        let mut list = keyed_list(&[(1, key(0, 0.0, None)), (2, key(0, 0.0, None))]);
        assert_eq!(list.as_slice()[0], reference(1));

        // Entity 2 moves to a higher layer
        list.update_lists(|r| Some(if r == reference(2) { key(3, 0.0, None) } else { key(0, 0.0, None) }));
        assert_eq!(list.as_slice()[0], reference(2));
        assert_eq!(list.components_with_render_layer(3), &[reference(2)]);
        assert_eq!(list.components_with_render_layer(0), &[reference(1)]);
        assert!(list.components_with_render_layer(9).is_empty());
    }

    #[test]
    fn test_unresolvable_refs_are_dropped() {
        let mut list = keyed_list(&[(1, key(0, 0.0, None)), (2, key(0, 0.0, None))]);
        list.update_lists(|r| (r == reference(1)).then(|| key(0, 0.0, None)));
        assert_eq!(list.as_slice(), &[reference(1)]);
    }

    #[test]
    fn test_layer_depth_clamped() {
        let settings = RenderSettings::new().with_layer_depth(4.0);
        assert_eq!(settings.layer_depth(), 1.0);

        let mut settings = settings;
        settings.set_layer_depth(-1.0);
        assert_eq!(settings.layer_depth(), 0.0);
    }
}
