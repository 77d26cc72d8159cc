//! Local transform with a cached matrix and hierarchy links
//!
//! The local matrix is computed lazily and cached until the next mutation.
//! World matrices are composed by the entity list, which walks parent links.

use std::cell::Cell;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::EntityId;

/// Position, rotation and scale relative to the parent entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transform {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,

    /// Cached local matrix (computed lazily)
    #[serde(skip)]
    cached_matrix: Cell<Mat4>,

    /// Whether the cache is stale
    #[serde(skip, default = "stale")]
    dirty: Cell<bool>,

    /// Set on every mutation, consumed by the owning entity's update
    #[serde(skip)]
    changed: bool,

    #[serde(skip)]
    parent: Option<EntityId>,

    #[serde(skip)]
    children: SmallVec<[EntityId; 8]>,
}

fn stale() -> Cell<bool> {
    Cell::new(true)
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn from_parts(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
            ..Default::default()
        }
    }

    // -------------------------------------------------------------------------
    // Getters
    // -------------------------------------------------------------------------

    #[must_use]
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[must_use]
    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[must_use]
    #[inline]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    #[must_use]
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Children in attachment order
    #[must_use]
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    // -------------------------------------------------------------------------
    // Setters (invalidate cache)
    // -------------------------------------------------------------------------

    pub fn set_position(&mut self, position: Vec3) {
        if self.position != position {
            self.position = position;
            self.invalidate();
        }
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        if self.rotation != rotation {
            self.rotation = rotation;
            self.invalidate();
        }
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        if self.scale != scale {
            self.scale = scale;
            self.invalidate();
        }
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
        self.invalidate();
    }

    /// Rotate by a quaternion, applied after the current rotation
    pub fn rotate(&mut self, rotation: Quat) {
        self.rotation = rotation * self.rotation;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.dirty.set(true);
        self.changed = true;
    }

    /// Flag a change that happened outside this transform, e.g. in an ancestor
    pub(crate) fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Consume the change flag
    pub(crate) fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    // -------------------------------------------------------------------------
    // Hierarchy links, maintained by the world
    // -------------------------------------------------------------------------

    pub(crate) fn set_parent(&mut self, parent: Option<EntityId>) {
        self.parent = parent;
        self.changed = true;
    }

    pub(crate) fn add_child(&mut self, child: EntityId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn remove_child(&mut self, child: EntityId) -> bool {
        if let Some(pos) = self.children.iter().position(|&e| e == child) {
            self.children.remove(pos);
            true
        } else {
            false
        }
    }

    // -------------------------------------------------------------------------
    // Computed properties
    // -------------------------------------------------------------------------

    /// Local matrix, recomputed only after a mutation
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        if self.dirty.get() {
            let matrix =
                Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
            self.cached_matrix.set(matrix);
            self.dirty.set(false);
        }
        self.cached_matrix.get()
    }

    /// Forward direction (negative Z in local space)
    #[must_use]
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    #[must_use]
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    #[must_use]
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    #[must_use]
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            cached_matrix: Cell::new(Mat4::IDENTITY),
            dirty: stale(),
            changed: false,
            parent: None,
            children: SmallVec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_default() {
        let t = Transform::new();
        assert_eq!(t.position(), Vec3::ZERO);
        assert_eq!(t.rotation(), Quat::IDENTITY);
        assert_eq!(t.scale(), Vec3::ONE);
        assert!(t.is_dirty());
        assert!(t.parent().is_none());
    }

    #[test]
    fn test_local_matrix_cached() {
        let mut t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let matrix = t.local_matrix();
        assert_eq!(matrix.w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0));
        assert!(!t.is_dirty());

        // Same value does not invalidate
        t.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert!(!t.is_dirty());
        assert!(!t.take_changed());

        t.translate(Vec3::X);
        assert!(t.is_dirty());
        assert!(t.take_changed());
        assert!(!t.take_changed());
        assert_eq!(t.local_matrix().w_axis.truncate(), Vec3::new(2.0, 2.0, 3.0));
    }

    #[test]
    fn test_directions() {
        let mut t = Transform::new();
        assert!((t.forward() - Vec3::NEG_Z).length() < 0.001);
        assert!((t.right() - Vec3::X).length() < 0.001);

        t.rotate(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        assert!((t.forward() - Vec3::NEG_X).length() < 0.001);
        assert!((t.up() - Vec3::Y).length() < 0.001);
    }

    #[test]
    fn test_children_no_duplicates() {
        let mut t = Transform::new();
        let a = EntityId::from_raw(1);
        let b = EntityId::from_raw(2);
        t.add_child(a);
        t.add_child(b);
        t.add_child(a);
        assert_eq!(t.children(), &[a, b]);

        assert!(t.remove_child(a));
        assert!(!t.remove_child(a));
        assert_eq!(t.children(), &[b]);
    }

    #[test]
    fn test_serde_skips_links() {
        let mut t = Transform::from_position(Vec3::new(4.0, 5.0, 6.0));
        t.set_parent(Some(EntityId::from_raw(9)));
        let json = serde_json::to_string(&t).unwrap();
        let restored: Transform = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.position(), Vec3::new(4.0, 5.0, 6.0));
        assert!(restored.parent().is_none());
        assert!(restored.is_dirty());
    }
}
