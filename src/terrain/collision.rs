//! Ray, bounding box and triangle primitives used for terrain picking
//!
//! Only the intersection tests the height field needs: ray vs. box (slab
//! test) and ray vs. triangle (Möller-Trumbore).

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Tolerance for parallel rays and degenerate triangles
const EPSILON: f32 = 1e-7;

/// A half-line with an origin and a direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Direction (not required to be normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray
    #[must_use]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Point at `distance` along the ray
    #[must_use]
    #[inline]
    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Transform the ray into another space.
    ///
    /// Distances along the returned ray are measured in the new space.
    #[must_use]
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            origin: matrix.transform_point3(self.origin),
            direction: matrix.transform_vector3(self.direction),
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from its corners
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Check if a point lies inside the box (bounds inclusive)
    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Check if a point lies inside the box footprint on the XZ plane
    #[must_use]
    pub fn contains_xz(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Vertical extent as `(min_y, max_y)`
    #[must_use]
    pub fn y_range(&self) -> (f32, f32) {
        (self.min.y, self.max.y)
    }

    /// Replace the vertical extent, leaving the footprint untouched
    pub fn set_y_range(&mut self, min_y: f32, max_y: f32) {
        self.min.y = min_y;
        self.max.y = max_y;
    }

    /// Grow the vertical extent to include `[min_y, max_y]`
    pub fn grow_y(&mut self, min_y: f32, max_y: f32) {
        self.min.y = self.min.y.min(min_y);
        self.max.y = self.max.y.max(max_y);
    }

    /// Slab test. Returns the entry distance, or 0 when the origin is inside.
    #[must_use]
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let direction = ray.direction[axis];
            let (low, high) = (self.min[axis], self.max[axis]);

            if direction.abs() < EPSILON {
                // Parallel to this slab: must already be between the planes
                if origin < low || origin > high {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / direction;
            let mut t1 = (low - origin) * inv;
            let mut t2 = (high - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }

            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        if t_max < 0.0 {
            return None;
        }
        Some(t_min.max(0.0))
    }
}

/// A triangle in local terrain space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
}

impl Triangle {
    #[must_use]
    pub const fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Lowest vertex height
    #[must_use]
    pub fn min_y(&self) -> f32 {
        self.v0.y.min(self.v1.y).min(self.v2.y)
    }

    /// Highest vertex height
    #[must_use]
    pub fn max_y(&self) -> f32 {
        self.v0.y.max(self.v1.y).max(self.v2.y)
    }

    /// Two-sided Möller-Trumbore test.
    ///
    /// Returns the distance along the ray, in units of `ray.direction`.
    /// Hits behind the origin are rejected.
    #[must_use]
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let p = ray.direction.cross(edge2);
        let determinant = edge1.dot(p);
        if determinant.abs() < EPSILON {
            return None;
        }
        let inv_determinant = 1.0 / determinant;

        let to_origin = ray.origin - self.v0;
        let u = to_origin.dot(p) * inv_determinant;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = to_origin.cross(edge1);
        let v = ray.direction.dot(q) * inv_determinant;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let distance = edge2.dot(q) * inv_determinant;
        (distance >= 0.0).then_some(distance)
    }
}
