//! Scene lights handed to renderables through the frame context

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A light source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Light {
    /// Parallel rays, like the sun
    Directional {
        /// Light direction (normalized)
        direction: Vec3,
        color: Vec3,
        intensity: f32,
    },
    /// Emits in all directions from a point
    Point {
        position: Vec3,
        color: Vec3,
        intensity: f32,
        /// Distance at which the light has no effect
        range: f32,
    },
}

impl Light {
    /// Create a directional light
    #[must_use]
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self::Directional {
            direction: direction.normalize_or_zero(),
            color,
            intensity,
        }
    }

    /// Create a point light
    #[must_use]
    pub fn point(position: Vec3, color: Vec3, intensity: f32, range: f32) -> Self {
        Self::Point {
            position,
            color,
            intensity,
            range,
        }
    }

    /// Light color scaled by intensity
    #[must_use]
    pub fn radiance(&self) -> Vec3 {
        match *self {
            Self::Directional { color, intensity, .. } | Self::Point { color, intensity, .. } => {
                color * intensity
            }
        }
    }

    /// Direction from `point` toward the light, or `None` when out of range
    #[must_use]
    pub fn direction_from(&self, point: Vec3) -> Option<Vec3> {
        match *self {
            Self::Directional { direction, .. } => Some(-direction),
            Self::Point { position, range, .. } => {
                let offset = position - point;
                (offset.length() <= range).then(|| offset.normalize_or_zero())
            }
        }
    }
}
