//! Built-in components

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{Component, ComponentContext};

/// Spins its entity around a local axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotator {
    pub axis: Vec3,
    /// Radians per second
    pub speed: f32,
}

impl Rotator {
    pub const KIND: &'static str = "rotator";

    #[must_use]
    pub fn new(axis: Vec3, speed: f32) -> Self {
        Self {
            axis: axis.normalize_or(Vec3::Y),
            speed,
        }
    }
}

impl Default for Rotator {
    fn default() -> Self {
        Self::new(Vec3::Y, 1.0)
    }
}

impl Component for Rotator {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>) {
        let angle = self.speed * ctx.frame.time.delta();
        if angle != 0.0 {
            ctx.transform.rotate(Quat::from_axis_angle(self.axis, angle));
        }
    }

    fn save(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self).ok()
    }
}
