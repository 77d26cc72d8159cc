//! Per-frame context threaded through updates
//!
//! Carries what components would otherwise reach through globals: the
//! clock, the active camera, the light list, a pointer snapshot and the
//! command buffer for structural changes.

use glam::Vec2;

use super::Time;
use crate::ecs::CommandBuffer;
use crate::render::{Camera, Light};
use crate::terrain::Ray;

/// Pointer snapshot, filled in by the host once per frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    /// World-space ray under the pointer
    pub ray: Option<Ray>,
    /// Primary button held
    pub primary_down: bool,
}

/// Frame-wide state handed to every update
#[derive(Debug, Default)]
pub struct FrameContext {
    pub time: Time,
    pub camera: Option<Camera>,
    pub lights: Vec<Light>,
    pub pointer: PointerState,
    pub commands: CommandBuffer,
}

impl FrameContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Some(camera);
        self
    }

    #[must_use]
    pub fn with_light(mut self, light: Light) -> Self {
        self.lights.push(light);
        self
    }

    /// Start a new frame: advance the clock and take a fresh pointer
    /// snapshot. The pointer ray is unprojected through the active camera.
    pub fn begin_frame(&mut self, delta: f32, pointer: Option<Vec2>, viewport: Vec2, primary_down: bool) {
        self.time.advance(delta);
        let ray = match (pointer, &self.camera) {
            (Some(screen), Some(camera)) => Some(camera.picking_ray(screen, viewport)),
            _ => None,
        };
        self.pointer = PointerState { ray, primary_down };
    }
}
