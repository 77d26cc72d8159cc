//! Rendering contract
//!
//! The graphics device lives outside this crate. Renderable components are
//! collected into a sorted [`RenderableList`] and drawn through a
//! [`RenderBackend`] supplied by the host.

mod camera;
mod lights;
mod mesh;
mod renderable;

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::ecs::EntityId;

pub use camera::Camera;
pub use lights::Light;
pub use mesh::{Mesh, Vertex};
pub use renderable::{
    MaterialId, RenderSettings, Renderable, RenderableList, RenderableRef, SortKey,
};

/// Global counter for backend resource keys
static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Key the backend uses to find GPU buffers and textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Allocate a fresh key
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw key value
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Per-renderable data for one frame
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    /// Entity that owns the renderable
    pub entity: EntityId,
    /// Owner's world matrix
    pub world_matrix: Mat4,
    /// Active camera, if any
    pub camera: Option<&'a Camera>,
    /// Lights affecting the scene
    pub lights: &'a [Light],
}

/// A single draw submission
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub mesh: ResourceId,
    pub index_count: u32,
    pub world_matrix: Mat4,
    pub material: Option<MaterialId>,
    /// Textures bound for this draw, in slot order
    pub textures: &'a [ResourceId],
    pub lights: &'a [Light],
}

/// Graphics device collaborator
pub trait RenderBackend {
    /// Replace the buffers stored under `mesh`
    fn upload_mesh(&mut self, mesh: ResourceId, vertices: &[u8], indices: &[u8]);

    /// Replace the texture stored under `texture`
    fn upload_texture(&mut self, texture: ResourceId, width: u32, height: u32, texels: &[u8]);

    /// Submit a draw
    fn draw(&mut self, call: &DrawCall<'_>);
}
