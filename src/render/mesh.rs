//! Mesh and vertex definitions

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::ResourceId;

/// Vertex with position, normal, and UV coordinates
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Position as a vector
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    /// Normal as a vector
    #[must_use]
    pub fn normal(&self) -> Vec3 {
        Vec3::from(self.normal)
    }
}

/// CPU-side mesh with an upload flag.
///
/// The graphics backend owns the GPU buffers; the mesh only remembers
/// whether its data changed since the last upload.
#[derive(Debug)]
pub struct Mesh {
    id: ResourceId,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    needs_upload: bool,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::from_data(Vec::new(), Vec::new())
    }

    /// Create a mesh from vertices and indices
    pub fn from_data(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            id: ResourceId::next(),
            vertices,
            indices,
            needs_upload: true,
        }
    }

    /// Backend key for this mesh's buffers
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Get the number of indices
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Vertex data as raw bytes for upload
    #[must_use]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as raw bytes for upload
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Whether the data changed since the last upload
    #[must_use]
    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }

    /// Flag the buffers for re-upload
    pub fn mark_dirty(&mut self) {
        self.needs_upload = true;
    }

    /// Record that the backend has the current data
    pub fn mark_uploaded(&mut self) {
        self.needs_upload = false;
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
