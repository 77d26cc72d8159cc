//! A 3D scene core
//!
//! This crate provides:
//! - An entity/component scene graph with deferred structural changes
//! - Sorted renderable lists drawn through a host-supplied backend
//! - Editable height-field terrain with quadtree picking
//! - JSON scene persistence with rotating backups

pub mod assets;
pub mod core;
pub mod ecs;
pub mod render;
pub mod terrain;

// Re-exports for convenience
pub use glam;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::assets::{ContentCache, ContentError, ContentLoader, DiskLoader};
    pub use crate::core::{
        EngineConfig, FrameContext, PointerState, SceneEvent, SceneSnapshot, SceneStore,
        TerrainConfig, Time, WorldConfig,
    };
    pub use crate::ecs::{
        Component, ComponentContext, ComponentFactory, Entity, EntityId, Rotator, Transform, World,
    };
    pub use crate::render::{
        Camera, DrawCall, Light, MaterialId, RenderBackend, RenderFrame, RenderSettings,
        Renderable, ResourceId,
    };
    pub use crate::terrain::{GenerationType, HeightMap, Ray, TerrainComponent, TerrainTool};
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
}
