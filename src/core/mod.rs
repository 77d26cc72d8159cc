//! Core engine module
//!
//! Configuration, per-frame context, the scene event queue and persistence

mod config;
mod context;
mod events;
mod scene;
mod time;

pub use config::{ConfigError, EngineConfig, MapSize, TerrainConfig, TerrainLayer, WorldConfig};
pub use context::{FrameContext, PointerState};
pub use events::{EventQueue, SceneEvent};
pub use scene::{
    SceneError, SceneSnapshot, SceneStore, SerializedComponent, SerializedEntity, backup_path,
};
pub use time::Time;
