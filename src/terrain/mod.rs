//! Height-field terrain
//!
//! A [`HeightMap`] holds normalized samples and everything derived from
//! them: the render mesh, per-cell triangles and a [`QuadTree`] for picking.
//! [`TerrainComponent`] puts a height map into a scene and edits it with
//! the pointer.

mod collision;
mod colormap;
mod component;
mod heightmap;
mod noise;
mod quadtree;

pub use collision::{Aabb, Ray, Triangle};
pub use colormap::{ColorMap, LAYER_COUNT};
pub use component::{TerrainComponent, TerrainTool};
pub use heightmap::{BrushCursor, HeightMap, TerrainDirty, TerrainError};
pub use noise::{DEFAULT_OCTAVES, GenerationType, octave_noise, random_noise, white_noise};
pub use quadtree::{LEAF_CELLS, QuadTree};
