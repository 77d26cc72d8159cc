//! Engine configuration
//!
//! Builder-style structs with serde support so settings can live in a RON
//! file next to the scene documents.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Terrain edge length presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapSize {
    Small,
    Medium,
    Large,
    /// Any other edge length (at least 2)
    Custom(usize),
}

impl MapSize {
    /// Number of samples along one edge
    #[must_use]
    pub const fn edge(self) -> usize {
        match self {
            Self::Small => 128,
            Self::Medium => 256,
            Self::Large => 512,
            Self::Custom(edge) => edge,
        }
    }
}

/// A texture layer blended by the terrain's color map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainLayer {
    /// Asset path resolved through the content loader
    pub texture: String,
    /// UV tiling factor
    pub scale: f32,
}

impl TerrainLayer {
    #[must_use]
    pub fn new(texture: impl Into<String>, scale: f32) -> Self {
        Self {
            texture: texture.into(),
            scale,
        }
    }
}

/// Height map settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub map_size: MapSize,
    /// World-space distance between neighbouring samples
    pub cell_size: f32,
    /// World-space height of a sample at 1.0
    pub max_height: f32,
    /// Brush radius in grid cells
    pub cursor_size: i32,
    /// Brush intensity
    pub cursor_strength: i32,
    pub layers: Vec<TerrainLayer>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            map_size: MapSize::Small,
            cell_size: 100.0,
            max_height: 512.0,
            cursor_size: 2,
            cursor_strength: 20,
            layers: Vec::new(),
        }
    }
}

impl TerrainConfig {
    /// Set the map size
    #[must_use]
    pub fn with_map_size(mut self, map_size: MapSize) -> Self {
        self.map_size = map_size;
        self
    }

    /// Set the cell size
    #[must_use]
    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Set the maximum height
    #[must_use]
    pub fn with_max_height(mut self, max_height: f32) -> Self {
        self.max_height = max_height;
        self
    }

    /// Set brush radius and strength
    #[must_use]
    pub fn with_cursor(mut self, size: i32, strength: i32) -> Self {
        self.cursor_size = size;
        self.cursor_strength = strength;
        self
    }

    /// Append a texture layer
    #[must_use]
    pub fn with_layer(mut self, layer: TerrainLayer) -> Self {
        self.layers.push(layer);
        self
    }
}

/// Scene persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Directory holding the scene documents
    pub scene_directory: PathBuf,
    /// Base file name of the scene documents
    pub scene_name: String,
    /// Number of backup generations kept per document
    pub backup_generations: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            scene_directory: PathBuf::from("scenes"),
            scene_name: String::from("world"),
            backup_generations: 4,
        }
    }
}

impl WorldConfig {
    /// Set where scene documents are stored
    #[must_use]
    pub fn with_scene(mut self, directory: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        self.scene_directory = directory.into();
        self.scene_name = name.into();
        self
    }

    /// Set the number of backup generations
    #[must_use]
    pub fn with_backup_generations(mut self, generations: usize) -> Self {
        self.backup_generations = generations;
        self
    }
}

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub world: WorldConfig,
    pub terrain: TerrainConfig,
}

impl EngineConfig {
    /// Replace the world settings
    #[must_use]
    pub fn with_world(mut self, world: WorldConfig) -> Self {
        self.world = world;
        self
    }

    /// Replace the terrain settings
    #[must_use]
    pub fn with_terrain(mut self, terrain: TerrainConfig) -> Self {
        self.terrain = terrain;
        self
    }

    /// Load a config from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        ron::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save the config to a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))
    }
}

/// Errors that can occur while loading or saving configuration
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// IO error
    IoError(String),
    /// Malformed or unserializable config
    ParseError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(msg) => write!(f, "Config IO error: {msg}"),
            Self::ParseError(msg) => write!(f, "Config parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
