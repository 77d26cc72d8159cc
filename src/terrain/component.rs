//! Renderable, editable terrain component
//!
//! Owns a [`HeightMap`] and draws it. In edit mode the pointer ray picks a
//! point on the terrain, moves the brush there and applies the active tool
//! for as long as the primary button is held.

use std::path::Path;

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use super::colormap::ColorMap;
use super::collision::Ray;
use super::heightmap::{HeightMap, TerrainError};
use crate::assets::{ContentError, ContentLoader, TextureHandle};
use crate::core::{MapSize, SceneError, TerrainConfig, TerrainLayer};
use crate::ecs::{Component, ComponentContext};
use crate::render::{
    DrawCall, MaterialId, RenderBackend, RenderFrame, RenderSettings, Renderable, ResourceId,
};

/// Edit applied while the pointer is held
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainTool {
    #[default]
    Raise,
    Lower,
    Smooth,
    /// Level the brush to the height sampled when the press started
    Flatten,
    /// Paint a color map layer
    Paint(usize),
    Ramp,
}

/// Persistent form of a terrain component
#[derive(Debug, Serialize, Deserialize)]
struct SavedTerrain {
    config: TerrainConfig,
    size: usize,
    heights: Vec<f32>,
    color_width: usize,
    color_height: usize,
    colors: Vec<Vec4>,
    settings: RenderSettings,
    #[serde(default)]
    tool: TerrainTool,
    #[serde(default)]
    flatten_height: f32,
}

/// Height-mapped ground attached to an entity
#[derive(Debug)]
pub struct TerrainComponent {
    config: TerrainConfig,
    map: HeightMap,
    settings: RenderSettings,
    tool: TerrainTool,
    editing: bool,
    /// Primary button state seen by the previous update
    was_down: bool,
    /// Last picked point, world space
    hover: Option<Vec3>,
    color_texture: ResourceId,
    layer_textures: Vec<TextureHandle>,
    layers_pending: bool,
    /// Color map first, then one slot per layer
    texture_slots: Vec<ResourceId>,
}

impl TerrainComponent {
    pub const KIND: &'static str = "terrain";

    /// Flat terrain sized by the config
    ///
    /// # Errors
    ///
    /// Returns an error if the configured size is below 2
    pub fn new(config: TerrainConfig) -> Result<Self, TerrainError> {
        let map = HeightMap::new(&config)?;
        Ok(Self::from_height_map(map, config))
    }

    /// Wrap an existing height map; `config` supplies the texture layers
    #[must_use]
    pub fn from_height_map(map: HeightMap, config: TerrainConfig) -> Self {
        let color_texture = ResourceId::next();
        Self {
            config,
            map,
            settings: RenderSettings::new(),
            tool: TerrainTool::default(),
            editing: false,
            was_down: false,
            hover: None,
            color_texture,
            layer_textures: Vec::new(),
            layers_pending: false,
            texture_slots: vec![color_texture],
        }
    }

    /// Restore a component saved with [`Component::save`]
    ///
    /// # Errors
    ///
    /// Returns an error if the data is malformed or the raster is invalid
    pub fn load(value: &serde_json::Value) -> Result<Self, SceneError> {
        let saved: SavedTerrain = serde_json::from_value(value.clone())
            .map_err(|e| SceneError::DeserializeError(e.to_string()))?;
        let mut map = HeightMap::from_samples(saved.size, saved.size, saved.heights, &saved.config)
            .map_err(|e| SceneError::DeserializeError(e.to_string()))?;

        match ColorMap::from_texels(saved.color_width, saved.color_height, saved.colors) {
            Some(colors) => map.set_color_map(colors),
            None => log::warn!("Saved terrain color map has the wrong size; using defaults"),
        }
        map.set_flatten_height(saved.flatten_height);

        let mut component = Self::from_height_map(map, saved.config);
        component.settings = saved.settings;
        component.tool = saved.tool;
        Ok(component)
    }

    fn saved(&self) -> SavedTerrain {
        let cursor = self.map.cursor();
        let mut config = self.config.clone();
        config.max_height = self.map.max_height();
        config.cell_size = self.map.cell_size();
        config.cursor_size = cursor.size;
        config.cursor_strength = cursor.strength;

        let colors = self.map.color_map();
        SavedTerrain {
            config,
            size: self.map.size(),
            heights: self.map.heights().to_vec(),
            color_width: colors.width(),
            color_height: colors.height(),
            colors: colors.texels().to_vec(),
            settings: self.settings,
            tool: self.tool,
            flatten_height: self.map.flatten_height(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn height_map(&self) -> &HeightMap {
        &self.map
    }

    pub fn height_map_mut(&mut self) -> &mut HeightMap {
        &mut self.map
    }

    #[must_use]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    #[must_use]
    pub fn layers(&self) -> &[TerrainLayer] {
        &self.config.layers
    }

    #[must_use]
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    #[must_use]
    pub fn tool(&self) -> TerrainTool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: TerrainTool) {
        self.tool = tool;
    }

    #[must_use]
    pub fn editing(&self) -> bool {
        self.editing
    }

    pub fn set_editing(&mut self, editing: bool) {
        self.editing = editing;
        if !editing {
            self.hover = None;
        }
    }

    /// Point picked by the last update, world space
    #[must_use]
    pub fn hover(&self) -> Option<Vec3> {
        self.hover
    }

    /// Rebuild the terrain at another size; samples and colors are reset
    ///
    /// # Errors
    ///
    /// Returns an error if the size is below 2
    pub fn resize(&mut self, map_size: MapSize) -> Result<(), TerrainError> {
        let mut config = self.config.clone();
        config.map_size = map_size;
        config.max_height = self.map.max_height();
        self.map = HeightMap::new(&config)?;
        self.config = config;
        self.hover = None;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    /// Cast a world-space ray at the terrain. On a hit the brush moves to
    /// the hit point, which is returned in world space.
    pub fn pick(&mut self, ray: &Ray, world_matrix: Mat4) -> Option<Vec3> {
        let local = ray.transformed(&world_matrix.inverse());
        self.hover = self.map.intersect(&local).map(|distance| {
            let point = local.at(distance);
            self.map.set_cursor_world(point);
            world_matrix.transform_point3(point)
        });
        self.hover
    }

    /// Apply the active tool once at the brush
    pub fn apply_tool(&mut self) {
        match self.tool {
            TerrainTool::Raise => self.map.raise_height(),
            TerrainTool::Lower => self.map.lower_height(),
            TerrainTool::Smooth => self.map.smooth(),
            TerrainTool::Flatten => {
                let target = self.map.flatten_height();
                self.map.flatten(target);
            }
            TerrainTool::Paint(layer) => {
                let (x, y) = self.map.cursor_cell();
                self.map.paint(x, y, layer);
            }
            TerrainTool::Ramp => self.map.create_ramp(),
        }
    }

    /// Use the sample under the brush as the flatten target
    fn sample_flatten_height(&mut self) {
        let (x, y) = self.map.cursor_cell();
        if x < 0 || y < 0 {
            return;
        }
        if let Some(height) = self.map.height(x as usize, y as usize) {
            self.map.set_flatten_height(height);
        }
    }

    // -------------------------------------------------------------------------
    // Content
    // -------------------------------------------------------------------------

    /// Resolve every layer texture through `loader`. Nothing changes if any
    /// layer fails to load.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error for the first missing or invalid layer
    pub fn load_textures(&mut self, loader: &mut dyn ContentLoader) -> Result<usize, ContentError> {
        let textures = self
            .config
            .layers
            .iter()
            .map(|layer| loader.load_texture(Path::new(&layer.texture)))
            .collect::<Result<Vec<_>, _>>()?;

        self.texture_slots = std::iter::once(self.color_texture)
            .chain(textures.iter().map(|t| t.resource))
            .collect();
        self.layer_textures = textures;
        self.layers_pending = true;
        Ok(self.layer_textures.len())
    }

    #[must_use]
    pub fn textures(&self) -> &[TextureHandle] {
        &self.layer_textures
    }
}

impl Default for TerrainComponent {
    fn default() -> Self {
        let config = TerrainConfig::default();
        let map = HeightMap::flat(config.map_size.edge(), &config);
        Self::from_height_map(map, config)
    }
}

impl Renderable for TerrainComponent {
    fn render_layer(&self) -> i32 {
        self.settings.render_layer()
    }

    fn layer_depth(&self) -> f32 {
        self.settings.layer_depth()
    }

    fn material(&self) -> Option<MaterialId> {
        self.settings.material()
    }

    fn render(&mut self, frame: &RenderFrame<'_>, backend: &mut dyn RenderBackend) {
        let dirty = self.map.take_dirty();

        if dirty.heights || self.map.mesh().needs_upload() {
            let mesh = self.map.mesh();
            backend.upload_mesh(mesh.id(), mesh.vertex_bytes(), mesh.index_bytes());
            self.map.mesh_mut().mark_uploaded();
        }
        if dirty.colors {
            // RGBA32F splat weights
            let colors = self.map.color_map();
            backend.upload_texture(
                self.color_texture,
                colors.width() as u32,
                colors.height() as u32,
                colors.as_bytes(),
            );
        }
        if self.layers_pending {
            for texture in &self.layer_textures {
                backend.upload_texture(texture.resource, texture.width, texture.height, &texture.rgba);
            }
            self.layers_pending = false;
        }

        let mesh = self.map.mesh();
        backend.draw(&DrawCall {
            mesh: mesh.id(),
            index_count: mesh.index_count(),
            world_matrix: frame.world_matrix,
            material: self.settings.material(),
            textures: &self.texture_slots,
            lights: frame.lights,
        });
    }
}

impl Component for TerrainComponent {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>) {
        let pointer = ctx.frame.pointer;
        if self.editing {
            let hit = pointer.ray.and_then(|ray| self.pick(&ray, ctx.world_matrix));
            if hit.is_some() && pointer.primary_down {
                if !self.was_down && self.tool == TerrainTool::Flatten {
                    self.sample_flatten_height();
                }
                self.apply_tool();
            }
        }
        self.was_down = pointer.primary_down;
    }

    fn as_renderable(&self) -> Option<&dyn Renderable> {
        Some(self)
    }

    fn as_renderable_mut(&mut self) -> Option<&mut dyn Renderable> {
        Some(self)
    }

    fn save(&self) -> Option<serde_json::Value> {
        match serde_json::to_value(self.saved()) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Could not save terrain: {e}");
                None
            }
        }
    }
}
