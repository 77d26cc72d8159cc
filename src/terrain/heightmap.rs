//! Editable height field
//!
//! Samples are stored normalized to `[0, 1]`; world-space height is always
//! `sample * max_height`. The vertex mesh, the collision triangles and the
//! quadtree are derived from the samples and refreshed together after
//! every edit.

use std::path::Path;

use glam::{Vec2, Vec3, Vec4};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use super::colormap::ColorMap;
use super::collision::{Ray, Triangle};
use super::noise::{self, GenerationType};
use super::quadtree::QuadTree;
use crate::core::TerrainConfig;
use crate::render::{Mesh, Vertex};

/// Per-step delta of `raise_height`, multiplied by the brush strength
const RAISE_FACTOR: f32 = 0.0005;
/// Per-step delta of `lower_height`, multiplied by the brush strength
const LOWER_FACTOR: f32 = 0.0001;
/// Slopes steeper than this are painted with the third layer
const STEEP_SLOPE: f32 = std::f32::consts::FRAC_PI_4;

/// Brush used by the edit operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushCursor {
    /// Center in normalized grid coordinates, `[0, 1]` on both axes
    pub position: Vec2,
    /// Radius in grid cells
    pub size: i32,
    /// Intensity
    pub strength: i32,
}

/// GPU resources that need re-upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerrainDirty {
    pub heights: bool,
    pub colors: bool,
}

/// Errors raised while creating a height map
#[derive(Debug, Clone, PartialEq)]
pub enum TerrainError {
    /// The height raster must be square
    NotSquare { width: usize, height: usize },
    /// At least 2x2 samples are needed for one cell
    SizeTooSmall(usize),
    /// Sample buffer does not match the dimensions
    SampleCount { expected: usize, actual: usize },
    /// Image decoding or encoding failed
    ImageError(String),
}

impl std::fmt::Display for TerrainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSquare { width, height } => {
                write!(f, "Height map must be square, got {width}x{height}")
            }
            Self::SizeTooSmall(size) => write!(f, "Height map size {size} is below 2"),
            Self::SampleCount { expected, actual } => {
                write!(f, "Expected {expected} height samples, got {actual}")
            }
            Self::ImageError(msg) => write!(f, "Height map image error: {msg}"),
        }
    }
}

impl std::error::Error for TerrainError {}

/// Square height raster with its derived mesh and collision data
#[derive(Debug)]
pub struct HeightMap {
    size: usize,
    cell_size: f32,
    max_height: f32,
    /// Normalized samples, row-major (`x + y * size`)
    heights: Vec<f32>,
    colors: ColorMap,
    mesh: Mesh,
    /// Two triangles per cell, `2 * (x + y * (size - 1))`
    triangles: Vec<Triangle>,
    tree: QuadTree,
    highest: f32,
    lowest: f32,
    cursor: BrushCursor,
    flatten_height: f32,
    dirty: TerrainDirty,
}

impl HeightMap {
    /// Create a flat map sized by the config
    ///
    /// # Errors
    ///
    /// Returns an error if the configured size is below 2
    pub fn new(config: &TerrainConfig) -> Result<Self, TerrainError> {
        let size = config.map_size.edge();
        if size < 2 {
            return Err(TerrainError::SizeTooSmall(size));
        }
        Ok(Self::flat(size, config))
    }

    /// Flat map with `edge` samples per side (at least 2)
    #[must_use]
    pub fn flat(edge: usize, config: &TerrainConfig) -> Self {
        let size = edge.max(2);
        Self::build(size, vec![0.0; size * size], config)
    }

    /// Create a map from normalized samples (clamped to `[0, 1]`)
    ///
    /// # Errors
    ///
    /// Returns an error if the raster is not square, too small, or the
    /// sample count does not match
    pub fn from_samples(
        width: usize,
        height: usize,
        samples: Vec<f32>,
        config: &TerrainConfig,
    ) -> Result<Self, TerrainError> {
        if width != height {
            return Err(TerrainError::NotSquare { width, height });
        }
        if width < 2 {
            return Err(TerrainError::SizeTooSmall(width));
        }
        if samples.len() != width * height {
            return Err(TerrainError::SampleCount {
                expected: width * height,
                actual: samples.len(),
            });
        }
        Ok(Self::build(width, samples, config))
    }

    fn build(size: usize, mut samples: Vec<f32>, config: &TerrainConfig) -> Self {
        for sample in &mut samples {
            *sample = sample.clamp(0.0, 1.0);
        }

        let mut map = Self {
            size,
            cell_size: config.cell_size,
            max_height: config.max_height,
            heights: samples,
            colors: ColorMap::new(size, size),
            mesh: Mesh::from_data(Vec::new(), Self::build_indices(size)),
            triangles: Vec::new(),
            tree: QuadTree::build(&[], 0, config.cell_size),
            highest: 0.0,
            lowest: 0.0,
            cursor: BrushCursor {
                position: Vec2::ZERO,
                size: config.cursor_size,
                strength: config.cursor_strength,
            },
            flatten_height: 0.0,
            dirty: TerrainDirty::default(),
        };
        map.rebuild_all();
        log::info!(
            "Created {size}x{size} height map (cell size {}, max height {})",
            map.cell_size,
            map.max_height
        );
        map
    }

    /// Load samples from the luminance of an image file
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be read or is not square
    pub fn from_image(path: impl AsRef<Path>, config: &TerrainConfig) -> Result<Self, TerrainError> {
        let image = image::open(path.as_ref())
            .map_err(|e| TerrainError::ImageError(e.to_string()))?
            .to_luma8();
        let (width, height) = (image.width() as usize, image.height() as usize);
        let samples = image.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect();
        Self::from_samples(width, height, samples, config)
    }

    /// Write the samples as an 8-bit grayscale image
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be encoded or written
    pub fn save_image(&self, path: impl AsRef<Path>) -> Result<(), TerrainError> {
        let pixels = self.heights.iter().map(|h| (h * 255.0).round() as u8).collect();
        let edge = self.size as u32;
        let image = image::GrayImage::from_raw(edge, edge, pixels).ok_or_else(|| {
            TerrainError::ImageError(String::from("sample buffer does not fit the image"))
        })?;
        image
            .save(path.as_ref())
            .map_err(|e| TerrainError::ImageError(e.to_string()))
    }

    fn build_indices(size: usize) -> Vec<u32> {
        let cells = size - 1;
        let mut indices = Vec::with_capacity(cells * cells * 6);
        for y in 0..cells {
            for x in 0..cells {
                let lower_left = (x + y * size) as u32;
                let lower_right = lower_left + 1;
                let upper_left = lower_left + size as u32;
                let upper_right = upper_left + 1;
                indices.extend_from_slice(&[
                    lower_left,
                    lower_right,
                    upper_left,
                    lower_right,
                    upper_right,
                    upper_left,
                ]);
            }
        }
        indices
    }

    // -------------------------------------------------------------------------
    // Getters
    // -------------------------------------------------------------------------

    /// Samples along one edge
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[must_use]
    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// World-space edge length of the mesh
    #[must_use]
    pub fn world_extent(&self) -> f32 {
        (self.size - 1) as f32 * self.cell_size
    }

    /// All normalized samples, row-major
    #[must_use]
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Normalized sample at `(x, y)`
    #[must_use]
    pub fn height(&self, x: usize, y: usize) -> Option<f32> {
        (x < self.size && y < self.size).then(|| self.heights[x + y * self.size])
    }

    /// Highest normalized sample
    #[must_use]
    pub fn highest(&self) -> f32 {
        self.highest
    }

    /// Lowest normalized sample
    #[must_use]
    pub fn lowest(&self) -> f32 {
        self.lowest
    }

    #[must_use]
    pub fn color_map(&self) -> &ColorMap {
        &self.colors
    }

    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[must_use]
    pub fn quad_tree(&self) -> &QuadTree {
        &self.tree
    }

    #[must_use]
    pub fn cursor(&self) -> BrushCursor {
        self.cursor
    }

    #[must_use]
    pub fn flatten_height(&self) -> f32 {
        self.flatten_height
    }

    /// Consume the pending re-upload flags
    pub fn take_dirty(&mut self) -> TerrainDirty {
        std::mem::take(&mut self.dirty)
    }

    // -------------------------------------------------------------------------
    // Brush
    // -------------------------------------------------------------------------

    /// Move the brush, in normalized grid coordinates
    pub fn set_cursor_position(&mut self, position: Vec2) {
        self.cursor.position = position;
    }

    /// Move the brush to the grid point under a local-space position
    pub fn set_cursor_world(&mut self, point: Vec3) {
        let span = self.size as f32 * self.cell_size;
        self.cursor.position = Vec2::new(point.x / span, point.z / span);
    }

    pub fn set_cursor_size(&mut self, size: i32) {
        self.cursor.size = size.max(0);
    }

    pub fn set_cursor_strength(&mut self, strength: i32) {
        self.cursor.strength = strength;
    }

    /// Target used by terrain tools that flatten
    pub fn set_flatten_height(&mut self, height: f32) {
        self.flatten_height = height.clamp(0.0, 1.0);
    }

    /// Grid sample under the brush center
    #[must_use]
    pub fn cursor_cell(&self) -> (i64, i64) {
        let size = self.size as f32;
        (
            (self.cursor.position.x * size).floor() as i64,
            (self.cursor.position.y * size).floor() as i64,
        )
    }

    fn index_of(&self, x: i64, y: i64) -> Option<usize> {
        let size = self.size as i64;
        (x >= 0 && y >= 0 && x < size && y < size).then(|| (x + y * size) as usize)
    }

    /// Grid offsets inside the brush circle, with their distance from the center
    fn brush_offsets(&self) -> impl Iterator<Item = (i64, i64, f32)> + use<> {
        let radius = i64::from(self.cursor.size.max(0));
        (-radius..=radius).flat_map(move |v| {
            (-radius..=radius).filter_map(move |w| {
                let distance = ((v * v + w * w) as f32).sqrt();
                (distance <= radius as f32).then_some((v, w, distance))
            })
        })
    }

    // -------------------------------------------------------------------------
    // Edit operations
    // -------------------------------------------------------------------------

    /// Raise the samples under the brush
    pub fn raise_height(&mut self) {
        self.adjust_height(self.cursor.strength as f32 * RAISE_FACTOR);
    }

    /// Lower the samples under the brush
    pub fn lower_height(&mut self) {
        self.adjust_height(-(self.cursor.strength as f32 * LOWER_FACTOR));
    }

    /// Add `amount * (radius - distance) / 2` to every sample in the brush
    pub fn adjust_height(&mut self, amount: f32) {
        let (cx, cy) = self.cursor_cell();
        let radius = self.cursor.size as f32;
        let changes: Vec<(usize, f32)> = self
            .brush_offsets()
            .filter_map(|(v, w, distance)| {
                let index = self.index_of(cx + v, cy + w)?;
                Some((index, self.heights[index] + amount * (radius - distance) / 2.0))
            })
            .collect();
        self.apply_height_changes(changes);
    }

    /// Blend every sample in the brush with the average of its neighbours
    pub fn smooth(&mut self) {
        let (cx, cy) = self.cursor_cell();
        let changes: Vec<(usize, f32)> = self
            .brush_offsets()
            .filter_map(|(v, w, _)| {
                let (x, y) = (cx + v, cy + w);
                let index = self.index_of(x, y)?;
                let average = self.neighbour_average(x, y)?;
                Some((index, (self.heights[index] + average) * 0.5))
            })
            .collect();
        self.apply_height_changes(changes);
    }

    /// Set every sample within the brush to `target`
    pub fn flatten(&mut self, target: f32) {
        let (cx, cy) = self.cursor_cell();
        let radius = i64::from(self.cursor.size.max(0));
        let target = target.clamp(0.0, 1.0);

        let mut changes = Vec::new();
        for v in -radius..=radius {
            for w in -radius..=radius {
                if v * v + w * w >= radius * radius {
                    continue;
                }
                if let Some(index) = self.index_of(cx + v, cy + w) {
                    changes.push((index, target));
                }
            }
        }
        self.apply_height_changes(changes);
    }

    /// Replace every sample in the brush with its 3x3 neighbourhood average
    pub fn create_ramp(&mut self) {
        let (cx, cy) = self.cursor_cell();
        let changes: Vec<(usize, f32)> = self
            .brush_offsets()
            .filter_map(|(v, w, _)| {
                let (x, y) = (cx + v, cy + w);
                let index = self.index_of(x, y)?;
                Some((index, self.area_average(x, y)))
            })
            .collect();
        self.apply_height_changes(changes);
    }

    /// Paint `layer` into the color map around grid sample `(x, y)`.
    ///
    /// The color map may have another resolution; coordinates and radius
    /// are rescaled to it.
    pub fn paint(&mut self, x: i64, y: i64, layer: usize) {
        let amount = self.cursor.strength as f32 / 100.0;
        let scale_x = self.colors.width() as f32 / self.size as f32;
        let scale_y = self.colors.height() as f32 / self.size as f32;
        let center_x = (x as f32 * scale_x) as i64;
        let center_y = (y as f32 * scale_y) as i64;
        let radius = self.cursor.size as f32 * scale_x;
        if radius <= 0.0 {
            return;
        }

        let reach = radius.ceil() as i64;
        let mut painted = false;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let distance = ((dx * dx + dy * dy) as f32).sqrt();
                if distance >= radius {
                    continue;
                }
                let falloff = amount * (1.0 - distance / radius);
                painted |= self.colors.paint_texel(center_x + dx, center_y + dy, layer, falloff);
            }
        }
        if painted {
            self.dirty.colors = true;
        }
    }

    /// Replace the color map, e.g. with one loaded at another resolution
    pub fn set_color_map(&mut self, colors: ColorMap) {
        self.colors = colors;
        self.dirty.colors = true;
    }

    /// Derive splat weights from heights and slopes.
    ///
    /// Low ground favours the first layer, high ground the second, and
    /// slopes steeper than 45 degrees the third.
    pub fn generate_color_map(&mut self) {
        let (width, height) = (self.colors.width(), self.colors.height());
        let range = (self.highest - self.lowest).max(f32::EPSILON);
        for py in 0..height {
            for px in 0..width {
                let gx = (px * self.size / width.max(1)).min(self.size - 1);
                let gy = (py * self.size / height.max(1)).min(self.size - 1);
                let index = gx + gy * self.size;

                let slope = self.mesh.vertices[index].normal().angle_between(Vec3::Y);
                let weights = if slope > STEEP_SLOPE {
                    Vec4::new(0.0, 0.0, 1.0, 1.0)
                } else {
                    let relative = (self.heights[index] - self.lowest) / range;
                    Vec4::new(1.0 - relative, relative, 0.0, 1.0)
                };
                self.colors.set(px, py, weights);
            }
        }
        self.dirty.colors = true;
    }

    // -------------------------------------------------------------------------
    // Whole-map operations
    // -------------------------------------------------------------------------

    /// Smooth every sample
    pub fn smooth_all(&mut self) {
        let size = self.size as i64;
        let smoothed: Vec<f32> = (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                let own = self.heights[i as usize];
                self.neighbour_average(x, y).map_or(own, |avg| (own + avg) * 0.5)
            })
            .collect();
        self.heights = smoothed;
        self.rebuild_all();
    }

    /// Fill with seeded noise, or add full-range noise to the current
    /// samples.
    ///
    /// The result is shifted so the lowest sample sits at 0.
    pub fn randomize(&mut self, generation: GenerationType, seed: u64, additive: bool) {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let noise = match generation {
            GenerationType::Random => noise::random_noise(self.size, &mut rng),
            GenerationType::PerlinNoise => {
                noise::octave_noise(self.size, noise::DEFAULT_OCTAVES, &mut rng)
            }
        };
        for (sample, value) in self.heights.iter_mut().zip(noise) {
            *sample = if additive { *sample + value } else { value };
        }

        let lowest = self.heights.iter().copied().fold(f32::INFINITY, f32::min);
        for sample in &mut self.heights {
            *sample = (*sample - lowest).clamp(0.0, 1.0);
        }
        log::debug!("Randomized {0}x{0} height map ({generation:?}, additive {additive})", self.size);
        self.rebuild_all();
    }

    /// Change the world-space height of a full sample.
    ///
    /// Samples are rescaled so world-space heights stay put where the new
    /// range allows it.
    pub fn set_max_height(&mut self, max_height: f32) {
        if max_height <= 0.0 {
            log::warn!("Ignoring non-positive max height {max_height}");
            return;
        }
        let ratio = self.max_height / max_height;
        for sample in &mut self.heights {
            *sample = (*sample * ratio).clamp(0.0, 1.0);
        }
        self.max_height = max_height;
        self.rebuild_all();
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Local-space height of the terrain under `position`.
    ///
    /// Returns `position.y` unchanged when the position is off the map.
    #[must_use]
    pub fn ground_height(&self, position: Vec3) -> f32 {
        let cells = (self.size - 1) as f32;
        let fx = (position.x / self.cell_size).floor();
        let fy = (position.z / self.cell_size).floor();
        // NaN fails both comparisons
        if !(fx >= 0.0 && fx < cells && fy >= 0.0 && fy < cells) {
            return position.y;
        }
        let (cx, cy) = (fx as usize, fy as usize);

        let c0 = self.vertex_position(cx, cy);
        let c1 = self.vertex_position(cx + 1, cy);
        let c2 = self.vertex_position(cx, cy + 1);
        let c3 = self.vertex_position(cx + 1, cy + 1);
        if c0.y == c1.y && c0.y == c2.y && c0.y == c3.y {
            return c0.y;
        }

        let origin = Vec3::new(position.x, self.lowest * self.max_height - 1.0, position.z);
        let ray = Ray::new(origin, Vec3::Y);
        [Triangle::new(c0, c2, c1), Triangle::new(c1, c2, c3)]
            .iter()
            .find_map(|triangle| triangle.intersect_ray(&ray))
            .map_or(position.y, |distance| origin.y + distance)
    }

    /// Closest hit distance of a local-space ray
    #[must_use]
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        self.tree.intersect_closest(ray, &self.triangles)
    }

    // -------------------------------------------------------------------------
    // Derived data
    // -------------------------------------------------------------------------

    fn neighbour_average(&self, x: i64, y: i64) -> Option<f32> {
        let mut total = 0.0;
        let mut count = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if let Some(index) = self.index_of(x + dx, y + dy) {
                    total += self.heights[index];
                    count += 1;
                }
            }
        }
        (count > 0).then(|| total / count as f32)
    }

    fn area_average(&self, x: i64, y: i64) -> f32 {
        let mut total = 0.0;
        let mut count = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(index) = self.index_of(x + dx, y + dy) {
                    total += self.heights[index];
                    count += 1;
                }
            }
        }
        total / count.max(1) as f32
    }

    fn vertex_position(&self, x: usize, y: usize) -> Vec3 {
        Vec3::new(
            x as f32 * self.cell_size,
            self.heights[x + y * self.size] * self.max_height,
            y as f32 * self.cell_size,
        )
    }

    /// Forward-difference normal; the last row and column point straight up
    fn vertex_normal(&self, x: usize, y: usize) -> Vec3 {
        if x + 1 >= self.size || y + 1 >= self.size {
            return Vec3::Y;
        }
        let a = self.vertex_position(x, y);
        let b = self.vertex_position(x + 1, y);
        let c = self.vertex_position(x + 1, y + 1);
        let d = self.vertex_position(x, y + 1);

        let normal = (a - c).cross(a - b) + (b - d).cross(b - c);
        if normal.length_squared() > 0.0 {
            normal.normalize()
        } else {
            Vec3::Y
        }
    }

    fn cell_triangles(&self, x: usize, y: usize) -> [Triangle; 2] {
        let lower_left = self.vertex_position(x, y);
        let lower_right = self.vertex_position(x + 1, y);
        let upper_left = self.vertex_position(x, y + 1);
        let upper_right = self.vertex_position(x + 1, y + 1);
        [
            Triangle::new(lower_left, upper_left, lower_right),
            Triangle::new(lower_right, upper_left, upper_right),
        ]
    }

    fn first_triangle(&self, x: usize, y: usize) -> usize {
        (x + y * (self.size - 1)) * 2
    }

    /// Regenerate every derived structure from the samples
    fn rebuild_all(&mut self) {
        let size = self.size;
        let mut vertices = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                vertices.push(Vertex::new(
                    self.vertex_position(x, y).to_array(),
                    self.vertex_normal(x, y).to_array(),
                    [x as f32 / size as f32, y as f32 / size as f32],
                ));
            }
        }
        self.mesh.vertices = vertices;
        self.mesh.mark_dirty();

        let cells = size - 1;
        let mut triangles = Vec::with_capacity(cells * cells * 2);
        for y in 0..cells {
            for x in 0..cells {
                triangles.extend(self.cell_triangles(x, y));
            }
        }
        self.triangles = triangles;
        self.tree = QuadTree::build(&self.triangles, cells, self.cell_size);

        self.recompute_extremes();
        self.dirty = TerrainDirty {
            heights: true,
            colors: true,
        };
        log::debug!("Rebuilt {size}x{size} height map");
    }

    fn recompute_extremes(&mut self) {
        let (lowest, highest) = self
            .heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| (lo.min(h), hi.max(h)));
        self.lowest = lowest;
        self.highest = highest;
    }

    /// Write new sample values and refresh what depends on them
    fn apply_height_changes(&mut self, changes: Vec<(usize, f32)>) {
        if changes.is_empty() {
            return;
        }

        let mut rescan = false;
        let mut touched = Vec::with_capacity(changes.len());
        for (index, value) in changes {
            let old = self.heights[index];
            let value = value.clamp(0.0, 1.0);
            self.heights[index] = value;
            touched.push(index);

            if value > self.highest {
                self.highest = value;
            } else if old >= self.highest && value < old {
                rescan = true;
            }
            if value < self.lowest {
                self.lowest = value;
            } else if old <= self.lowest && value > old {
                rescan = true;
            }
        }
        if rescan {
            self.recompute_extremes();
        }

        self.refresh_region(&touched);
    }

    /// Refresh vertices, normals, triangles and tree bounds around samples
    fn refresh_region(&mut self, touched: &[usize]) {
        let size = self.size;
        for &index in touched {
            self.mesh.vertices[index].position[1] = self.heights[index] * self.max_height;
        }

        // A sample is a corner of up to four cells. The same cells' lower-left
        // vertices are the ones whose forward-difference normals read it.
        let mut cells: Vec<(usize, usize)> = Vec::with_capacity(touched.len() * 4);
        for &index in touched {
            let (x, y) = (index % size, index / size);
            for cy in y.saturating_sub(1)..=y {
                for cx in x.saturating_sub(1)..=x {
                    if cx + 1 < size && cy + 1 < size {
                        cells.push((cx, cy));
                    }
                }
            }
        }
        cells.sort_unstable();
        cells.dedup();

        for &(x, y) in &cells {
            self.mesh.vertices[x + y * size].normal = self.vertex_normal(x, y).to_array();

            let first = self.first_triangle(x, y);
            let [t0, t1] = self.cell_triangles(x, y);
            self.triangles[first] = t0;
            self.triangles[first + 1] = t1;
        }
        for &(x, y) in &cells {
            let first = self.first_triangle(x, y);
            self.tree.refresh_bounding_box(first, &self.triangles);
            self.tree.refresh_bounding_box(first + 1, &self.triangles);
        }

        self.mesh.mark_dirty();
        self.dirty.heights = true;
    }
}
