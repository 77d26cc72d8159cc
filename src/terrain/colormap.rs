//! Splat weights used to blend terrain texture layers

use glam::Vec4;

/// Number of paintable layers
pub const LAYER_COUNT: usize = 4;

/// Lowest weight the fourth channel may reach
const MIN_ALPHA: f32 = 0.01;

/// Per-texel blend weights, one channel per layer.
///
/// May have a different resolution than the height raster it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    width: usize,
    height: usize,
    texels: Vec<Vec4>,
}

impl ColorMap {
    /// Initial weights: full first layer, opaque
    pub const DEFAULT_TEXEL: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);

    /// Create a map filled with [`Self::DEFAULT_TEXEL`]
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            texels: vec![Self::DEFAULT_TEXEL; width * height],
        }
    }

    /// Wrap existing texels. Returns `None` when the length does not match.
    #[must_use]
    pub fn from_texels(width: usize, height: usize, texels: Vec<Vec4>) -> Option<Self> {
        (texels.len() == width * height).then_some(Self {
            width,
            height,
            texels,
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Raw texel bytes for upload
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    /// Weights at `(x, y)`, if in bounds
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<Vec4> {
        (x < self.width && y < self.height).then(|| self.texels[x + y * self.width])
    }

    /// Overwrite the weights at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, weights: Vec4) {
        if x < self.width && y < self.height {
            self.texels[x + y * self.width] = weights;
        }
    }

    /// Nudge the texel toward `layer` and away from the others.
    ///
    /// Returns false for out-of-bounds texels and unknown layers.
    pub fn paint_texel(&mut self, x: i64, y: i64, layer: usize, amount: f32) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        let delta = match layer {
            0 => Vec4::new(amount, -amount, -amount, amount),
            1 => Vec4::new(-amount, amount, -amount, amount),
            2 => Vec4::new(-amount, -amount, amount, amount),
            3 => Vec4::splat(-amount),
            _ => return false,
        };

        let index = x as usize + y as usize * self.width;
        let mut weights = (self.texels[index] + delta).clamp(Vec4::ZERO, Vec4::ONE);
        weights.w = weights.w.max(MIN_ALPHA);
        self.texels[index] = weights;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_weights() {
        let map = ColorMap::new(4, 2);
        assert_eq!(map.texels().len(), 8);
        assert_eq!(map.get(3, 1), Some(ColorMap::DEFAULT_TEXEL));
        assert_eq!(map.get(4, 0), None);
        assert_eq!(map.as_bytes().len(), 8 * 16);
    }

    #[test]
    fn test_paint_moves_toward_layer() {
        let mut map = ColorMap::new(2, 2);
        assert!(map.paint_texel(1, 1, 1, 0.25));

        let texel = map.get(1, 1).unwrap();
        assert_eq!(texel, Vec4::new(0.75, 0.25, 0.0, 1.0));
    }

    #[test]
    fn test_alpha_floor() {
        let mut map = ColorMap::new(1, 1);
        for _ in 0..10 {
            map.paint_texel(0, 0, 3, 0.5);
        }
        let texel = map.get(0, 0).unwrap();
        assert_eq!(texel.truncate(), glam::Vec3::ZERO);
        assert!((texel.w - 0.01).abs() < 1e-6);
    }

    #[test]
    fn test_paint_ignores_bad_input() {
        let mut map = ColorMap::new(2, 2);
        assert!(!map.paint_texel(-1, 0, 0, 1.0));
        assert!(!map.paint_texel(0, 2, 0, 1.0));
        assert!(!map.paint_texel(0, 0, 7, 1.0));
        assert_eq!(map, ColorMap::new(2, 2));
    }

    #[test]
    fn test_from_texels_checks_length() {
        assert!(ColorMap::from_texels(2, 2, vec![Vec4::ZERO; 3]).is_none());
        assert!(ColorMap::from_texels(2, 2, vec![Vec4::ZERO; 4]).is_some());
    }
}
