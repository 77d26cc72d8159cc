//! Content loading
//!
//! The host supplies a [`ContentLoader`]; the core only asks it for
//! textures and models by path and propagates its failures. A
//! [`ContentCache`] in front of a loader deduplicates by path.

mod cache;
mod handle;

use std::path::{Path, PathBuf};

use crate::render::{Mesh, ResourceId};

pub use cache::ContentCache;
pub use handle::AssetHandle;

/// Decoded RGBA8 texture
#[derive(Debug)]
pub struct Texture {
    /// Backend key the texels are uploaded under
    pub resource: ResourceId,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Texture {
    #[must_use]
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self {
            resource: ResourceId::next(),
            width,
            height,
            rgba,
        }
    }
}

/// A set of meshes loaded from one file
#[derive(Debug, Default)]
pub struct Model {
    pub meshes: Vec<Mesh>,
}

pub type TextureHandle = AssetHandle<Texture>;
pub type ModelHandle = AssetHandle<Model>;

/// Content-loading collaborator
pub trait ContentLoader {
    /// Load a texture by path
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be decoded
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, ContentError>;

    /// Load a model by path
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be decoded
    fn load_model(&mut self, path: &Path) -> Result<ModelHandle, ContentError> {
        Err(ContentError::Invalid {
            path: path.to_path_buf(),
            reason: String::from("model loading is not supported by this loader"),
        })
    }
}

/// Reads textures from disk relative to a root directory
#[derive(Debug, Clone)]
pub struct DiskLoader {
    root: PathBuf,
}

impl DiskLoader {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ContentLoader for DiskLoader {
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, ContentError> {
        let full = self.root.join(path);
        if !full.exists() {
            return Err(ContentError::NotFound(full));
        }
        let image = image::open(&full)
            .map_err(|e| ContentError::Invalid {
                path: full.clone(),
                reason: e.to_string(),
            })?
            .to_rgba8();
        log::debug!("Loaded texture {} ({}x{})", full.display(), image.width(), image.height());
        Ok(AssetHandle::new(Texture::new(
            image.width(),
            image.height(),
            image.into_raw(),
        )))
    }
}

/// Errors reported by content loaders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// No asset at the path
    NotFound(PathBuf),
    /// The asset exists but could not be decoded
    Invalid { path: PathBuf, reason: String },
}

impl std::fmt::Display for ContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "Asset not found: {}", path.display()),
            Self::Invalid { path, reason } => {
                write!(f, "Invalid asset {}: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for ContentError {}
