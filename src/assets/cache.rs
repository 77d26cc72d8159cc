//! Path-deduplicating front for a content loader

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::{ContentError, ContentLoader, ModelHandle, TextureHandle};

/// Remembers what a loader returned so each path is loaded once
#[derive(Debug)]
pub struct ContentCache<L> {
    loader: L,
    textures: FxHashMap<PathBuf, TextureHandle>,
    models: FxHashMap<PathBuf, ModelHandle>,
}

impl<L: ContentLoader> ContentCache<L> {
    #[must_use]
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            textures: FxHashMap::default(),
            models: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn contains_path(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        self.textures.contains_key(path) || self.models.contains_key(path)
    }

    /// Number of cached assets
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len() + self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached handle; assets still referenced elsewhere stay alive
    pub fn clear(&mut self) {
        self.textures.clear();
        self.models.clear();
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }
}

impl<L: ContentLoader> ContentLoader for ContentCache<L> {
    fn load_texture(&mut self, path: &Path) -> Result<TextureHandle, ContentError> {
        if let Some(handle) = self.textures.get(path) {
            return Ok(handle.clone());
        }
        let handle = self.loader.load_texture(path)?;
        self.textures.insert(path.to_path_buf(), handle.clone());
        Ok(handle)
    }

    fn load_model(&mut self, path: &Path) -> Result<ModelHandle, ContentError> {
        if let Some(handle) = self.models.get(path) {
            return Ok(handle.clone());
        }
        let handle = self.loader.load_model(path)?;
        self.models.insert(path.to_path_buf(), handle.clone());
        Ok(handle)
    }
}
