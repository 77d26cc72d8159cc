//! Component construction by name
//!
//! Maps a stable string key to a constructor and a loader so components
//! can be added by name and restored from scene documents.

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Component;
use super::components::Rotator;
use crate::core::SceneError;
use crate::terrain::TerrainComponent;

type CreateFn = Box<dyn Fn() -> Box<dyn Component>>;
type LoadFn = Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn Component>, String>>;

struct FactoryEntry {
    create: CreateFn,
    load: LoadFn,
}

/// Registry of known component kinds
#[derive(Default)]
pub struct ComponentFactory {
    entries: FxHashMap<String, FactoryEntry>,
}

impl std::fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentFactory")
            .field("kinds", &self.names())
            .finish()
    }
}

impl ComponentFactory {
    /// Empty factory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with the crate's own components registered
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register::<Rotator>(Rotator::KIND);
        factory.register_with(
            TerrainComponent::KIND,
            || Box::new(TerrainComponent::default()) as Box<dyn Component>,
            |value| {
                TerrainComponent::load(value)
                    .map(|c| Box::new(c) as Box<dyn Component>)
                    .map_err(|e| e.to_string())
            },
        );
        factory
    }

    /// Register a serde component under `kind`
    pub fn register<T>(&mut self, kind: &str)
    where
        T: Component + Default + Serialize + DeserializeOwned,
    {
        self.register_with(
            kind,
            || Box::new(T::default()) as Box<dyn Component>,
            |value| {
                let typed: T = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
                Ok(Box::new(typed) as Box<dyn Component>)
            },
        );
    }

    /// Register a component with custom construction and loading
    pub fn register_with(
        &mut self,
        kind: &str,
        create: impl Fn() -> Box<dyn Component> + 'static,
        load: impl Fn(&serde_json::Value) -> Result<Box<dyn Component>, String> + 'static,
    ) {
        if self.entries.contains_key(kind) {
            log::warn!("Replacing component factory entry '{kind}'");
        }
        self.entries.insert(
            kind.to_owned(),
            FactoryEntry {
                create: Box::new(create),
                load: Box::new(load),
            },
        );
    }

    /// Construct a default component of `kind`
    #[must_use]
    pub fn create(&self, kind: &str) -> Option<Box<dyn Component>> {
        self.entries.get(kind).map(|entry| (entry.create)())
    }

    /// Restore a component of `kind` from saved data
    ///
    /// # Errors
    ///
    /// Returns an error if `kind` is unknown or the data does not match it
    pub fn load(&self, kind: &str, data: &serde_json::Value) -> Result<Box<dyn Component>, SceneError> {
        let entry = self
            .entries
            .get(kind)
            .ok_or_else(|| SceneError::UnknownComponent(kind.to_owned()))?;
        (entry.load)(data).map_err(|e| SceneError::DeserializeError(format!("{kind}: {e}")))
    }

    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Registered kinds, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
