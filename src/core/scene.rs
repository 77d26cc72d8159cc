//! Scene persistence
//!
//! A scene is stored as two JSON documents side by side: `<name>.entities`
//! holds the entity array and `<name>.components` the component list, each
//! component naming its owner entity and its kind. Every overwrite first
//! rotates older copies into numbered backups.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::WorldConfig;
use crate::ecs::{ComponentFactory, Entity, EntityId, Transform, World};

const ENTITIES_EXTENSION: &str = "entities";
const COMPONENTS_EXTENSION: &str = "components";

/// A serializable entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedEntity {
    pub name: String,
    #[serde(default)]
    pub tag: i32,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub update_order: i32,
    #[serde(default = "interval_default")]
    pub update_interval: u32,
    /// Local transform
    #[serde(default)]
    pub transform: Transform,
    /// Index of the parent in the entity document
    #[serde(default)]
    pub parent_index: Option<usize>,
}

fn enabled_default() -> bool {
    true
}

fn interval_default() -> u32 {
    1
}

/// A serializable component tagged with its owner and kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedComponent {
    /// Name of the owning entity
    pub owner: String,
    /// Factory key
    pub kind: String,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Both documents of a scene, in memory
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    pub entities: Vec<SerializedEntity>,
    pub components: Vec<SerializedComponent>,
}

impl SceneSnapshot {
    /// Capture the committed entities of a world in update order.
    /// Components whose `save` returns `None` are not persisted.
    #[must_use]
    pub fn capture(world: &World) -> Self {
        let ids = world.entities().ids();
        let index_of = |id: EntityId| ids.iter().position(|&e| e == id);

        let mut snapshot = Self::default();
        for entity in world.entities().iter() {
            snapshot.entities.push(SerializedEntity {
                name: entity.name().to_owned(),
                tag: entity.tag(),
                enabled: entity.enabled(),
                update_order: entity.update_order(),
                update_interval: entity.update_interval(),
                transform: entity.transform().clone(),
                parent_index: entity.transform().parent().and_then(index_of),
            });

            for (_, enabled, component) in entity.components().iter() {
                let Some(data) = component.save() else {
                    continue;
                };
                snapshot.components.push(SerializedComponent {
                    owner: entity.name().to_owned(),
                    kind: component.kind().to_owned(),
                    enabled,
                    data,
                });
            }
        }
        snapshot
    }

    /// Replace the contents of `world` with this snapshot and flush once.
    /// Each component goes to the first entity whose name matches its
    /// owner. Returns the number of entities loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if a component kind is unknown to `factory` or its
    /// data does not match the kind. The world is left empty in that case.
    pub fn restore(&self, world: &mut World, factory: &ComponentFactory) -> Result<usize, SceneError> {
        world.remove_all_entities();

        let mut entities: Vec<Entity> = self
            .entities
            .iter()
            .map(|saved| {
                // Hierarchy links are restored below from parent indices
                let local = &saved.transform;
                Entity::new(saved.name.clone())
                    .with_tag(saved.tag)
                    .with_update_order(saved.update_order)
                    .with_update_interval(saved.update_interval)
                    .with_transform(Transform::from_parts(
                        local.position(),
                        local.rotation(),
                        local.scale(),
                    ))
            })
            .collect();

        for saved in &self.components {
            let Some(owner) = entities.iter_mut().find(|e| e.name() == saved.owner) else {
                log::warn!(
                    "Skipping '{}' component: no entity named '{}'",
                    saved.kind,
                    saved.owner
                );
                continue;
            };
            let component = factory.load(&saved.kind, &saved.data)?;
            let id = owner.add_boxed_component(component);
            if !saved.enabled {
                owner.set_component_enabled(id, false);
            }
        }

        let ids: Vec<EntityId> = entities.iter().map(Entity::id).collect();
        for (entity, saved) in entities.iter_mut().zip(&self.entities) {
            entity.set_enabled(saved.enabled);
        }
        world.attach_entities(entities);

        for (index, saved) in self.entities.iter().enumerate() {
            match saved.parent_index.map(|p| ids.get(p)) {
                Some(Some(&parent)) => world.set_parent(ids[index], Some(parent)),
                Some(None) => log::warn!("Entity '{}' has an out of range parent index", saved.name),
                None => {}
            }
        }

        world.flush();
        Ok(ids.len())
    }
}

/// Reads and writes a world's scene documents
#[derive(Debug, Clone)]
pub struct SceneStore {
    directory: PathBuf,
    name: String,
    backup_generations: usize,
}

impl SceneStore {
    const DEFAULT_BACKUP_GENERATIONS: usize = 4;

    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            backup_generations: Self::DEFAULT_BACKUP_GENERATIONS,
        }
    }

    #[must_use]
    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(&config.scene_directory, &config.scene_name)
            .with_backup_generations(config.backup_generations)
    }

    #[must_use]
    pub fn with_backup_generations(mut self, generations: usize) -> Self {
        self.backup_generations = generations;
        self
    }

    #[must_use]
    pub fn entities_path(&self) -> PathBuf {
        self.document_path(ENTITIES_EXTENSION)
    }

    #[must_use]
    pub fn components_path(&self) -> PathBuf {
        self.document_path(COMPONENTS_EXTENSION)
    }

    fn document_path(&self, extension: &str) -> PathBuf {
        self.directory.join(format!("{}.{extension}", self.name))
    }

    /// Save both documents, rotating backups first
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any file operation fails
    pub fn save(&self, world: &World) -> Result<(), SceneError> {
        let snapshot = SceneSnapshot::capture(world);
        fs::create_dir_all(&self.directory).map_err(|e| SceneError::IoError(e.to_string()))?;

        let entities = serde_json::to_string_pretty(&snapshot.entities)
            .map_err(|e| SceneError::SerializeError(e.to_string()))?;
        let components = serde_json::to_string_pretty(&snapshot.components)
            .map_err(|e| SceneError::SerializeError(e.to_string()))?;

        self.write_document(&self.entities_path(), &entities)?;
        self.write_document(&self.components_path(), &components)?;

        log::info!(
            "Saved scene '{}': {} entities, {} components",
            self.name,
            snapshot.entities.len(),
            snapshot.components.len()
        );
        Ok(())
    }

    /// Read both documents
    ///
    /// # Errors
    ///
    /// Returns an error if either file is missing or malformed
    pub fn read(&self) -> Result<SceneSnapshot, SceneError> {
        let entities = fs::read_to_string(self.entities_path())
            .map_err(|e| SceneError::IoError(e.to_string()))?;
        let components = fs::read_to_string(self.components_path())
            .map_err(|e| SceneError::IoError(e.to_string()))?;

        Ok(SceneSnapshot {
            entities: serde_json::from_str(&entities)
                .map_err(|e| SceneError::DeserializeError(e.to_string()))?,
            components: serde_json::from_str(&components)
                .map_err(|e| SceneError::DeserializeError(e.to_string()))?,
        })
    }

    /// Replace the contents of `world` with the saved scene
    ///
    /// # Errors
    ///
    /// Returns an error if the documents cannot be read or a component
    /// cannot be restored
    pub fn load(&self, world: &mut World, factory: &ComponentFactory) -> Result<usize, SceneError> {
        let snapshot = self.read()?;
        let count = snapshot.restore(world, factory)?;
        log::info!("Loaded scene '{}': {count} entities", self.name);
        Ok(count)
    }

    fn write_document(&self, path: &Path, content: &str) -> Result<(), SceneError> {
        rotate_backups(path, self.backup_generations)?;
        fs::write(path, content).map_err(|e| SceneError::IoError(e.to_string()))
    }
}

/// `<file>.backup<generation>`
#[must_use]
pub fn backup_path(path: &Path, generation: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".backup{generation}"));
    PathBuf::from(name)
}

/// Shift existing backups up one generation, evicting the oldest, then
/// copy the current file into generation 1
fn rotate_backups(path: &Path, generations: usize) -> Result<(), SceneError> {
    if generations == 0 || !path.exists() {
        return Ok(());
    }
    for generation in (1..generations).rev() {
        let from = backup_path(path, generation);
        if from.exists() {
            fs::rename(&from, backup_path(path, generation + 1))
                .map_err(|e| SceneError::IoError(e.to_string()))?;
        }
    }
    fs::copy(path, backup_path(path, 1)).map_err(|e| SceneError::IoError(e.to_string()))?;
    Ok(())
}

/// Errors that can occur during scene operations
#[derive(Debug, Clone)]
pub enum SceneError {
    /// IO error
    IoError(String),
    /// Serialization error
    SerializeError(String),
    /// Deserialization error
    DeserializeError(String),
    /// Component kind with no factory entry
    UnknownComponent(String),
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializeError(e) => write!(f, "Deserialization error: {e}"),
            Self::UnknownComponent(kind) => write!(f, "Unknown component kind: {kind}"),
        }
    }
}

impl std::error::Error for SceneError {}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::ecs::Rotator;

    fn temp_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scene3d-{test}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample_world() -> (World, EntityId, EntityId) {
        let mut world = World::new();
        let mut parent = Entity::new("turntable").with_tag(3).with_update_order(2);
        parent.add_component(Rotator::new(Vec3::Y, 0.5));
        let mut child = Entity::new("statue");
        child.transform_mut().set_position(Vec3::new(1.0, 2.0, 3.0));
        let (parent_id, child_id) = (parent.id(), child.id());
        world.add_entity(parent);
        world.add_entity(child);
        world.set_parent(child_id, Some(parent_id));
        world.flush();
        (world, parent_id, child_id)
    }

    #[test]
    fn test_capture_records_hierarchy() {
        let (world, _, _) = sample_world();
        let snapshot = SceneSnapshot::capture(&world);

        // Update order puts the statue (order 0) first
        assert_eq!(snapshot.entities.len(), 2);
        assert_eq!(snapshot.entities[0].name, "statue");
        assert_eq!(snapshot.entities[0].parent_index, Some(1));
        assert_eq!(snapshot.entities[1].parent_index, None);

        assert_eq!(snapshot.components.len(), 1);
        assert_eq!(snapshot.components[0].owner, "turntable");
        assert_eq!(snapshot.components[0].kind, "rotator");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = temp_dir("round-trip");
        let store = SceneStore::new(&dir, "level");
        let (world, _, _) = sample_world();
        store.save(&world).unwrap();
        assert!(store.entities_path().exists());
        assert!(store.components_path().exists());

        let mut loaded = World::new();
        let count = store.load(&mut loaded, &ComponentFactory::with_builtins()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(loaded.entities().len(), 2);

        let turntable = loaded.find_entity("turntable").unwrap();
        let statue = loaded.find_entity("statue").unwrap();
        assert_eq!(loaded.parent(statue), Some(turntable));
        assert_eq!(loaded.entities_with_tag(3), vec![turntable]);

        let entity = loaded.entity(turntable).unwrap();
        assert_eq!(entity.update_order(), 2);
        let rotator = entity.get_component::<Rotator>().unwrap();
        assert_eq!(rotator.speed, 0.5);

        let position = loaded.entity(statue).unwrap().transform().position();
        assert_eq!(position, Vec3::new(1.0, 2.0, 3.0));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_replaces_existing_entities() {
        let dir = temp_dir("replace");
        let store = SceneStore::new(&dir, "level");
        let (world, _, _) = sample_world();
        store.save(&world).unwrap();

        let mut target = World::new();
        target.add_entity(Entity::new("stale"));
        target.flush();
        store.load(&mut target, &ComponentFactory::with_builtins()).unwrap();
        assert!(target.find_entity("stale").is_none());
        assert_eq!(target.entities().len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_backup_rotation_keeps_four_generations() {
        let dir = temp_dir("backups");
        let store = SceneStore::new(&dir, "level");
        let mut world = World::new();

        // Six saves: the first five each leave a copy, the oldest is evicted
        for round in 0..6 {
            world.add_entity(Entity::new(format!("e{round}")));
            world.flush();
            store.save(&world).unwrap();
        }

        let path = store.entities_path();
        for generation in 1..=4 {
            assert!(backup_path(&path, generation).exists(), "generation {generation}");
        }
        assert!(!backup_path(&path, 5).exists());

        // Generation 1 is the save before the latest: five entities
        let previous: Vec<SerializedEntity> =
            serde_json::from_str(&fs::read_to_string(backup_path(&path, 1)).unwrap()).unwrap();
        assert_eq!(previous.len(), 5);
        let oldest: Vec<SerializedEntity> =
            serde_json::from_str(&fs::read_to_string(backup_path(&path, 4)).unwrap()).unwrap();
        assert_eq!(oldest.len(), 2);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unknown_component_kind() {
        let snapshot = SceneSnapshot {
            entities: vec![SerializedEntity {
                name: "ghost".to_owned(),
                tag: 0,
                enabled: true,
                update_order: 0,
                update_interval: 1,
                transform: Transform::new(),
                parent_index: None,
            }],
            components: vec![SerializedComponent {
                owner: "ghost".to_owned(),
                kind: "haunting".to_owned(),
                enabled: true,
                data: serde_json::Value::Null,
            }],
        };

        let mut world = World::new();
        let result = snapshot.restore(&mut world, &ComponentFactory::with_builtins());
        assert!(matches!(result, Err(SceneError::UnknownComponent(kind)) if kind == "haunting"));
        assert!(world.entities().is_empty());
    }

    #[test]
    fn test_orphan_component_skipped() {
        let snapshot = SceneSnapshot {
            entities: Vec::new(),
            components: vec![SerializedComponent {
                owner: "nobody".to_owned(),
                kind: "rotator".to_owned(),
                enabled: true,
                data: serde_json::Value::Null,
            }],
        };
        let mut world = World::new();
        assert_eq!(snapshot.restore(&mut world, &ComponentFactory::with_builtins()).unwrap(), 0);
    }

    #[test]
    fn test_load_missing_documents() {
        let store = SceneStore::new(temp_dir("missing"), "nothing");
        let mut world = World::new();
        let result = store.load(&mut world, &ComponentFactory::with_builtins());
        assert!(matches!(result, Err(SceneError::IoError(_))));
    }
}
