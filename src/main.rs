//! Headless demo: sculpt a terrain for a few frames, then save and reload
//! the scene

use std::error::Error;

use scene3d::core::MapSize;
use scene3d::prelude::*;

/// Backend that only counts what it is asked to do
#[derive(Debug, Default)]
struct LoggingBackend {
    mesh_uploads: usize,
    texture_uploads: usize,
    draws: usize,
}

impl RenderBackend for LoggingBackend {
    fn upload_mesh(&mut self, mesh: ResourceId, vertices: &[u8], indices: &[u8]) {
        log::debug!(
            "Upload mesh {} ({} vertex bytes, {} index bytes)",
            mesh.raw(),
            vertices.len(),
            indices.len()
        );
        self.mesh_uploads += 1;
    }

    fn upload_texture(&mut self, texture: ResourceId, width: u32, height: u32, _texels: &[u8]) {
        log::debug!("Upload texture {} ({width}x{height})", texture.raw());
        self.texture_uploads += 1;
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        log::trace!("Draw mesh {} ({} indices)", call.mesh.raw(), call.index_count);
        self.draws += 1;
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Optional RON config as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_ron(&path)?,
        None => EngineConfig::default().with_world(
            WorldConfig::default().with_scene(std::env::temp_dir().join("scene3d-demo"), "demo"),
        ),
    };
    let terrain_config = if config.terrain.map_size == TerrainConfig::default().map_size {
        config
            .terrain
            .clone()
            .with_map_size(MapSize::Custom(65))
            .with_cell_size(1.0)
            .with_max_height(16.0)
    } else {
        config.terrain.clone()
    };

    let mut world = World::new();

    let mut ground = Entity::new("ground");
    let mut terrain = TerrainComponent::new(terrain_config)?;
    terrain
        .height_map_mut()
        .randomize(GenerationType::PerlinNoise, 7, false);
    terrain.set_editing(true);
    if !terrain.layers().is_empty() {
        let mut loader = ContentCache::new(DiskLoader::new("."));
        let loaded = terrain.load_textures(&mut loader)?;
        log::info!("Loaded {loaded} terrain layers");
    }
    ground.add_component(terrain);
    world.add_entity(ground);

    let mut marker = Entity::new("marker").with_transform(Transform::from_position(Vec3::new(
        32.0, 4.0, 32.0,
    )));
    marker.add_component(Rotator::new(Vec3::Y, 1.5));
    world.add_entity(marker);

    let camera = Camera::look_at(Vec3::new(32.0, 60.0, 40.0), Vec3::new(32.0, 0.0, 32.0), Vec3::Y);
    let mut frame = FrameContext::new()
        .with_camera(camera)
        .with_light(Light::directional(Vec3::new(-0.3, -1.0, -0.2), Vec3::ONE, 1.0));

    let viewport = Vec2::new(1280.0, 720.0);
    let mut backend = LoggingBackend::default();
    for _ in 0..30 {
        frame.begin_frame(1.0 / 60.0, Some(viewport * 0.5), viewport, true);
        world.update(&mut frame);
        world.render(&frame, &mut backend);
    }

    if let Some(terrain) = world.find_component::<TerrainComponent>() {
        log::info!(
            "Terrain peak after sculpting: {:.3} (hover {:?})",
            terrain.height_map().highest(),
            terrain.hover()
        );
    }
    log::info!(
        "Backend saw {} mesh uploads, {} texture uploads, {} draws",
        backend.mesh_uploads,
        backend.texture_uploads,
        backend.draws
    );

    let store = SceneStore::from_config(&config.world);
    store.save(&world)?;

    let mut restored = World::new();
    let count = store.load(&mut restored, &ComponentFactory::with_builtins())?;
    log::info!(
        "Reloaded {count} entities from {}",
        store.entities_path().display()
    );

    Ok(())
}
