use std::collections::HashMap;

use bevy::prelude::*;
use bevy::tasks::futures_lite::future;
use bevy::tasks::{block_on, IoTaskPool, Task};
use carsync_simulation::logger;
use carsync_simulation::scene::{NodeId, Scene};
use carsync_simulation::{DriveInput, DriveKey, ModelAsset, Session, SyncResult};

pub struct RenderingSyncPlugin;

impl Plugin for RenderingSyncPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VisualRegistry>()
            .add_systems(Startup, start_model_load)
            .add_systems(Update, read_drive_keys)
            .add_systems(
                Update,
                (
                    poll_model_load,
                    spawn_visuals_for_new_nodes,
                    sync_transforms,
                )
                    .chain(),
            )
            .add_systems(Last, notify_frame_rendered);
    }
}

/// Путь к модели (JSON)
#[derive(Resource, Clone)]
pub struct ModelSource(pub String);

/// Фоновая загрузка модели
#[derive(Resource)]
struct ModelLoadTask(Task<SyncResult<ModelAsset>>);

/// Link: scene node → visual entity
#[derive(Resource, Default)]
pub struct VisualRegistry {
    pub node_to_entity: HashMap<NodeId, Entity>,
}

/// Link: visual entity → scene node
#[derive(Component)]
pub struct VisualOf(pub NodeId);

fn start_model_load(mut commands: Commands, source: Res<ModelSource>) {
    let path = source.0.clone();
    logger::log(&format!("📦 Loading model at {} ...", path));
    let task = IoTaskPool::get().spawn(async move { ModelAsset::from_path(path) });
    commands.insert_resource(ModelLoadTask(task));
}

/// Загрузка завершилась → модель в session (flatten + shift)
fn poll_model_load(
    mut commands: Commands,
    task: Option<ResMut<ModelLoadTask>>,
    mut session: ResMut<Session>,
) {
    let Some(mut task) = task else {
        return;
    };
    let Some(result) = block_on(future::poll_once(&mut task.0)) else {
        return;
    };
    commands.remove_resource::<ModelLoadTask>();

    match result.and_then(|asset| session.install_model(&asset)) {
        Ok(_) => {}
        Err(err) => logger::log_error(&format!("❌ Error loading model: {err}")),
    }
}

/// Новые ноды сцены → bevy entities (родитель всегда раньше ребёнка)
fn spawn_visuals_for_new_nodes(
    mut commands: Commands,
    session: Res<Session>,
    mut registry: ResMut<VisualRegistry>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let scene = session.scene();
    for (node_id, node) in scene.iter() {
        if registry.node_to_entity.contains_key(&node_id) {
            continue;
        }

        let mut entity = commands.spawn((
            node_transform(scene, node_id),
            Visibility::default(),
            VisualOf(node_id),
            Name::new(node.display_name().to_owned()),
        ));
        if let Some(parent) = node.parent().and_then(|p| registry.node_to_entity.get(&p)) {
            entity.insert(ChildOf(*parent));
        }
        let visual_entity = entity.id();

        // Геометрия → коробка по локальному AABB вершин
        if let Some(geometry) = node.geometry().filter(|g| !g.is_empty()) {
            let (min, max) = geometry.vertices.iter().fold(
                (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
                |(min, max), v| (min.min(*v), max.max(*v)),
            );
            let body = commands
                .spawn((
                    Mesh3d(meshes.add(Cuboid::from_size(max - min))),
                    MeshMaterial3d(materials.add(StandardMaterial {
                        base_color: part_color(node.display_name()),
                        ..default()
                    })),
                    Transform::from_translation((min + max) * 0.5),
                ))
                .id();
            commands.entity(visual_entity).add_child(body);
        }

        registry.node_to_entity.insert(node_id, visual_entity);
    }
}

/// Sync scene node transforms → visual transforms
fn sync_transforms(
    session: Res<Session>,
    mut visual_query: Query<(&VisualOf, &mut Transform)>,
) {
    let scene = session.scene();
    for (visual_of, mut transform) in visual_query.iter_mut() {
        *transform = node_transform(scene, visual_of.0);
    }
}

/// Кадр с моделью отрисован → session может собирать машину
fn notify_frame_rendered(mut session: ResMut<Session>, registry: Res<VisualRegistry>) {
    if !registry.node_to_entity.is_empty() {
        session.notify_frame_rendered();
    }
}

/// W/S/A/D → DriveInput
fn read_drive_keys(keys: Res<ButtonInput<KeyCode>>, mut input: ResMut<DriveInput>) {
    let pressed: Vec<DriveKey> = [
        (KeyCode::KeyW, DriveKey::Forward),
        (KeyCode::KeyS, DriveKey::Backward),
        (KeyCode::KeyA, DriveKey::Left),
        (KeyCode::KeyD, DriveKey::Right),
    ]
    .into_iter()
    .filter(|(code, _)| keys.pressed(*code))
    .map(|(_, key)| key)
    .collect();

    *input = DriveInput::from_keys(&pressed);
}

fn node_transform(scene: &Scene, node: NodeId) -> Transform {
    let local = scene.transform(node);
    Transform {
        translation: local.translation,
        rotation: local.rotation(),
        scale: local.scale,
    }
}

/// Цвет по имени части (простая палитра)
fn part_color(name: &str) -> Color {
    if name.starts_with("Wheel") {
        Color::srgb(0.1, 0.1, 0.1)
    } else if name == "Cabin" {
        Color::srgb(0.6, 0.75, 0.85)
    } else {
        Color::srgb(0.8, 0.45, 0.15)
    }
}
