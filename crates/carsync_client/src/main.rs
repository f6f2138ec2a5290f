use bevy::prelude::*;
use carsync_simulation::{init_logger, SimulationSettings, VehicleSimPlugin, DEFAULT_MODEL_PATH};

mod camera;
mod rendering;

use camera::CameraPlugin;
use rendering::{ModelSource, RenderingSyncPlugin};

/// Опциональный файл настроек рядом с бинарником
const SETTINGS_PATH: &str = "carsync.toml";

fn main() {
    init_logger();

    let settings = if std::path::Path::new(SETTINGS_PATH).exists() {
        SimulationSettings::load(SETTINGS_PATH).unwrap_or_else(|err| {
            carsync_simulation::logger::log_warning(&format!("{err}, using defaults"));
            SimulationSettings::default()
        })
    } else {
        SimulationSettings::default()
    };

    App::new()
        // Bevy defaults (rendering, input, time, etc.)
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "CARSYNC - W/S drive, A/D steer".to_string(),
                resolution: (1280., 720.).into(),
                ..default()
            }),
            ..default()
        }))
        // Simulation (scene + physics + vehicle)
        .add_plugins(VehicleSimPlugin { settings })
        // Rendering sync (scene nodes → bevy entities) + keyboard
        .insert_resource(ModelSource(DEFAULT_MODEL_PATH.to_string()))
        .add_plugins(RenderingSyncPlugin)
        // Camera controls
        .add_plugins(CameraPlugin)
        .add_systems(Startup, setup_scene)
        .run();
}

/// Ground plane, lights, camera
fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Ground plane (physics: half-space y = 0)
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::new(Vec3::Y, Vec2::splat(50.0)))),
        MeshMaterial3d(materials.add(Color::srgb(0.35, 0.5, 0.35))),
        Transform::from_xyz(0.0, 0.0, 0.0),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_4)),
    ));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 0.4,
        affects_lightmapped_meshes: false,
    });

    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(1.0, 20.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
        camera::OrbitCamera {
            distance: 18.0,
            ..default()
        },
    ));
}
