use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use carsync_simulation::Session;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (follow_chassis, orbit_camera_controls, update_camera_transform).chain(),
        );
    }
}

#[derive(Component)]
pub struct OrbitCamera {
    pub focus: Vec3,
    pub distance: f32,
    pub yaw: f32,   // Horizontal rotation (radians)
    pub pitch: f32, // Vertical rotation (radians)
    pub sensitivity: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            focus: Vec3::ZERO,
            distance: 18.0,
            yaw: std::f32::consts::FRAC_PI_6,
            pitch: std::f32::consts::FRAC_PI_4,
            sensitivity: 0.005,
            zoom_speed: 1.0,
        }
    }
}

/// Фокус камеры = центр chassis (когда машина собрана)
fn follow_chassis(session: Res<Session>, mut query: Query<&mut OrbitCamera>) {
    let Some(center) = session.chassis_center() else {
        return;
    };
    for mut camera in query.iter_mut() {
        if camera.focus.distance_squared(center) > 1e-6 {
            camera.focus = center;
        }
    }
}

/// Правая кнопка мыши — orbit, колесо — zoom
fn orbit_camera_controls(
    mut query: Query<&mut OrbitCamera>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut mouse_wheel: EventReader<MouseWheel>,
) {
    let Ok(mut camera) = query.single_mut() else {
        return;
    };

    if mouse_buttons.pressed(MouseButton::Right) {
        for motion in mouse_motion.read() {
            camera.yaw -= motion.delta.x * camera.sensitivity;
            camera.pitch -= motion.delta.y * camera.sensitivity;

            // Clamp pitch to avoid gimbal lock
            camera.pitch = camera.pitch.clamp(
                -std::f32::consts::FRAC_PI_2 + 0.1,
                std::f32::consts::FRAC_PI_2 - 0.1,
            );
        }
    } else {
        mouse_motion.clear();
    }

    for wheel in mouse_wheel.read() {
        camera.distance = (camera.distance - wheel.y * camera.zoom_speed).clamp(3.0, 60.0);
    }
}

fn update_camera_transform(
    mut query: Query<(&OrbitCamera, &mut Transform), Changed<OrbitCamera>>,
) {
    for (camera, mut transform) in query.iter_mut() {
        let offset = Vec3::new(
            camera.distance * camera.pitch.cos() * camera.yaw.sin(),
            camera.distance * camera.pitch.sin(),
            camera.distance * camera.pitch.cos() * camera.yaw.cos(),
        );

        *transform = Transform::from_translation(camera.focus + offset)
            .looking_at(camera.focus, Vec3::Y);
    }
}
