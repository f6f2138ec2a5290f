//! Vehicle assembler: chassis + 4 колеса на revolute креплениях
//!
//! Порядок колёс: FL, FR, BL, BR (индексы 0..4).
//! Передние (0, 1) ведущие и рулевые, задние катятся свободно.
//!
//! Mount колеса = world center колеса − world center chassis
//! (относительно геометрического центра chassis, не origin ноды).

pub mod control;

use bevy::prelude::*;
use bevy_rapier3d::rapier::na::{Point3, Unit};
use bevy_rapier3d::rapier::prelude::{ImpulseJointHandle, RevoluteJointBuilder, RigidBodyHandle};

use crate::config::VehicleConfig;
use crate::error::SyncResult;
use crate::logger;
use crate::math::{to_physics_vector, to_render_quat};
use crate::parts::{LaidOutHierarchy, PartId};
use crate::physics::binding::BindingId;
use crate::physics::{BindingRegistry, PhysicsBinding, PhysicsWorld};
use crate::scene::Scene;

pub use control::{DriveInput, DriveKey};

pub const WHEEL_COUNT: usize = 4;
/// Ведущие + рулевые колёса
pub const FRONT_WHEELS: [usize; 2] = [0, 1];

/// Одно колесо: body + крепление к chassis + управляющее состояние
#[derive(Debug, Clone)]
pub struct WheelMount {
    pub binding: BindingId,
    pub body: RigidBodyHandle,
    pub joint: ImpulseJointHandle,
    /// Позиция крепления относительно центра chassis
    pub position: Vec3,
    /// Ось вращения в системе chassis (без руля)
    pub axis: Vec3,
    /// Ось вращения в системе колеса (для torque)
    pub local_axis: Vec3,
    /// Направление подвески в системе chassis
    pub direction: Vec3,
    pub force: f32,
    pub steering: f32,
}

impl WheelMount {
    /// Ось крепления со стороны chassis с учётом руля (поворот вокруг "вверх")
    pub fn steered_axis(&self) -> Vec3 {
        Quat::from_axis_angle(-self.direction, self.steering) * self.axis
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    chassis: BindingId,
    chassis_body: RigidBodyHandle,
    wheels: [WheelMount; WHEEL_COUNT],
    drive_force_scale: f32,
    steer_scale: f32,
}

impl Vehicle {
    /// Собрать машину из laid-out иерархии и зарегистрировать bindings.
    ///
    /// Все имена резолвятся до создания тел: промах ничего не добавляет в мир.
    pub fn assemble(
        hierarchy: &LaidOutHierarchy,
        scene: &Scene,
        world: &mut PhysicsWorld,
        registry: &mut BindingRegistry,
        config: &VehicleConfig,
    ) -> SyncResult<Self> {
        let chassis_part = hierarchy.descendant(&config.chassis_name)?;
        let mut wheel_parts = [PartId(0); WHEEL_COUNT];
        for (slot, name) in wheel_parts.iter_mut().zip(&config.wheel_names) {
            *slot = hierarchy.descendant(name)?;
        }

        let chassis_node = hierarchy.part(chassis_part).node();
        let chassis_center = scene.world_center(chassis_node);
        let chassis_rotation = scene.rotation(chassis_node);
        let chassis_center_offset = -chassis_center;

        let chassis_binding = PhysicsBinding::new_box(chassis_part, hierarchy, scene, world, config);
        let chassis_body = chassis_binding.body;
        let chassis = registry.register(chassis_binding);

        let axis = config.wheel_axis();
        let direction = config.suspension_direction();

        let wheels = wheel_parts.map(|part| {
            let wheel_binding = PhysicsBinding::new_wheel(part, hierarchy, scene, world, config);
            let body = wheel_binding.body;
            let wheel_node = wheel_binding.node;
            let binding = registry.register(wheel_binding);

            let position = scene.world_center(wheel_node) + chassis_center_offset;
            let wheel_rotation = scene.rotation(wheel_node);
            let local_axis = (wheel_rotation.inverse() * chassis_rotation * axis).normalize_or(axis);

            // Колесо ставится в pose chassis ⊗ mount
            if let Some(wheel_body) = world.body_mut(body) {
                wheel_body.set_translation(to_physics_vector(chassis_center + chassis_rotation * position), true);
            }

            let mut mount = RevoluteJointBuilder::new(Unit::new_normalize(to_physics_vector(axis)))
                .local_anchor1(Point3::from(to_physics_vector(position)))
                .local_anchor2(Point3::origin())
                .contacts_enabled(false)
                .build();
            mount
                .data
                .set_local_axis2(Unit::new_normalize(to_physics_vector(local_axis)));
            let joint = world.insert_wheel_mount(chassis_body, body, mount);

            WheelMount {
                binding,
                body,
                joint,
                position,
                axis,
                local_axis,
                direction,
                force: 0.0,
                steering: 0.0,
            }
        });

        logger::log_info(&format!(
            "🚙 Vehicle assembled: chassis `{}` at {:?}, mounts {:?}",
            config.chassis_name,
            chassis_center,
            wheels.iter().map(|w| w.position).collect::<Vec<_>>()
        ));

        Ok(Self {
            chassis,
            chassis_body,
            wheels,
            drive_force_scale: config.drive_force_scale,
            steer_scale: config.steer_scale,
        })
    }

    /// Единственная точка управления: throttle → сила, steer → угол руля.
    /// Только передние колёса.
    pub fn drive(&mut self, throttle: f32, steer: f32) {
        for index in FRONT_WHEELS {
            let wheel = &mut self.wheels[index];
            wheel.force = throttle * self.drive_force_scale;
            wheel.steering = steer * self.steer_scale;
        }
    }

    /// Перед каждым physics step: torque вокруг оси колеса + ось крепления с рулём
    pub fn apply_controls(&self, world: &mut PhysicsWorld) {
        for wheel in &self.wheels {
            if let Some(body) = world.body_mut(wheel.body) {
                body.reset_torques(true);
                if wheel.force != 0.0 {
                    let world_axis = to_render_quat(body.rotation()) * wheel.local_axis;
                    body.add_torque(to_physics_vector(world_axis * wheel.force), true);
                }
            }

            if let Some(joint) = world.mount_mut(wheel.joint) {
                joint
                    .data
                    .set_local_axis1(Unit::new_normalize(to_physics_vector(wheel.steered_axis())));
            }
        }
    }

    pub fn wheel_force(&self, index: usize) -> f32 {
        self.wheels[index].force
    }

    pub fn steering_angle(&self, index: usize) -> f32 {
        self.wheels[index].steering
    }

    pub fn mounts(&self) -> [Vec3; WHEEL_COUNT] {
        self.wheels.each_ref().map(|wheel| wheel.position)
    }

    pub fn chassis(&self) -> BindingId {
        self.chassis
    }

    pub fn chassis_body(&self) -> RigidBodyHandle {
        self.chassis_body
    }

    pub fn wheels(&self) -> &[WheelMount; WHEEL_COUNT] {
        &self.wheels
    }

    /// chassis + колёса
    pub fn body_count(&self) -> usize {
        1 + self.wheels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::math::approx_eq;
    use crate::parts::RawHierarchy;
    use crate::scene::{Geometry, NodeId};
    use std::f32::consts::PI;

    const WHEEL_CENTERS: [Vec3; 4] = [
        Vec3::new(-1.2, 0.5, 1.4),
        Vec3::new(1.2, 0.5, 1.4),
        Vec3::new(-1.2, 0.5, -1.4),
        Vec3::new(1.2, 0.5, -1.4),
    ];

    /// Root > Chassis(mesh), WheelFL, WheelFR, WheelBL, WheelBR (mesh)
    fn car_scene(root_offset: Vec3) -> (Scene, NodeId) {
        let mut scene = Scene::new(21);
        let root = scene.spawn_group("Car", None);
        scene.spawn_mesh(
            "Chassis",
            Geometry::cuboid(Vec3::new(0.0, 1.0, 0.0) + root_offset, Vec3::new(2.0, 0.6, 4.0)),
            Some(root),
        );
        for (name, center) in ["WheelFL", "WheelFR", "WheelBL", "WheelBR"].into_iter().zip(WHEEL_CENTERS) {
            scene.spawn_mesh(
                name,
                Geometry::cylinder(center + root_offset, 0.5, 0.3, Vec3::X, 16),
                Some(root),
            );
        }
        (scene, root)
    }

    fn assemble(root_offset: Vec3) -> (Scene, PhysicsWorld, BindingRegistry, Vehicle) {
        let (mut scene, root) = car_scene(root_offset);
        let hierarchy = RawHierarchy::flatten(&scene, root)
            .expect("flatten")
            .lay_out(&mut scene);
        let mut world = PhysicsWorld::new(&SimConfig::default());
        let mut registry = BindingRegistry::new();
        let vehicle = Vehicle::assemble(&hierarchy, &scene, &mut world, &mut registry, &VehicleConfig::default())
            .expect("vehicle");
        (scene, world, registry, vehicle)
    }

    #[test]
    fn test_assembly_creates_five_bodies_and_four_mounts() {
        let (_scene, world, registry, vehicle) = assemble(Vec3::ZERO);

        assert_eq!(vehicle.body_count(), 5);
        assert_eq!(world.body_count(), 5);
        assert_eq!(registry.len(), 5);
        assert_eq!(world.impulse_joints.len(), 4);
        assert!(!registry.get(vehicle.chassis()).is_wheel());
        assert_eq!(registry.iter().filter(|b| b.is_wheel()).count(), 4);

        let chassis_center = Vec3::new(0.0, 1.0, 0.0);
        for (mount, center) in vehicle.mounts().iter().zip(WHEEL_CENTERS) {
            assert!(approx_eq(*mount, center - chassis_center, 1e-5), "{:?}", mount);
        }
    }

    #[test]
    fn test_wheel_bodies_start_at_wheel_centers() {
        let (_scene, world, _registry, vehicle) = assemble(Vec3::ZERO);
        for (wheel, center) in vehicle.wheels().iter().zip(WHEEL_CENTERS) {
            let t = world.body(wheel.body).expect("wheel body").translation();
            assert!(approx_eq(Vec3::new(t.x, t.y, t.z), center, 1e-5));
        }
    }

    #[test]
    fn test_mounts_invariant_to_asset_translation() {
        let (_, _, _, base) = assemble(Vec3::ZERO);
        let (_, _, _, moved) = assemble(Vec3::new(10.0, -3.0, 7.5));

        for (a, b) in base.mounts().iter().zip(moved.mounts()) {
            assert!(approx_eq(*a, b, 1e-4), "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_drive_controls_front_wheels_only() {
        let (_scene, _world, _registry, mut vehicle) = assemble(Vec3::ZERO);

        vehicle.drive(0.5, -1.0);

        for index in FRONT_WHEELS {
            assert_eq!(vehicle.wheel_force(index), 50.0);
            assert!((vehicle.steering_angle(index) + PI / 8.0).abs() < 1e-6);
        }
        for index in [2, 3] {
            assert_eq!(vehicle.wheel_force(index), 0.0);
            assert_eq!(vehicle.steering_angle(index), 0.0);
        }
    }

    #[test]
    fn test_apply_controls_sets_torque_and_steering() {
        let (_scene, mut world, _registry, mut vehicle) = assemble(Vec3::ZERO);
        vehicle.drive(1.0, 1.0);
        vehicle.apply_controls(&mut world);

        let front = &vehicle.wheels()[0];
        let torque = world.body(front.body).expect("front").user_torque();
        assert!((torque.norm() - 100.0).abs() < 1e-3);

        let rear = &vehicle.wheels()[2];
        assert!(world.body(rear.body).expect("rear").user_torque().norm() < 1e-6);

        // Руль: ось крепления повёрнута вокруг Y на π/8
        let steered = front.steered_axis();
        assert!((steered.angle_between(Vec3::X) - PI / 8.0).abs() < 1e-5);
        assert!(steered.y.abs() < 1e-6);

        // Joint получил повёрнутую ось на стороне chassis
        let joint = world.mount(front.joint).expect("front mount");
        let axis = joint.data.local_axis1();
        assert!(approx_eq(Vec3::new(axis.x, axis.y, axis.z), steered, 1e-5));
        let rear_joint = world.mount(rear.joint).expect("rear mount");
        let rear_axis = rear_joint.data.local_axis1();
        assert!(approx_eq(Vec3::new(rear_axis.x, rear_axis.y, rear_axis.z), Vec3::X, 1e-5));
    }

    #[test]
    fn test_missing_wheel_fails_before_touching_world() {
        let (mut scene, root) = car_scene(Vec3::ZERO);
        let hierarchy = RawHierarchy::flatten(&scene, root)
            .expect("flatten")
            .lay_out(&mut scene);
        let mut world = PhysicsWorld::new(&SimConfig::default());
        let mut registry = BindingRegistry::new();
        let config = VehicleConfig {
            wheel_names: [
                "WheelFL".into(),
                "WheelFR".into(),
                "WheelBL".into(),
                "WheelSpare".into(),
            ],
            ..Default::default()
        };

        let result = Vehicle::assemble(&hierarchy, &scene, &mut world, &mut registry, &config);

        assert!(matches!(
            result,
            Err(crate::error::SyncError::DescendantNotFound { ref name, .. }) if name == "WheelSpare"
        ));
        assert_eq!(world.body_count(), 0);
        assert!(registry.is_empty());
    }
}
