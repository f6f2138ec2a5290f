//! Physics world — обёртка над rapier pipeline
//!
//! Все rapier sets живут вместе: `PhysicsPipeline::step()` требует
//! mutable доступ ко всем одновременно.
//!
//! - `binding` — part ⇄ rigid body (+ center offset)
//! - `sync` — body pose → нода после каждого step

pub mod binding;
pub mod sync;

use bevy::prelude::*;
use bevy_rapier3d::rapier::prelude::{
    CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet, DefaultBroadPhase, GenericJoint,
    ImpulseJoint, ImpulseJointHandle, ImpulseJointSet, IntegrationParameters, IslandManager,
    MultibodyJointSet, NarrowPhase, PhysicsPipeline, RigidBody, RigidBodyHandle, RigidBodySet,
    Vector,
};

use crate::config::SimConfig;
use crate::math::to_physics_vector;

pub use binding::{BindingKind, BindingRegistry, PhysicsBinding};
pub use sync::sync_bindings;

/// Материал поверхности (трение/упругость collider'а)
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceMaterial {
    pub name: String,
    pub friction: f32,
    pub restitution: f32,
}

impl SurfaceMaterial {
    pub fn new(name: impl Into<String>, friction: f32) -> Self {
        Self {
            name: name.into(),
            friction,
            restitution: 0.0,
        }
    }

    pub fn apply(&self, builder: ColliderBuilder) -> ColliderBuilder {
        builder.friction(self.friction).restitution(self.restitution)
    }
}

pub struct PhysicsWorld {
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,

    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    ccd_solver: CCDSolver,

    integration_parameters: IntegrationParameters,
    gravity: Vector<f32>,
    ground: ColliderHandle,
    steps: u64,
}

impl PhysicsWorld {
    /// Мир с гравитацией и статичной землёй (half-space y = 0)
    pub fn new(config: &SimConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.timestep();

        let mut colliders = ColliderSet::new();
        let ground_material = SurfaceMaterial::new("ground", config.ground_friction);
        let ground = colliders.insert(ground_material.apply(ColliderBuilder::halfspace(Vector::y_axis())));

        Self {
            bodies: RigidBodySet::new(),
            colliders,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd_solver: CCDSolver::new(),
            integration_parameters,
            gravity: to_physics_vector(config.gravity()),
            ground,
            steps: 0,
        }
    }

    /// Один fixed step
    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
        self.steps += 1;
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn timestep(&self) -> f32 {
        self.integration_parameters.dt
    }

    pub fn gravity(&self) -> Vec3 {
        Vec3::new(self.gravity.x, self.gravity.y, self.gravity.z)
    }

    pub fn ground(&self) -> ColliderHandle {
        self.ground
    }

    /// Body + его единственный collider
    pub fn insert_body(&mut self, body: RigidBody, collider: ColliderBuilder) -> RigidBodyHandle {
        let handle = self.bodies.insert(body);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Динамические тела (земля — только collider)
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn insert_wheel_mount(
        &mut self,
        chassis: RigidBodyHandle,
        wheel: RigidBodyHandle,
        joint: impl Into<GenericJoint>,
    ) -> ImpulseJointHandle {
        self.impulse_joints.insert(chassis, wheel, joint, true)
    }

    pub fn mount(&self, handle: ImpulseJointHandle) -> Option<&ImpulseJoint> {
        self.impulse_joints.get(handle)
    }

    pub fn mount_mut(&mut self, handle: ImpulseJointHandle) -> Option<&mut ImpulseJoint> {
        self.impulse_joints.get_mut(handle, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_rapier3d::rapier::prelude::RigidBodyBuilder;

    #[test]
    fn test_ball_falls_under_gravity() {
        let mut world = PhysicsWorld::new(&SimConfig::default());
        let ball = world.insert_body(
            RigidBodyBuilder::dynamic()
                .translation(Vector::new(0.0, 10.0, 0.0))
                .build(),
            ColliderBuilder::ball(0.5).mass(1.0),
        );

        for _ in 0..30 {
            world.step();
        }

        let y = world.body(ball).expect("ball").translation().y;
        assert!(y < 10.0 && y > 0.5, "y = {}", y);
        assert_eq!(world.steps(), 30);
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_ground_stops_ball() {
        let mut world = PhysicsWorld::new(&SimConfig::default());
        let ball = world.insert_body(
            RigidBodyBuilder::dynamic()
                .translation(Vector::new(0.0, 2.0, 0.0))
                .build(),
            ColliderBuilder::ball(0.5).mass(1.0),
        );

        for _ in 0..240 {
            world.step();
        }

        let y = world.body(ball).expect("ball").translation().y;
        assert!((y - 0.5).abs() < 0.1, "ball should rest on ground, y = {}", y);
    }

    #[test]
    fn test_timestep_follows_config() {
        let config = SimConfig {
            fixed_hz: 120.0,
            ..Default::default()
        };
        let world = PhysicsWorld::new(&config);
        assert!((world.timestep() - 1.0 / 120.0).abs() < 1e-6);
        assert_eq!(world.gravity(), Vec3::new(0.0, -9.82, 0.0));
    }

    #[test]
    fn test_ground_is_static_collider_with_config_friction() {
        let config = SimConfig {
            ground_friction: 0.7,
            ..Default::default()
        };
        let world = PhysicsWorld::new(&config);

        let ground = world.colliders.get(world.ground()).expect("ground collider");
        assert!(ground.parent().is_none());
        assert!((ground.friction() - 0.7).abs() < 1e-6);
        assert_eq!(world.body_count(), 0);
    }
}
