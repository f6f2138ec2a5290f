//! Physics bindings: visual part ⇄ rapier rigid body
//!
//! Body строится из world AABB части:
//! - `Box` — cuboid (half-extents = половина AABB), масса chassis
//! - `Wheel` — шар (радиус = половина AABB по `wheel_radius_axis`),
//!   angular damping + материал "wheel"
//!
//! `center_offset` = world center − сырая local position ноды.
//! Снимается после shift (конструктор требует `LaidOutHierarchy`).

use bevy::prelude::*;
use bevy_rapier3d::rapier::prelude::{ColliderBuilder, RigidBodyBuilder, RigidBodyHandle};

use super::{PhysicsWorld, SurfaceMaterial};
use crate::config::VehicleConfig;
use crate::logger;
use crate::math::{to_physics_rotation, to_physics_vector};
use crate::parts::{LaidOutHierarchy, PartId};
use crate::scene::{NodeId, Scene};

#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    Box { half_extents: Vec3 },
    Wheel { radius: f32, material: SurfaceMaterial },
}

/// Индекс binding'а в `BindingRegistry`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(usize);

impl BindingId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct PhysicsBinding {
    pub part: PartId,
    pub node: NodeId,
    pub body: RigidBodyHandle,
    pub center_offset: Vec3,
    pub kind: BindingKind,
}

impl PhysicsBinding {
    /// Cuboid body (chassis и прочие твёрдые части)
    pub fn new_box(
        part: PartId,
        hierarchy: &LaidOutHierarchy,
        scene: &Scene,
        world: &mut PhysicsWorld,
        config: &VehicleConfig,
    ) -> Self {
        let node = hierarchy.part(part).node();
        let center = scene.world_center(node);
        let half_extents = scene.world_size(node) * 0.5;

        let body = RigidBodyBuilder::dynamic()
            .translation(to_physics_vector(center))
            .rotation(to_physics_rotation(scene.rotation(node)).scaled_axis())
            .build();
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(config.chassis_mass);
        let body = world.insert_body(body, collider);

        Self::finish(
            part,
            hierarchy,
            scene,
            body,
            BindingKind::Box { half_extents },
        )
    }

    /// Шар вместо цилиндра: толщина AABB по `wheel_radius_axis` = диаметр
    pub fn new_wheel(
        part: PartId,
        hierarchy: &LaidOutHierarchy,
        scene: &Scene,
        world: &mut PhysicsWorld,
        config: &VehicleConfig,
    ) -> Self {
        let node = hierarchy.part(part).node();
        let center = scene.world_center(node);
        let radius = config.wheel_radius_axis.component(scene.world_size(node)) * 0.5;
        let material = SurfaceMaterial::new("wheel", config.wheel_friction);

        let body = RigidBodyBuilder::dynamic()
            .translation(to_physics_vector(center))
            .rotation(to_physics_rotation(scene.rotation(node)).scaled_axis())
            .angular_damping(config.wheel_angular_damping)
            .build();
        let collider = material.apply(ColliderBuilder::ball(radius).mass(config.wheel_mass));
        let body = world.insert_body(body, collider);

        Self::finish(
            part,
            hierarchy,
            scene,
            body,
            BindingKind::Wheel { radius, material },
        )
    }

    fn finish(
        part: PartId,
        hierarchy: &LaidOutHierarchy,
        scene: &Scene,
        body: RigidBodyHandle,
        kind: BindingKind,
    ) -> Self {
        let visual = hierarchy.part(part);
        let node = visual.node();
        let center_offset = scene.world_center(node) - scene.position(node);

        logger::log(&format!(
            "🔗 Bound `{}` ({}): center_offset={:?}, world={:?}",
            visual.name(),
            match &kind {
                BindingKind::Box { .. } => "box",
                BindingKind::Wheel { .. } => "wheel",
            },
            center_offset,
            scene.world_position(node)
        ));

        Self {
            part,
            node,
            body,
            center_offset,
            kind,
        }
    }

    pub fn is_wheel(&self) -> bool {
        matches!(self.kind, BindingKind::Wheel { .. })
    }
}

/// Упорядоченный список живых bindings (владелец — session).
/// Добавление при создании, удаления нет.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    bindings: Vec<PhysicsBinding>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, binding: PhysicsBinding) -> BindingId {
        self.bindings.push(binding);
        BindingId(self.bindings.len() - 1)
    }

    pub fn get(&self, id: BindingId) -> &PhysicsBinding {
        &self.bindings[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhysicsBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::math::{approx_eq, to_render_vector};
    use crate::parts::RawHierarchy;
    use crate::scene::Geometry;

    fn laid_out_scene() -> (Scene, LaidOutHierarchy) {
        let mut scene = Scene::new(5);
        let root = scene.spawn_group("Root", None);
        scene.spawn_mesh(
            "Chassis",
            Geometry::cuboid(Vec3::new(0.0, 1.0, 0.0), Vec3::new(2.0, 0.5, 4.0)),
            Some(root),
        );
        scene.spawn_mesh(
            "Wheel",
            Geometry::cylinder(Vec3::new(1.2, 0.5, 1.5), 0.5, 0.3, Vec3::X, 16),
            Some(root),
        );
        let hierarchy = RawHierarchy::flatten(&scene, root)
            .expect("flatten")
            .lay_out(&mut scene);
        (scene, hierarchy)
    }

    #[test]
    fn test_box_binding_shape_and_pose() {
        let (scene, hierarchy) = laid_out_scene();
        let mut world = PhysicsWorld::new(&SimConfig::default());
        let chassis = hierarchy.descendant("Chassis").expect("chassis");

        let binding = PhysicsBinding::new_box(chassis, &hierarchy, &scene, &mut world, &VehicleConfig::default());

        match binding.kind {
            BindingKind::Box { half_extents } => {
                assert!(approx_eq(half_extents, Vec3::new(1.0, 0.25, 2.0), 1e-5))
            }
            _ => panic!("expected box binding"),
        }
        let body = world.body(binding.body).expect("body");
        assert!(approx_eq(to_render_vector(body.translation()), Vec3::new(0.0, 1.0, 0.0), 1e-5));

        // Mass properties пересчитываются на step
        world.step();
        let body = world.body(binding.body).expect("body");
        assert!((body.mass() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_wheel_binding_radius_mass_damping() {
        let (scene, hierarchy) = laid_out_scene();
        let mut world = PhysicsWorld::new(&SimConfig::default());
        let wheel = hierarchy.descendant("Wheel").expect("wheel");

        let binding = PhysicsBinding::new_wheel(wheel, &hierarchy, &scene, &mut world, &VehicleConfig::default());

        match &binding.kind {
            BindingKind::Wheel { radius, material } => {
                // Полигон 16 вершин: по Z диаметр ровно 2r
                assert!((radius - 0.5).abs() < 1e-3, "radius = {}", radius);
                assert_eq!(material.name, "wheel");
            }
            _ => panic!("expected wheel binding"),
        }
        assert!(binding.is_wheel());

        world.step();
        let body = world.body(binding.body).expect("body");
        assert!((body.mass() - 10.0).abs() < 1e-4);
        assert!((body.angular_damping() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_center_offset_is_center_minus_local() {
        let (scene, hierarchy) = laid_out_scene();
        let mut world = PhysicsWorld::new(&SimConfig::default());
        let wheel = hierarchy.descendant("Wheel").expect("wheel");
        let node = hierarchy.part(wheel).node();

        let binding = PhysicsBinding::new_wheel(wheel, &hierarchy, &scene, &mut world, &VehicleConfig::default());

        let reconstructed = scene.position(node) + binding.center_offset;
        assert!(approx_eq(reconstructed, scene.world_center(node), 1e-6));
    }

    #[test]
    fn test_registry_keeps_insertion_order() {
        let (scene, hierarchy) = laid_out_scene();
        let mut world = PhysicsWorld::new(&SimConfig::default());
        let config = VehicleConfig::default();
        let mut registry = BindingRegistry::new();

        let chassis = hierarchy.descendant("Chassis").expect("chassis");
        let wheel = hierarchy.descendant("Wheel").expect("wheel");
        let first = registry.register(PhysicsBinding::new_box(chassis, &hierarchy, &scene, &mut world, &config));
        let second = registry.register(PhysicsBinding::new_wheel(wheel, &hierarchy, &scene, &mut world, &config));

        assert_eq!((first.index(), second.index()), (0, 1));
        assert_eq!(registry.len(), 2);
        let parts: Vec<PartId> = registry.iter().map(|b| b.part).collect();
        assert_eq!(parts, vec![chassis, wheel]);
        assert_eq!(world.body_count(), 2);
    }
}
