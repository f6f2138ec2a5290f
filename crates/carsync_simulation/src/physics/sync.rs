//! Per-frame synchronizer: physics → visual
//!
//! Запускается строго ПОСЛЕ physics step и ДО рендера:
//! 1. rotation body → Euler XYZ → `rotate` по каждой оси (абсолютно)
//! 2. position ноды = body position − center_offset

use bevy_rapier3d::rapier::prelude::RigidBody;

use super::binding::{BindingRegistry, PhysicsBinding};
use super::PhysicsWorld;
use crate::math::{euler_from_quat, to_render_quat, to_render_vector, Axis};
use crate::parts::{LaidOutHierarchy, VisualPart};
use crate::scene::Scene;

impl PhysicsBinding {
    pub fn sync_from_body(&self, body: &RigidBody, part: &mut VisualPart, scene: &mut Scene) {
        let euler = euler_from_quat(to_render_quat(body.rotation()));
        for axis in Axis::ALL {
            part.rotate(scene, axis.component(euler), axis, None);
        }

        scene.set_position(self.node, to_render_vector(body.translation()) - self.center_offset);
    }
}

/// Обновить все зарегистрированные части. Returns: сколько синхронизировано.
pub fn sync_bindings(
    registry: &BindingRegistry,
    hierarchy: &mut LaidOutHierarchy,
    scene: &mut Scene,
    world: &PhysicsWorld,
) -> usize {
    let mut synced = 0;
    for binding in registry.iter() {
        let Some(body) = world.body(binding.body) else {
            continue;
        };
        binding.sync_from_body(body, hierarchy.part_mut(binding.part), scene);
        synced += 1;
    }
    synced
}
