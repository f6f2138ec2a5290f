//! Vector/transform утилиты: render (glam) ⇄ physics (nalgebra/rapier)
//!
//! Чистые функции без side effects.
//! Euler везде в порядке XYZ (intrinsic), как у нод сцены.

use bevy::math::bounding::{Aabb3d, BoundingVolume};
use bevy::prelude::*;
use bevy_rapier3d::rapier::math::{Real, Rotation, Vector};
use bevy_rapier3d::rapier::na::{Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// Ось для per-axis вращения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    /// Компонента вектора вдоль оси
    pub fn component(self, v: Vec3) -> f32 {
        v[self.index()]
    }

    pub fn with_component(self, mut v: Vec3, value: f32) -> Vec3 {
        v[self.index()] = value;
        v
    }
}

pub fn to_physics_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

pub fn to_render_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn to_physics_rotation(q: Quat) -> Rotation<Real> {
    // nalgebra: Quaternion::new(w, i, j, k)
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub fn to_render_quat(r: &Rotation<Real>) -> Quat {
    Quat::from_xyzw(r.i, r.j, r.k, r.w).normalize()
}

/// Euler XYZ → quaternion (как у нод сцены)
pub fn quat_from_euler(euler: Vec3) -> Quat {
    Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z)
}

/// Quaternion → Euler XYZ (для per-axis rotate в синхронизаторе)
pub fn euler_from_quat(q: Quat) -> Vec3 {
    let (x, y, z) = q.to_euler(EulerRot::XYZ);
    Vec3::new(x, y, z)
}

pub fn aabb_center(aabb: &Aabb3d) -> Vec3 {
    Vec3::from(aabb.center())
}

pub fn aabb_size(aabb: &Aabb3d) -> Vec3 {
    Vec3::from(aabb.half_size()) * 2.0
}

/// Сравнение с допуском (float drift после physics step / rotate)
pub fn approx_eq(a: Vec3, b: Vec3, epsilon: f32) -> bool {
    (a - b).abs().max_element() <= epsilon
}
