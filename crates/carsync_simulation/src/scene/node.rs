//! Scene nodes: transform + kind (mesh geometry / group / прочее)

use bevy::math::Affine3A;
use bevy::prelude::*;

use crate::math::quat_from_euler;

/// Индекс ноды в арене `Scene`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Локальный transform ноды
///
/// Rotation хранится как Euler XYZ: per-axis `rotate` меняет ровно одну компоненту.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub euler: Vec3,
    pub scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            euler: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl NodeTransform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..default()
        }
    }

    pub fn rotation(&self) -> Quat {
        quat_from_euler(self.euler)
    }

    pub fn affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation(), self.translation)
    }
}

/// Вершины mesh'а в локальных координатах ноды
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Vec3>,
}

impl Geometry {
    pub fn new(vertices: Vec<Vec3>) -> Self {
        Self { vertices }
    }

    /// 8 углов axis-aligned коробки
    pub fn cuboid(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        let mut vertices = Vec::with_capacity(8);
        for sx in [-1.0, 1.0] {
            for sy in [-1.0, 1.0] {
                for sz in [-1.0, 1.0] {
                    vertices.push(center + half * Vec3::new(sx, sy, sz));
                }
            }
        }
        Self { vertices }
    }

    /// Цилиндр вдоль `axis` (два кольца по `segments` вершин)
    pub fn cylinder(center: Vec3, radius: f32, width: f32, axis: Vec3, segments: usize) -> Self {
        let axis = axis.normalize_or(Vec3::X);
        let (u, v) = axis.any_orthonormal_pair();
        let segments = segments.max(3);
        let mut vertices = Vec::with_capacity(segments * 2);
        for side in [-0.5, 0.5] {
            let ring_center = center + axis * (width * side);
            for i in 0..segments {
                let angle = std::f32::consts::TAU * i as f32 / segments as f32;
                vertices.push(ring_center + (u * angle.cos() + v * angle.sin()) * radius);
            }
        }
        Self { vertices }
    }

    /// Сдвиг самих вершин (transform ноды не трогаем)
    pub fn translate(&mut self, offset: Vec3) {
        for vertex in &mut self.vertices {
            *vertex += offset;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Mesh(Geometry),
    Group,
    /// Всё остальное (свет, камера, ...) — sync-слой такое не поддерживает
    Other(String),
}

impl NodeKind {
    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Mesh(_) => "Mesh",
            NodeKind::Group => "Group",
            NodeKind::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Имя из ассета (может быть пустым)
    pub name: String,
    /// Сгенерированный уникальный id (fallback для имени)
    pub uuid: String,
    pub kind: NodeKind,
    pub transform: NodeTransform,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl SceneNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Явное имя, иначе uuid
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.uuid
        } else {
            &self.name
        }
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        match &self.kind {
            NodeKind::Mesh(geometry) => Some(geometry),
            _ => None,
        }
    }
}
