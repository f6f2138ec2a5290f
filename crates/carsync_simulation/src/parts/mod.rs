//! Visual parts — обёртки над нодами сцены
//!
//! `VisualPart` = закрытый sum type:
//! - `MeshPart` — лист с геометрией
//! - `GroupPart` — композит (транзитивная + прямая карта имён потомков)
//!
//! Обе вариации помнят offset chain, нужный чтобы physics body
//! (живёт в геометрическом центре) и нода (origin где угодно) совпадали.
//!
//! Части живут в арене иерархии и адресуются `PartId`.

pub mod hierarchy;


use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::error::{SyncError, SyncResult};
use crate::math::Axis;
use crate::scene::{NodeId, Scene};

pub use hierarchy::{LaidOutHierarchy, RawHierarchy};

/// Индекс части в арене иерархии
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartId(pub(crate) usize);

impl PartId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Общие поля любой части. Offsets фиксируются один раз при создании.
#[derive(Debug, Clone, PartialEq)]
pub struct PartCore {
    name: String,
    node: NodeId,
    inherited_offset: Vec3,
    offset_from_parent: Vec3,
}

impl PartCore {
    /// Снимок offsets ДО любых перемещений (shift ещё не выполнялся)
    pub(crate) fn capture(scene: &Scene, node: NodeId, inherited_offset: Vec3) -> Self {
        let parent_center = scene
            .parent(node)
            .map(|parent| scene.world_center(parent))
            .unwrap_or(Vec3::ZERO);

        Self {
            name: scene.node(node).display_name().to_owned(),
            node,
            inherited_offset,
            offset_from_parent: parent_center - scene.world_center(node),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn inherited_offset(&self) -> Vec3 {
        self.inherited_offset
    }

    pub fn offset_from_parent(&self) -> Vec3 {
        self.offset_from_parent
    }

    /// Offset, который получают дети этой части
    pub fn child_offset(&self) -> Vec3 {
        self.inherited_offset + self.offset_from_parent
    }
}

/// Выставить угол на одной оси; с pivot'ом позиция поворачивается вокруг него
/// на ту же дельту (pivot в пространстве родителя).
fn set_axis_rotation(scene: &mut Scene, node: NodeId, angle: f32, axis: Axis, pivot: Option<Vec3>) {
    let old_rotation = scene.rotation(node);
    let transform = scene.transform_mut(node);
    transform.euler = axis.with_component(transform.euler, angle);

    if let Some(pivot) = pivot {
        let delta = transform.rotation() * old_rotation.inverse();
        transform.translation = pivot + delta * (transform.translation - pivot);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    pub(crate) core: PartCore,
}

impl MeshPart {
    pub fn rotate(&mut self, scene: &mut Scene, angle: f32, axis: Axis, pivot: Option<Vec3>) {
        set_axis_rotation(scene, self.core.node, angle, axis, pivot);
    }

    pub fn rotate_extra(&mut self, scene: &mut Scene, angle: f32, axis: Axis, pivot: Option<Vec3>) {
        let current = axis.component(scene.euler(self.core.node));
        self.rotate(scene, current + angle, axis, pivot);
    }

    /// Для листа — просто позиция ноды
    pub fn local_position(&self, scene: &Scene) -> Vec3 {
        scene.position(self.core.node)
    }

    /// Вершины сдвигаются так, что (0,0,0) ноды = бывший геометрический центр,
    /// сама нода встаёт на −offset_from_parent.
    pub fn shift(&self, scene: &mut Scene) {
        scene.translate_geometry(self.core.node, self.core.child_offset());
        scene.set_position(self.core.node, -self.core.offset_from_parent);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupPart {
    pub(crate) core: PartCore,
    /// Все потомки (транзитивно)
    pub(crate) components: BTreeMap<String, PartId>,
    /// Только прямые дети
    pub(crate) direct_components: BTreeMap<String, PartId>,
    /// Отслеживаемый Euler XYZ группы
    pub(crate) rotation: Vec3,
}

impl GroupPart {
    pub fn components(&self) -> &BTreeMap<String, PartId> {
        &self.components
    }

    pub fn direct_components(&self) -> &BTreeMap<String, PartId> {
        &self.direct_components
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn descendant(&self, name: &str) -> SyncResult<PartId> {
        self.components
            .get(name)
            .copied()
            .ok_or_else(|| SyncError::DescendantNotFound {
                name: name.to_owned(),
                group: self.core.name.clone(),
                known: self.components.keys().cloned().collect(),
            })
    }

    pub fn rotate(&mut self, scene: &mut Scene, angle: f32, axis: Axis, pivot: Option<Vec3>) {
        set_axis_rotation(scene, self.core.node, angle, axis, pivot);
        self.rotation = axis.with_component(self.rotation, angle);
    }

    pub fn rotate_extra(&mut self, scene: &mut Scene, angle: f32, axis: Axis, pivot: Option<Vec3>) {
        let current = axis.component(self.rotation);
        self.rotate(scene, current + angle, axis, pivot);
    }

    /// Центр группы относительно world position родителя (world position
    /// ребёнка совпадает с родительской, поэтому берём центр)
    pub fn local_position(&self, scene: &Scene) -> Vec3 {
        match scene.parent(self.core.node) {
            Some(parent) => scene.world_center(self.core.node) - scene.world_position(parent),
            None => Vec3::ZERO,
        }
    }

    /// Post-order: сначала прямые дети, потом сама группа
    pub fn shift(&self, parts: &[VisualPart], scene: &mut Scene) {
        for child in self.direct_components.values() {
            parts[child.0].shift(parts, scene);
        }
        scene.set_position(self.core.node, -self.core.offset_from_parent);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisualPart {
    Mesh(MeshPart),
    Group(GroupPart),
}

impl VisualPart {
    pub fn core(&self) -> &PartCore {
        match self {
            VisualPart::Mesh(mesh) => &mesh.core,
            VisualPart::Group(group) => &group.core,
        }
    }

    pub fn name(&self) -> &str {
        self.core().name()
    }

    pub fn node(&self) -> NodeId {
        self.core().node()
    }

    pub fn as_group(&self) -> Option<&GroupPart> {
        match self {
            VisualPart::Group(group) => Some(group),
            VisualPart::Mesh(_) => None,
        }
    }

    pub fn rotate(&mut self, scene: &mut Scene, angle: f32, axis: Axis, pivot: Option<Vec3>) {
        match self {
            VisualPart::Mesh(mesh) => mesh.rotate(scene, angle, axis, pivot),
            VisualPart::Group(group) => group.rotate(scene, angle, axis, pivot),
        }
    }

    pub fn rotate_extra(&mut self, scene: &mut Scene, angle: f32, axis: Axis, pivot: Option<Vec3>) {
        match self {
            VisualPart::Mesh(mesh) => mesh.rotate_extra(scene, angle, axis, pivot),
            VisualPart::Group(group) => group.rotate_extra(scene, angle, axis, pivot),
        }
    }

    pub fn local_position(&self, scene: &Scene) -> Vec3 {
        match self {
            VisualPart::Mesh(mesh) => mesh.local_position(scene),
            VisualPart::Group(group) => group.local_position(scene),
        }
    }

    pub fn shift(&self, parts: &[VisualPart], scene: &mut Scene) {
        match self {
            VisualPart::Mesh(mesh) => mesh.shift(scene),
            VisualPart::Group(group) => group.shift(parts, scene),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;
    use crate::scene::Geometry;
    use std::f32::consts::FRAC_PI_2;

    fn mesh_part(scene: &mut Scene, center: Vec3) -> MeshPart {
        let node = scene.spawn_mesh("Box", Geometry::cuboid(center, Vec3::ONE), None);
        MeshPart {
            core: PartCore::capture(scene, node, Vec3::ZERO),
        }
    }

    #[test]
    fn test_offset_from_parent_uses_world_centers() {
        let mut scene = Scene::new(1);
        let root = scene.spawn_group("Root", None);
        scene.spawn_mesh("A", Geometry::cuboid(Vec3::new(-1.0, 0.0, 0.0), Vec3::ONE), Some(root));
        let b = scene.spawn_mesh("B", Geometry::cuboid(Vec3::new(3.0, 0.0, 0.0), Vec3::ONE), Some(root));

        // центр Root = (1, 0, 0), центр B = (3, 0, 0)
        let core = PartCore::capture(&scene, b, Vec3::ZERO);
        assert!(approx_eq(core.offset_from_parent(), Vec3::new(-2.0, 0.0, 0.0), 1e-6));

        // Без родителя: 0 − свой центр
        let root_core = PartCore::capture(&scene, root, Vec3::ZERO);
        assert!(approx_eq(root_core.offset_from_parent(), Vec3::new(-1.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_rotate_sets_absolute_angle() {
        let mut scene = Scene::new(1);
        let mut part = mesh_part(&mut scene, Vec3::ZERO);

        part.rotate(&mut scene, 0.5, Axis::Y, None);
        part.rotate(&mut scene, 0.25, Axis::Y, None);
        assert!((scene.euler(part.core.node()).y - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_extra_accumulates() {
        let mut scene = Scene::new(1);
        let mut part = mesh_part(&mut scene, Vec3::ZERO);

        part.rotate_extra(&mut scene, 0.25, Axis::X, None);
        part.rotate_extra(&mut scene, 0.25, Axis::X, None);
        assert!((scene.euler(part.core.node()).x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_about_pivot_moves_position() {
        let mut scene = Scene::new(1);
        let mut part = mesh_part(&mut scene, Vec3::ZERO);
        scene.set_position(part.core.node(), Vec3::new(2.0, 0.0, 0.0));

        part.rotate(&mut scene, FRAC_PI_2, Axis::Y, Some(Vec3::new(1.0, 0.0, 0.0)));
        // (2,0,0) вокруг (1,0,0) на 90° по Y → (1,0,-1)
        assert!(approx_eq(scene.position(part.core.node()), Vec3::new(1.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn test_rotate_round_trip_about_pivot() {
        let mut scene = Scene::new(1);
        let mut part = mesh_part(&mut scene, Vec3::new(0.5, 0.0, 0.0));
        let node = part.core.node();
        scene.set_position(node, Vec3::new(2.0, 1.0, -3.0));
        let before = scene.world_center(node);
        let pivot = Some(Vec3::new(-1.0, 4.0, 2.0));

        for axis in Axis::ALL {
            part.rotate(&mut scene, 1.2, axis, pivot);
            part.rotate(&mut scene, 0.0, axis, pivot);
            assert!(approx_eq(scene.world_center(node), before, 1e-4), "axis {:?}", axis);
        }
    }

    #[test]
    fn test_group_rotate_tracks_rotation() {
        let mut scene = Scene::new(1);
        let node = scene.spawn_group("G", None);
        let mut group = GroupPart {
            core: PartCore::capture(&scene, node, Vec3::ZERO),
            components: BTreeMap::new(),
            direct_components: BTreeMap::new(),
            rotation: Vec3::ZERO,
        };

        group.rotate_extra(&mut scene, 0.3, Axis::Z, None);
        group.rotate_extra(&mut scene, 0.3, Axis::Z, None);
        assert!((group.rotation().z - 0.6).abs() < 1e-6);
        assert!((scene.euler(node).z - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_mesh_shift_moves_geometry_not_world() {
        let mut scene = Scene::new(1);
        let part = mesh_part(&mut scene, Vec3::new(4.0, 1.0, 0.0));
        let before = scene.world_center(part.core.node());

        part.shift(&mut scene);

        let node = part.core.node();
        assert!(approx_eq(scene.world_center(node), before, 1e-6));
        // Нода теперь стоит в геометрическом центре
        assert!(approx_eq(scene.position(node), before, 1e-6));
        assert!(approx_eq(part.local_position(&scene), before, 1e-6));
    }
}
