//! Scene graph — арена нод с parent/child связями
//!
//! Роль "рендер-движка" для sync-слоя:
//! - локальные transform'ы (translation + Euler XYZ + scale)
//! - world transform / world AABB (union геометрии всех потомков)
//! - сдвиг геометрии mesh'а, attach/detach
//!
//! Клиент зеркалит ноды в bevy entities, сам граф рендер не знает.

use bevy::math::bounding::Aabb3d;
use bevy::math::{Affine3A, Vec3A};
use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::node::{Geometry, NodeId, NodeKind, NodeTransform, SceneNode};
use crate::math::{aabb_center, aabb_size};

pub struct Scene {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
    /// Детерминированные uuid для нод (одинаковый seed → одинаковые имена)
    rng: ChaCha8Rng,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Scene {
    pub fn new(seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn next_uuid(&mut self) -> String {
        let high: u64 = self.rng.gen();
        let low: u32 = self.rng.gen();
        format!("{:016x}-{:08x}", high, low)
    }

    pub fn spawn(&mut self, name: impl Into<String>, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let uuid = self.next_uuid();
        self.nodes.push(SceneNode {
            name: name.into(),
            uuid,
            kind,
            transform: NodeTransform::default(),
            parent: None,
            children: Vec::new(),
        });

        match parent {
            Some(parent) => {
                self.nodes[parent.0].children.push(id);
                self.nodes[id.0].parent = Some(parent);
            }
            None => self.roots.push(id),
        }
        id
    }

    pub fn spawn_group(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        self.spawn(name, NodeKind::Group, parent)
    }

    pub fn spawn_mesh(
        &mut self,
        name: impl Into<String>,
        geometry: Geometry,
        parent: Option<NodeId>,
    ) -> NodeId {
        self.spawn(name, NodeKind::Mesh(geometry), parent)
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.display_name() == name)
            .map(|(id, _)| id)
    }

    /// `ancestor` лежит на пути от `node` к корню (включая сам `node`)
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Перевесить `child` под `parent`. Цикл в дереве не допускаем → false.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> bool {
        if self.is_ancestor(child, parent) {
            return false;
        }
        self.detach(child);
        self.roots.retain(|root| *root != child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        true
    }

    /// Отцепить от родителя (нода становится корнем). Local transform не меняется.
    pub fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes[child.0].parent.take() else {
            return;
        };
        self.nodes[parent.0].children.retain(|c| *c != child);
        self.roots.push(child);
    }

    pub fn transform(&self, id: NodeId) -> &NodeTransform {
        &self.nodes[id.0].transform
    }

    pub fn transform_mut(&mut self, id: NodeId) -> &mut NodeTransform {
        &mut self.nodes[id.0].transform
    }

    pub fn position(&self, id: NodeId) -> Vec3 {
        self.nodes[id.0].transform.translation
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec3) {
        self.nodes[id.0].transform.translation = position;
    }

    pub fn euler(&self, id: NodeId) -> Vec3 {
        self.nodes[id.0].transform.euler
    }

    pub fn rotation(&self, id: NodeId) -> Quat {
        self.nodes[id.0].transform.rotation()
    }

    pub fn world_affine(&self, id: NodeId) -> Affine3A {
        let local = self.nodes[id.0].transform.affine();
        match self.parent(id) {
            Some(parent) => self.world_affine(parent) * local,
            None => local,
        }
    }

    /// Translation world transform'а (НЕ геометрический центр)
    pub fn world_position(&self, id: NodeId) -> Vec3 {
        Vec3::from(self.world_affine(id).translation)
    }

    /// Pre-order обход поддерева (сам `id` первый)
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// World AABB всей геометрии поддерева; `None` если вершин нет
    pub fn world_bounds(&self, id: NodeId) -> Option<Aabb3d> {
        let mut min = Vec3A::splat(f32::INFINITY);
        let mut max = Vec3A::splat(f32::NEG_INFINITY);
        let mut any = false;

        for node_id in self.descendants(id) {
            let Some(geometry) = self.nodes[node_id.0].geometry() else {
                continue;
            };
            if geometry.is_empty() {
                continue;
            }
            let affine = self.world_affine(node_id);
            for vertex in &geometry.vertices {
                let world = affine.transform_point3a(Vec3A::from(*vertex));
                min = min.min(world);
                max = max.max(world);
                any = true;
            }
        }

        any.then_some(Aabb3d { min, max })
    }

    /// Центр world AABB; пустое поддерево → (0, 0, 0)
    pub fn world_center(&self, id: NodeId) -> Vec3 {
        self.world_bounds(id)
            .map(|aabb| aabb_center(&aabb))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn world_size(&self, id: NodeId) -> Vec3 {
        self.world_bounds(id)
            .map(|aabb| aabb_size(&aabb))
            .unwrap_or(Vec3::ZERO)
    }

    /// Откат арены к `len` нод: всё, что заспавнено позже, удаляется
    /// вместе со ссылками на него (roots, children старых нод).
    pub fn truncate(&mut self, len: usize) {
        if len >= self.nodes.len() {
            return;
        }
        self.nodes.truncate(len);
        self.roots.retain(|root| root.0 < len);
        for node in &mut self.nodes {
            node.children.retain(|child| child.0 < len);
        }
    }

    /// Сдвиг вершин mesh'а. Для не-mesh нод ничего не делает → false.
    pub fn translate_geometry(&mut self, id: NodeId, offset: Vec3) -> bool {
        match &mut self.nodes[id.0].kind {
            NodeKind::Mesh(geometry) => {
                geometry.translate(offset);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq;

    fn unit_box(scene: &mut Scene, name: &str, center: Vec3, parent: Option<NodeId>) -> NodeId {
        scene.spawn_mesh(name, Geometry::cuboid(center, Vec3::ONE), parent)
    }

    #[test]
    fn test_world_position_accumulates_parents() {
        let mut scene = Scene::new(1);
        let root = scene.spawn_group("Root", None);
        let child = scene.spawn_group("Child", Some(root));
        scene.set_position(root, Vec3::new(1.0, 0.0, 0.0));
        scene.set_position(child, Vec3::new(0.0, 2.0, 0.0));

        assert!(approx_eq(scene.world_position(child), Vec3::new(1.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn test_world_bounds_unions_descendants() {
        let mut scene = Scene::new(1);
        let root = scene.spawn_group("Root", None);
        unit_box(&mut scene, "A", Vec3::new(-2.0, 0.0, 0.0), Some(root));
        unit_box(&mut scene, "B", Vec3::new(2.0, 0.0, 0.0), Some(root));

        assert!(approx_eq(scene.world_size(root), Vec3::new(5.0, 1.0, 1.0), 1e-6));
        assert!(approx_eq(scene.world_center(root), Vec3::ZERO, 1e-6));
    }

    #[test]
    fn test_world_bounds_follow_rotation() {
        let mut scene = Scene::new(1);
        let mesh = scene.spawn_mesh("Plank", Geometry::cuboid(Vec3::ZERO, Vec3::new(4.0, 1.0, 1.0)), None);
        scene.transform_mut(mesh).euler = Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0);

        // Повёрнутая на 90° по Y доска вытянута вдоль Z
        let size = scene.world_size(mesh);
        assert!(approx_eq(size, Vec3::new(1.0, 1.0, 4.0), 1e-5), "size = {:?}", size);
    }

    #[test]
    fn test_empty_group_center_is_zero() {
        let mut scene = Scene::new(1);
        let root = scene.spawn_group("Empty", None);
        scene.set_position(root, Vec3::splat(3.0));
        assert!(scene.world_bounds(root).is_none());
        assert_eq!(scene.world_center(root), Vec3::ZERO);
    }

    #[test]
    fn test_attach_detach_and_cycle_guard() {
        let mut scene = Scene::new(1);
        let a = scene.spawn_group("A", None);
        let b = scene.spawn_group("B", None);
        assert!(scene.attach(b, a));
        assert_eq!(scene.parent(b), Some(a));
        assert_eq!(scene.roots(), &[a]);

        // a под b → цикл
        assert!(!scene.attach(a, b));

        scene.detach(b);
        assert_eq!(scene.parent(b), None);
        assert!(scene.children(a).is_empty());
        assert!(scene.roots().contains(&b));
    }

    #[test]
    fn test_translate_geometry_moves_only_meshes() {
        let mut scene = Scene::new(1);
        let group = scene.spawn_group("G", None);
        let mesh = unit_box(&mut scene, "M", Vec3::ZERO, Some(group));

        assert!(!scene.translate_geometry(group, Vec3::X));
        assert!(scene.translate_geometry(mesh, Vec3::X));
        assert!(approx_eq(scene.world_center(mesh), Vec3::X, 1e-6));
        assert_eq!(scene.position(mesh), Vec3::ZERO);
    }

    #[test]
    fn test_truncate_drops_late_nodes_and_links() {
        let mut scene = Scene::new(1);
        let keep = scene.spawn_group("Keep", None);
        let mark = scene.len();

        let late_root = scene.spawn_group("LateRoot", None);
        unit_box(&mut scene, "LateChild", Vec3::ZERO, Some(late_root));
        unit_box(&mut scene, "LateUnderKeep", Vec3::ZERO, Some(keep));

        scene.truncate(mark);

        assert_eq!(scene.len(), 1);
        assert_eq!(scene.roots(), &[keep]);
        assert!(scene.children(keep).is_empty());
        assert!(scene.find_by_name("LateChild").is_none());

        // Больше текущей длины → no-op
        scene.truncate(10);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_uuid_deterministic_per_seed() {
        let mut first = Scene::new(7);
        let mut second = Scene::new(7);
        let a = first.spawn_group("", None);
        let b = second.spawn_group("", None);
        assert_eq!(first.node(a).uuid, second.node(b).uuid);
        assert_eq!(first.node(a).display_name(), first.node(a).uuid);
    }
}
