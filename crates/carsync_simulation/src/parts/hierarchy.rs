//! Hierarchy pipeline: flatten → lay out
//!
//! ```text
//! Scene nodes ──flatten──► RawHierarchy ──lay_out (shift)──► LaidOutHierarchy
//! ```
//!
//! Physics bindings принимают только `LaidOutHierarchy`: порядок
//! "сначала shift, потом offsets bindings" проверяет компилятор.

use std::collections::BTreeMap;

use bevy::prelude::*;

use super::{GroupPart, MeshPart, PartCore, PartId, VisualPart};
use crate::error::{SyncError, SyncResult};
use crate::logger;
use crate::scene::{NodeId, NodeKind, Scene};

/// Части сразу после обхода (offsets сняты, ничего не сдвинуто)
#[derive(Debug, Clone)]
pub struct RawHierarchy {
    parts: Vec<VisualPart>,
    root: PartId,
}

/// Вставка в транзитивную карту; повтор имени = ошибка
fn insert_unique(
    components: &mut BTreeMap<String, PartId>,
    name: &str,
    id: PartId,
    group: &str,
) -> SyncResult<()> {
    if components.insert(name.to_owned(), id).is_some() {
        return Err(SyncError::DuplicatePartName {
            name: name.to_owned(),
            group: group.to_owned(),
        });
    }
    Ok(())
}

fn wrap_node(
    scene: &Scene,
    node: NodeId,
    inherited_offset: Vec3,
    parts: &mut Vec<VisualPart>,
) -> SyncResult<PartId> {
    let core = PartCore::capture(scene, node, inherited_offset);

    let part = match &scene.node(node).kind {
        NodeKind::Mesh(_) => VisualPart::Mesh(MeshPart { core }),
        NodeKind::Group => {
            let child_offset = core.child_offset();
            let mut components = BTreeMap::new();
            let mut direct_components = BTreeMap::new();

            for &child in scene.children(node) {
                let id = wrap_node(scene, child, child_offset, parts)?;
                let child_part = &parts[id.0];
                let name = child_part.name().to_owned();

                insert_unique(&mut components, &name, id, core.name())?;
                direct_components.insert(name, id);

                if let Some(child_group) = child_part.as_group() {
                    for (nested_name, &nested_id) in &child_group.components {
                        insert_unique(&mut components, nested_name, nested_id, core.name())?;
                    }
                }
            }

            VisualPart::Group(GroupPart {
                core,
                components,
                direct_components,
                rotation: Vec3::ZERO,
            })
        }
        NodeKind::Other(kind) => {
            return Err(SyncError::UnsupportedNodeKind {
                kind: kind.clone(),
                node: core.name().to_owned(),
            })
        }
    };

    let id = PartId(parts.len());
    parts.push(part);
    Ok(id)
}

impl RawHierarchy {
    /// Обойти поддерево `root` и обернуть каждую ноду.
    /// Корень обязан быть группой.
    pub fn flatten(scene: &Scene, root: NodeId) -> SyncResult<Self> {
        let root_node = scene.node(root);
        if !matches!(root_node.kind, NodeKind::Group) {
            return Err(SyncError::UnsupportedNodeKind {
                kind: root_node.kind.type_name().to_owned(),
                node: root_node.display_name().to_owned(),
            });
        }

        let mut parts = Vec::new();
        let root = wrap_node(scene, root, Vec3::ZERO, &mut parts)?;
        Ok(Self { parts, root })
    }

    pub fn root(&self) -> &GroupPart {
        root_group(&self.parts, self.root)
    }

    pub fn parts(&self) -> &[VisualPart] {
        &self.parts
    }

    /// One-time shift. Выполняется только если корень — верх сцены (нет родителя).
    pub fn lay_out(self, scene: &mut Scene) -> LaidOutHierarchy {
        let root = root_group(&self.parts, self.root);
        let shifted = scene.parent(root.core.node()).is_none();

        if shifted {
            root.shift(&self.parts, scene);
            logger::log(&format!(
                "📐 Shifted `{}`: {} parts moved to geometric centers",
                root.core.name(),
                self.parts.len()
            ));
        }

        LaidOutHierarchy {
            parts: self.parts,
            root: self.root,
            shifted,
        }
    }
}

/// Части после shift pass — готовы для physics bindings
#[derive(Debug, Clone)]
pub struct LaidOutHierarchy {
    parts: Vec<VisualPart>,
    root: PartId,
    shifted: bool,
}

impl LaidOutHierarchy {
    pub fn root(&self) -> &GroupPart {
        root_group(&self.parts, self.root)
    }

    pub fn root_id(&self) -> PartId {
        self.root
    }

    pub fn root_node(&self) -> NodeId {
        self.root().core.node()
    }

    pub fn was_shifted(&self) -> bool {
        self.shifted
    }

    pub fn parts(&self) -> &[VisualPart] {
        &self.parts
    }

    pub fn part(&self, id: PartId) -> &VisualPart {
        &self.parts[id.0]
    }

    pub fn part_mut(&mut self, id: PartId) -> &mut VisualPart {
        &mut self.parts[id.0]
    }

    pub fn descendant(&self, name: &str) -> SyncResult<PartId> {
        self.root().descendant(name)
    }
}

fn root_group(parts: &[VisualPart], root: PartId) -> &GroupPart {
    match &parts[root.0] {
        VisualPart::Group(group) => group,
        // flatten пускает только группу в корень
        VisualPart::Mesh(_) => unreachable!("hierarchy root is always a group"),
    }
}
