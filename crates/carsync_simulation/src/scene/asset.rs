//! Model asset: JSON описание дерева нод → ноды `Scene`
//!
//! Формат (`assets/jeep.json`):
//! ```json
//! {
//!   "name": "Jeep",
//!   "root": {
//!     "kind": "group",
//!     "name": "Jeep",
//!     "children": [
//!       { "kind": "mesh", "name": "Chassis",
//!         "geometry": { "shape": "cuboid", "center": [0, 1, 0], "size": [2, 0.5, 4] } }
//!     ]
//!   }
//! }
//! ```
//!
//! `kind` кроме `group`/`mesh` (например `light`) загружается как `NodeKind::Other`,
//! отказ происходит позже, при flattening.

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::graph::Scene;
use super::node::{Geometry, NodeId, NodeKind};
use crate::error::{SyncError, SyncResult};

fn default_segments() -> usize {
    16
}

fn default_axis() -> [f32; 3] {
    [1.0, 0.0, 0.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum AssetGeometry {
    Cuboid {
        center: [f32; 3],
        size: [f32; 3],
    },
    Cylinder {
        center: [f32; 3],
        radius: f32,
        width: f32,
        #[serde(default = "default_axis")]
        axis: [f32; 3],
        #[serde(default = "default_segments")]
        segments: usize,
    },
    Vertices {
        vertices: Vec<[f32; 3]>,
    },
}

impl AssetGeometry {
    pub fn build(&self) -> Geometry {
        match self {
            AssetGeometry::Cuboid { center, size } => {
                Geometry::cuboid(Vec3::from_array(*center), Vec3::from_array(*size))
            }
            AssetGeometry::Cylinder {
                center,
                radius,
                width,
                axis,
                segments,
            } => Geometry::cylinder(
                Vec3::from_array(*center),
                *radius,
                *width,
                Vec3::from_array(*axis),
                *segments,
            ),
            AssetGeometry::Vertices { vertices } => {
                Geometry::new(vertices.iter().copied().map(Vec3::from_array).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetNode {
    #[serde(default)]
    pub name: String,
    /// "group" | "mesh" | что угодно ещё
    pub kind: String,
    #[serde(default)]
    pub translation: [f32; 3],
    /// Euler XYZ (радианы)
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default)]
    pub geometry: Option<AssetGeometry>,
    #[serde(default)]
    pub children: Vec<AssetNode>,
}

impl AssetNode {
    fn node_kind(&self) -> NodeKind {
        match self.kind.as_str() {
            "group" => NodeKind::Group,
            "mesh" => NodeKind::Mesh(
                self.geometry
                    .as_ref()
                    .map(AssetGeometry::build)
                    .unwrap_or_default(),
            ),
            other => NodeKind::Other(other.to_owned()),
        }
    }

    fn spawn_into(&self, scene: &mut Scene, parent: Option<NodeId>) -> NodeId {
        let id = scene.spawn(self.name.clone(), self.node_kind(), parent);
        let transform = scene.transform_mut(id);
        transform.translation = Vec3::from_array(self.translation);
        transform.euler = Vec3::from_array(self.rotation);

        for child in &self.children {
            child.spawn_into(scene, Some(id));
        }
        id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAsset {
    #[serde(default)]
    pub name: String,
    pub root: AssetNode,
}

impl ModelAsset {
    pub fn from_json_str(source: &str) -> SyncResult<Self> {
        Self::parse(source, "<memory>")
    }

    pub fn from_path(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| SyncError::AssetLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&source, &path.display().to_string())
    }

    fn parse(source: &str, origin: &str) -> SyncResult<Self> {
        serde_json::from_str(source).map_err(|e| SyncError::AssetLoad {
            path: origin.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Создать ноды в сцене; корень модели — новый root сцены (без родителя)
    pub fn instantiate(&self, scene: &mut Scene) -> NodeId {
        self.root.spawn_into(scene, None)
    }
}
