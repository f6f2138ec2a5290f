//! Scene graph (сторона рендера)
//!
//! - `node` — ноды, transform'ы, геометрия
//! - `graph` — арена `Scene` + world queries
//! - `asset` — загрузка модели из JSON

pub mod asset;
pub mod graph;
pub mod node;

pub use asset::{AssetGeometry, AssetNode, ModelAsset};
pub use graph::Scene;
pub use node::{Geometry, NodeId, NodeKind, NodeTransform, SceneNode};
