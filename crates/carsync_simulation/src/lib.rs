//! CARSYNC Simulation Core
//!
//! Синхронизация визуальной иерархии модели с rigid-body физикой.
//!
//! Pipeline:
//! - `scene` — дерево нод (сторона рендера) + загрузка модели
//! - `parts` — flatten иерархии в именованные части + one-time shift
//! - `physics` — rapier world, bindings part ⇄ body, per-frame sync
//! - `vehicle` — chassis + 4 колеса, drive/steer
//! - `session` — владелец всего состояния, bevy plugin с tick-цепочкой

use bevy::prelude::*;

pub mod config;
pub mod error;
pub mod logger;
pub mod math;
pub mod parts;
pub mod physics;
pub mod scene;
pub mod session;
pub mod vehicle;

// Re-export основных типов
pub use config::{SimConfig, SimulationSettings, VehicleConfig};
pub use error::{SyncError, SyncResult};
pub use logger::{init_logger, LogLevel, LogPrinter};
pub use math::Axis;
pub use parts::{GroupPart, LaidOutHierarchy, MeshPart, PartId, RawHierarchy, VisualPart};
pub use physics::{sync_bindings, BindingKind, BindingRegistry, PhysicsBinding, PhysicsWorld};
pub use scene::{Geometry, ModelAsset, NodeId, Scene};
pub use session::{Session, SetupPhase, VehicleSimPlugin, VehicleSimSet};
pub use vehicle::{DriveInput, DriveKey, Vehicle};

/// Путь к демо-модели (относительно корня workspace)
pub const DEFAULT_MODEL_PATH: &str = "assets/jeep.json";

/// Создаёт minimal Bevy App для headless симуляции
///
/// `seed` — seed uuid'ов безымянных нод (детерминизм имён между прогонами).
pub fn create_headless_app(seed: u64) -> App {
    let mut settings = SimulationSettings::default();
    settings.sim.seed = seed;
    create_headless_app_with(settings)
}

pub fn create_headless_app_with(settings: SimulationSettings) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .add_plugins(VehicleSimPlugin { settings });

    app
}

/// Один fixed tick вручную (детерминированно, без реального времени)
pub fn run_fixed_tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}
