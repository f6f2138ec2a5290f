//! Session — единственный владелец состояния сцены
//!
//! Scene + physics world + binding registry + модель + машина.
//! Никаких глобальных синглтонов: всё живёт в одном `Resource`.
//!
//! Tick (FixedUpdate, строго по порядку):
//! 1. `VehicleSimSet::Input` — сборка машины (если кадр уже отрендерен) + drive
//! 2. `VehicleSimSet::Physics` — physics step
//! 3. `VehicleSimSet::Sync` — body pose → ноды сцены
//!
//! Рендер (клиент) читает сцену после FixedUpdate → всегда видит
//! только что посчитанный кадр.

use std::path::Path;

use bevy::prelude::*;

use crate::config::SimulationSettings;
use crate::error::{SyncError, SyncResult};
use crate::logger;
use crate::parts::{LaidOutHierarchy, RawHierarchy};
use crate::physics::{sync_bindings, BindingRegistry, PhysicsWorld};
use crate::scene::{ModelAsset, NodeId, Scene};
use crate::vehicle::{DriveInput, Vehicle};

/// Этапы подготовки машины
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetupPhase {
    /// Модели ещё нет (или загрузка упала)
    #[default]
    AwaitingModel,
    /// Модель разложена, ждём первый отрендеренный кадр
    ModelLoaded,
    /// Машина собрана, ввод применяется
    Driving,
    /// Сборка машины упала — сцена дальше не настраивается
    Halted,
}

#[derive(Resource)]
pub struct Session {
    settings: SimulationSettings,
    scene: Scene,
    physics: PhysicsWorld,
    bindings: BindingRegistry,
    model: Option<LaidOutHierarchy>,
    vehicle: Option<Vehicle>,
    phase: SetupPhase,
    rendered_since_load: bool,
    /// После первого ввода drive применяется каждый tick (в т.ч. нулевой)
    moved_yet: bool,
    ticks: u64,
}

impl Session {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            scene: Scene::new(settings.sim.seed),
            physics: PhysicsWorld::new(&settings.sim),
            bindings: BindingRegistry::new(),
            model: None,
            vehicle: None,
            phase: SetupPhase::AwaitingModel,
            rendered_since_load: false,
            moved_yet: false,
            ticks: 0,
            settings,
        }
    }

    pub fn load_model(&mut self, path: impl AsRef<Path>) -> SyncResult<NodeId> {
        let path = path.as_ref();
        logger::log(&format!("📦 Loading model at {}", path.display()));
        let asset = ModelAsset::from_path(path).inspect_err(|err| {
            logger::log_error(&format!("❌ {err}"));
        })?;
        self.install_model(&asset)
    }

    /// Ноды → flatten → shift → сдвиг корня на `spawn_offset`
    pub fn install_model(&mut self, asset: &ModelAsset) -> SyncResult<NodeId> {
        if self.model.is_some() {
            return Err(SyncError::ModelAlreadyLoaded);
        }

        // Отклонённая модель не должна оставить нод в сцене
        let mark = self.scene.len();
        let root = asset.instantiate(&mut self.scene);
        let raw = match RawHierarchy::flatten(&self.scene, root) {
            Ok(raw) => raw,
            Err(err) => {
                logger::log_error(&format!("❌ Model `{}` rejected: {err}", asset.name));
                self.scene.truncate(mark);
                return Err(err);
            }
        };
        let laid_out = raw.lay_out(&mut self.scene);

        let placed = self.scene.position(root) + self.settings.sim.spawn_offset();
        self.scene.set_position(root, placed);

        logger::log_info(&format!(
            "✅ Model `{}` loaded: {} parts, root at {:?}",
            asset.name,
            laid_out.parts().len(),
            placed
        ));

        self.model = Some(laid_out);
        self.phase = SetupPhase::ModelLoaded;
        self.rendered_since_load = false;
        Ok(root)
    }

    /// Вызывается рендером после кадра: bounding boxes уже валидны
    pub fn notify_frame_rendered(&mut self) {
        if self.phase == SetupPhase::ModelLoaded && !self.rendered_since_load {
            self.rendered_since_load = true;
            logger::log("🖼️ First frame with model rendered");
        }
    }

    pub fn assemble_vehicle(&mut self) -> SyncResult<()> {
        let model = self.model.as_ref().ok_or(SyncError::MissingModel)?;
        match Vehicle::assemble(
            model,
            &self.scene,
            &mut self.physics,
            &mut self.bindings,
            &self.settings.vehicle,
        ) {
            Ok(vehicle) => {
                self.vehicle = Some(vehicle);
                self.phase = SetupPhase::Driving;
                Ok(())
            }
            Err(err) => {
                self.phase = SetupPhase::Halted;
                Err(err)
            }
        }
    }

    /// Фаза Input: отложенная сборка машины + управление
    pub fn apply_input(&mut self, input: DriveInput) -> SyncResult<()> {
        if self.phase == SetupPhase::ModelLoaded && self.rendered_since_load {
            self.assemble_vehicle()?;
        }

        if let Some(vehicle) = &mut self.vehicle {
            if !input.is_idle() || self.moved_yet {
                self.moved_yet = true;
                vehicle.drive(input.throttle, input.steer);
            }
            vehicle.apply_controls(&mut self.physics);
        }
        Ok(())
    }

    pub fn step_physics(&mut self) {
        self.physics.step();
        self.ticks += 1;
    }

    pub fn sync_visuals(&mut self) -> usize {
        match &mut self.model {
            Some(model) => sync_bindings(&self.bindings, model, &mut self.scene, &self.physics),
            None => 0,
        }
    }

    /// Полный tick без bevy (headless прогоны, тесты)
    pub fn tick(&mut self, input: DriveInput) -> SyncResult<()> {
        let result = self.apply_input(input);
        self.step_physics();
        self.sync_visuals();
        result
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn bindings(&self) -> &BindingRegistry {
        &self.bindings
    }

    pub fn model(&self) -> Option<&LaidOutHierarchy> {
        self.model.as_ref()
    }

    pub fn vehicle(&self) -> Option<&Vehicle> {
        self.vehicle.as_ref()
    }

    pub fn phase(&self) -> SetupPhase {
        self.phase
    }

    pub fn moved_yet(&self) -> bool {
        self.moved_yet
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// World center chassis (для камеры / отчёта)
    pub fn chassis_center(&self) -> Option<Vec3> {
        let vehicle = self.vehicle.as_ref()?;
        let node = self.bindings.get(vehicle.chassis()).node;
        Some(self.scene.world_center(node))
    }
}

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleSimSet {
    Input,
    Physics,
    Sync,
}

fn apply_drive_input(mut session: ResMut<Session>, input: Res<DriveInput>) {
    if let Err(err) = session.apply_input(*input) {
        logger::log_error(&format!("❌ Vehicle setup halted: {err}"));
    }
}

fn step_physics(mut session: ResMut<Session>) {
    session.step_physics();
}

fn sync_visuals(mut session: ResMut<Session>) {
    session.sync_visuals();
}

/// Vehicle simulation plugin
///
/// Регистрирует `Session` + `DriveInput` и tick-цепочку в FixedUpdate.
#[derive(Default)]
pub struct VehicleSimPlugin {
    pub settings: SimulationSettings,
}

impl Plugin for VehicleSimPlugin {
    fn build(&self, app: &mut App) {
        let settings = match self.settings.validate() {
            Ok(()) => self.settings.clone(),
            Err(err) => {
                logger::log_error(&format!("❌ {err}, using default settings"));
                SimulationSettings::default()
            }
        };

        app.insert_resource(Time::<Fixed>::from_hz(settings.sim.fixed_hz))
            .insert_resource(Session::new(settings))
            .init_resource::<DriveInput>();

        app.configure_sets(
            FixedUpdate,
            (VehicleSimSet::Input, VehicleSimSet::Physics, VehicleSimSet::Sync).chain(),
        );

        app.add_systems(
            FixedUpdate,
            (
                apply_drive_input.in_set(VehicleSimSet::Input),
                step_physics.in_set(VehicleSimSet::Physics),
                sync_visuals.in_set(VehicleSimSet::Sync),
            ),
        );
    }
}
