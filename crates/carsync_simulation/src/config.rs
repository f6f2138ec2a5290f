//! Настройки симуляции и машины
//!
//! Всё с `#[serde(default)]`: пустой TOML = дефолтный джип.
//!
//! ```toml
//! [sim]
//! fixed_hz = 60.0
//! spawn_offset = [0.0, 5.0, 0.0]
//!
//! [vehicle]
//! drive_force_scale = 100.0
//! ```

use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::math::Axis;

/// Физический мир + размещение модели
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Гравитация (m/s²)
    pub gravity: [f32; 3],
    /// Частота fixed tick (Hz)
    pub fixed_hz: f64,
    /// Трение земли (static half-space y = 0)
    pub ground_friction: f32,
    /// Сдвиг корня модели после shift pass (до сборки машины)
    pub spawn_offset: [f32; 3],
    /// Seed для uuid безымянных нод
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.82, 0.0],
            fixed_hz: 60.0,
            ground_friction: 0.3,
            spawn_offset: [0.0, 5.0, 0.0],
            seed: 42,
        }
    }
}

impl SimConfig {
    pub fn gravity(&self) -> Vec3 {
        Vec3::from_array(self.gravity)
    }

    pub fn spawn_offset(&self) -> Vec3 {
        Vec3::from_array(self.spawn_offset)
    }

    pub fn timestep(&self) -> f32 {
        (1.0 / self.fixed_hz) as f32
    }
}

/// Параметры сборки машины (chassis + 4 колеса)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Имя chassis в ассете
    pub chassis_name: String,
    /// Имена колёс: FL, FR, BL, BR (порядок = индексы колёс)
    pub wheel_names: [String; 4],

    pub chassis_mass: f32,
    /// Тяжелее chassis — стабильнее подвеска
    pub wheel_mass: f32,
    /// Колёса не должны крутиться вечно от остаточного torque
    pub wheel_angular_damping: f32,
    pub wheel_friction: f32,

    /// throttle 1.0 → сила 100
    pub drive_force_scale: f32,
    /// steer 1.0 → π/8 рад
    pub steer_scale: f32,

    /// Ось вращения колеса (в системе chassis)
    pub wheel_axis: [f32; 3],
    /// Направление подвески ("вниз")
    pub suspension_direction: [f32; 3],
    /// По какой оси bounding box'а колеса брать диаметр
    pub wheel_radius_axis: Axis,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            chassis_name: "Chassis".into(),
            wheel_names: [
                "WheelFL".into(),
                "WheelFR".into(),
                "WheelBL".into(),
                "WheelBR".into(),
            ],
            chassis_mass: 1.0,
            wheel_mass: 10.0,
            wheel_angular_damping: 0.4,
            wheel_friction: 0.3,
            drive_force_scale: 100.0,
            steer_scale: std::f32::consts::PI / 8.0,
            wheel_axis: [1.0, 0.0, 0.0],
            suspension_direction: [0.0, -1.0, 0.0],
            wheel_radius_axis: Axis::Z,
        }
    }
}

impl VehicleConfig {
    pub fn wheel_axis(&self) -> Vec3 {
        Vec3::from_array(self.wheel_axis).normalize_or(Vec3::X)
    }

    pub fn suspension_direction(&self) -> Vec3 {
        Vec3::from_array(self.suspension_direction).normalize_or(Vec3::NEG_Y)
    }
}

/// Полный файл настроек: `[sim]` + `[vehicle]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub sim: SimConfig,
    pub vehicle: VehicleConfig,
}

impl SimulationSettings {
    pub fn from_toml_str(source: &str) -> SyncResult<Self> {
        let settings: Self = toml::from_str(source).map_err(|e| SyncError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Значения, на которых fixed timestep или rapier ломаются
    pub fn validate(&self) -> SyncResult<()> {
        if !(self.sim.fixed_hz.is_finite() && self.sim.fixed_hz > 0.0) {
            return Err(SyncError::Config(format!(
                "sim.fixed_hz must be positive, got {}",
                self.sim.fixed_hz
            )));
        }
        if !self.sim.gravity.iter().all(|g| g.is_finite()) {
            return Err(SyncError::Config(format!(
                "sim.gravity must be finite, got {:?}",
                self.sim.gravity
            )));
        }

        let masses = [
            ("vehicle.chassis_mass", self.vehicle.chassis_mass),
            ("vehicle.wheel_mass", self.vehicle.wheel_mass),
        ];
        for (field, mass) in masses {
            if !(mass.is_finite() && mass >= 0.0) {
                return Err(SyncError::Config(format!("{field} must be non-negative, got {mass}")));
            }
        }
        Ok(())
    }
}
