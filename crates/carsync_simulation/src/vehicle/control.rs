//! Управление: нажатые клавиши → throttle/steer
//!
//! W/S — газ вперёд/назад, A/D — руль влево/вправо.
//! Противоположные клавиши гасят друг друга.

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveKey {
    /// W
    Forward,
    /// S
    Backward,
    /// A
    Left,
    /// D
    Right,
}

impl DriveKey {
    /// Код клавиши в стиле DOM (`KeyW`) или просто буква
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim_start_matches("Key").to_ascii_uppercase().as_str() {
            "W" => Some(DriveKey::Forward),
            "S" => Some(DriveKey::Backward),
            "A" => Some(DriveKey::Left),
            "D" => Some(DriveKey::Right),
            _ => None,
        }
    }
}

/// Текущий ввод водителя (пишет input layer, читает tick)
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveInput {
    pub throttle: f32,
    pub steer: f32,
}

impl DriveInput {
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a DriveKey>) -> Self {
        let mut input = Self::default();
        for key in keys {
            match key {
                DriveKey::Forward => input.throttle += 1.0,
                DriveKey::Backward => input.throttle -= 1.0,
                DriveKey::Left => input.steer += 1.0,
                DriveKey::Right => input.steer -= 1.0,
            }
        }
        input
    }

    pub fn is_idle(&self) -> bool {
        self.throttle == 0.0 && self.steer == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_map_to_throttle_and_steer() {
        let input = DriveInput::from_keys(&[DriveKey::Forward, DriveKey::Left]);
        assert_eq!(input, DriveInput { throttle: 1.0, steer: 1.0 });

        let input = DriveInput::from_keys(&[DriveKey::Backward, DriveKey::Right]);
        assert_eq!(input, DriveInput { throttle: -1.0, steer: -1.0 });
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let input = DriveInput::from_keys(&[DriveKey::Forward, DriveKey::Backward, DriveKey::Left, DriveKey::Right]);
        assert!(input.is_idle());
    }

    #[test]
    fn test_key_codes() {
        assert_eq!(DriveKey::from_code("KeyW"), Some(DriveKey::Forward));
        assert_eq!(DriveKey::from_code("d"), Some(DriveKey::Right));
        assert_eq!(DriveKey::from_code("KeyQ"), None);
    }
}
