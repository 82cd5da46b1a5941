//! Directional wave trains and their superposition.
//!
//! Each train is a vertical sinusoid travelling along a unit direction in the
//! surface plane. Amplitude is derived from steepness so short waves stay
//! proportionally small.

use std::f32::consts::TAU;

use glam::Vec2;
use thiserror::Error;

/// Number of trains in the river field
pub const WAVE_TRAIN_COUNT: usize = 8;

/// Configured wave train, before normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveTrainSpec {
    /// Propagation direction (any length except zero)
    pub direction: Vec2,

    /// Amplitude × wavenumber
    pub steepness: f32,

    /// Crest-to-crest distance (meters)
    pub wavelength_m: f32,

    /// Phase speed (meters/second)
    pub speed_mps: f32,
}

impl WaveTrainSpec {
    pub const fn new(dx: f32, dy: f32, steepness: f32, wavelength_m: f32, speed_mps: f32) -> Self {
        Self {
            direction: Vec2::new(dx, dy),
            steepness,
            wavelength_m,
            speed_mps,
        }
    }
}

/// River configuration: a long downstream current, cross-current chop, then
/// fine ripples
pub const RIVER_WAVES: [WaveTrainSpec; WAVE_TRAIN_COUNT] = [
    // Dominant current
    WaveTrainSpec::new(0.0, 1.0, 0.028, 60.0, 0.65),
    WaveTrainSpec::new(0.05, 1.0, 0.020, 38.0, 0.50),
    WaveTrainSpec::new(-0.08, 1.0, 0.014, 24.0, 0.80),
    // Cross chop
    WaveTrainSpec::new(1.0, 0.25, 0.009, 14.0, 1.2),
    WaveTrainSpec::new(-0.8, 0.4, 0.006, 9.0, 1.5),
    // Ripples
    WaveTrainSpec::new(0.5, 0.85, 0.004, 5.0, 2.0),
    WaveTrainSpec::new(-0.3, 1.0, 0.003, 3.0, 2.5),
    WaveTrainSpec::new(0.7, -0.2, 0.002, 2.0, 3.0),
];

#[derive(Debug, Error, PartialEq)]
pub enum WaveConfigError {
    #[error("wave train {index}: direction has zero length")]
    DegenerateDirection { index: usize },

    #[error("wave train {index}: {field} must be positive and finite, got {value}")]
    NonPositive {
        index: usize,
        field: &'static str,
        value: f32,
    },
}

/// Normalized wave train ready for evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveTrain {
    /// Unit propagation direction
    pub direction: Vec2,

    /// 2π / wavelength (rad/meter)
    pub wavenumber: f32,

    /// Phase speed (meters/second)
    pub speed: f32,

    /// Steepness / wavenumber (meters)
    pub amplitude: f32,
}

impl WaveTrain {
    pub fn from_spec(index: usize, spec: &WaveTrainSpec) -> Result<Self, WaveConfigError> {
        for (field, value) in [
            ("steepness", spec.steepness),
            ("wavelength", spec.wavelength_m),
            ("speed", spec.speed_mps),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(WaveConfigError::NonPositive { index, field, value });
            }
        }
        let direction = spec
            .direction
            .try_normalize()
            .ok_or(WaveConfigError::DegenerateDirection { index })?;

        Ok(Self::derive(direction, spec))
    }

    fn derive(direction: Vec2, spec: &WaveTrainSpec) -> Self {
        let wavenumber = TAU / spec.wavelength_m;
        Self {
            direction,
            wavenumber,
            speed: spec.speed_mps,
            amplitude: spec.steepness / wavenumber,
        }
    }

    /// Temporal frequency k·c (rad/second)
    pub fn angular_frequency(&self) -> f32 {
        self.wavenumber * self.speed
    }

    pub fn height(&self, position: Vec2, t: f32) -> f32 {
        let phase = self.wavenumber * self.direction.dot(position) - self.angular_frequency() * t;
        self.amplitude * phase.sin()
    }
}

/// Fixed superposition of wave trains
#[derive(Debug, Clone, PartialEq)]
pub struct WaveField {
    trains: [WaveTrain; WAVE_TRAIN_COUNT],
}

impl WaveField {
    pub fn new(specs: &[WaveTrainSpec; WAVE_TRAIN_COUNT]) -> Result<Self, WaveConfigError> {
        let mut trains = [WaveTrain {
            direction: Vec2::Y,
            wavenumber: 1.0,
            speed: 1.0,
            amplitude: 0.0,
        }; WAVE_TRAIN_COUNT];
        for (index, (slot, spec)) in trains.iter_mut().zip(specs).enumerate() {
            *slot = WaveTrain::from_spec(index, spec)?;
        }
        Ok(Self { trains })
    }

    /// Field built from [`RIVER_WAVES`]
    pub fn river() -> Self {
        Self::new(&RIVER_WAVES).expect("RIVER_WAVES entries are valid")
    }

    pub fn trains(&self) -> &[WaveTrain; WAVE_TRAIN_COUNT] {
        &self.trains
    }

    /// Summed height of every train at (x, y) and scaled time `t`
    pub fn height(&self, x: f32, y: f32, t: f32) -> f32 {
        let position = Vec2::new(x, y);
        self.trains.iter().map(|w| w.height(position, t)).sum()
    }
}

impl Default for WaveField {
    fn default() -> Self {
        Self::river()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_river_trains_are_valid() {
        let field = WaveField::river();
        assert_eq!(WaveField::new(&RIVER_WAVES).unwrap(), field);
        for (index, (train, spec)) in field.trains().iter().zip(&RIVER_WAVES).enumerate() {
            assert_eq!(*train, WaveTrain::from_spec(index, spec).unwrap());
            assert!((train.direction.length() - 1.0).abs() < 1e-6);
            assert!(train.amplitude > 0.0);
            assert!(train.wavenumber > 0.0);
            assert!(train.speed > 0.0);
        }
    }

    #[test]
    fn test_amplitude_from_steepness() {
        let train = WaveTrain::from_spec(0, &RIVER_WAVES[0]).unwrap();
        // 0.028 / (2π / 60)
        assert!((train.amplitude - 0.028 * 60.0 / TAU).abs() < 1e-6);
        assert!((train.angular_frequency() - TAU / 60.0 * 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_flat_at_origin() {
        assert_eq!(WaveField::river().height(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_deterministic() {
        let field = WaveField::river();
        let a = field.height(12.3, -45.6, 7.89);
        let b = field.height(12.3, -45.6, 7.89);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_sum_is_order_independent() {
        let forward = WaveField::river();
        let mut reversed_specs = RIVER_WAVES;
        reversed_specs.reverse();
        let reversed = WaveField::new(&reversed_specs).unwrap();
        let mut rotated_specs = RIVER_WAVES;
        rotated_specs.rotate_left(3);
        let rotated = WaveField::new(&rotated_specs).unwrap();

        for &(x, y, t) in &[(3.0, 7.0, 0.5), (-30.0, 120.0, 12.0), (15.5, -80.0, 99.0)] {
            let h = forward.height(x, y, t);
            assert!((h - reversed.height(x, y, t)).abs() < 1e-5);
            assert!((h - rotated.height(x, y, t)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rejects_invalid_trains() {
        let mut specs = RIVER_WAVES;
        specs[2].direction = Vec2::ZERO;
        assert_eq!(
            WaveField::new(&specs),
            Err(WaveConfigError::DegenerateDirection { index: 2 })
        );

        let mut specs = RIVER_WAVES;
        specs[5].wavelength_m = 0.0;
        assert!(matches!(
            WaveField::new(&specs),
            Err(WaveConfigError::NonPositive { index: 5, field: "wavelength", .. })
        ));
    }
}
