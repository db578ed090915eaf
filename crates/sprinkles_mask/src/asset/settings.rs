use std::ops::Range;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::serde_helpers::*;

/// Global simulation parameters shared by every emitter of a mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Reflect)]
pub struct SimulationSettings {
    /// Capacity of the particle pool. Defaults to `10000`.
    #[serde(default = "default_particle_count")]
    pub particle_count: usize,
    /// Lifetime in seconds for emitters that do not override it. Defaults to `3.0`.
    #[serde(default = "default_particle_lifetime")]
    pub particle_lifetime: f32,
    /// Strength of the wind acceleration, in pixels per second squared.
    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub wind_strength: f32,
    /// Direction the wind blows towards, in degrees.
    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub wind_direction: f32,
    /// Downward acceleration in pixels per second squared. Defaults to `150.0`.
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    /// Frames per second of the output sequence. Values below `1` are treated as `1`.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    /// First frame that may emit particles.
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub start_frame: u32,
    /// Frame at which emission stops. `0` runs until the end of the sequence.
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub end_frame: u32,
    /// Optional fixed random seed. When set, repeated runs produce identical frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_seed: Option<u32>,
}

fn default_particle_count() -> usize {
    10_000
}

fn default_particle_lifetime() -> f32 {
    3.0
}

fn default_gravity() -> f32 {
    150.0
}

fn default_frame_rate() -> f32 {
    30.0
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            particle_count: default_particle_count(),
            particle_lifetime: default_particle_lifetime(),
            wind_strength: 0.0,
            wind_direction: 0.0,
            gravity: default_gravity(),
            frame_rate: default_frame_rate(),
            start_frame: 0,
            end_frame: 0,
            fixed_seed: None,
        }
    }
}

impl SimulationSettings {
    /// Seconds per frame.
    pub fn delta_time(&self) -> f32 {
        1.0 / self.frame_rate.max(1.0)
    }

    /// Constant acceleration from gravity and wind, in pixels per second squared.
    pub fn gravity_vector(&self) -> Vec2 {
        let (sin, cos) = self.wind_direction.to_radians().sin_cos();
        Vec2::new(
            self.wind_strength * cos,
            self.gravity + self.wind_strength * sin,
        )
    }

    /// Frames of a `frame_count` long sequence in which emission is allowed.
    pub fn frame_window(&self, frame_count: u32) -> Range<u32> {
        let end = if self.end_frame > 0 {
            self.end_frame
        } else {
            frame_count
        };
        self.start_frame..end
    }
}
