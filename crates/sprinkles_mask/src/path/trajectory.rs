use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::FramePath;
use crate::feature::Feature;

/// How the direction feature maps to a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Reflect)]
pub enum DirectionMode {
    /// The feature selects a heading within the direction range.
    #[default]
    Absolute,
    /// The feature turns the current heading by an amount within the range.
    Relative,
}

/// Parameters of the speed/direction integrator. Speeds are in canvas widths per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectorySettings {
    /// Frames per second of the generated path.
    pub frame_rate: f32,
    /// Normalized starting point.
    pub start: Vec2,
    /// Speed at a feature value of zero.
    pub min_speed: f32,
    /// Speed at a feature value of one.
    pub max_speed: f32,
    /// Degrees.
    pub min_direction: f32,
    /// Degrees.
    pub max_direction: f32,
    /// How the direction feature is read.
    pub direction_mode: DirectionMode,
    /// Fraction of the remaining heading change applied per frame.
    pub direction_smoothing: f32,
    /// Fraction of the remaining speed change applied per frame.
    pub speed_smoothing: f32,
}

impl Default for TrajectorySettings {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            start: Vec2::splat(0.5),
            min_speed: 0.0,
            max_speed: 0.5,
            min_direction: -180.0,
            max_direction: 180.0,
            direction_mode: DirectionMode::Absolute,
            direction_smoothing: 0.2,
            speed_smoothing: 0.2,
        }
    }
}

/// Builds a [`FramePath`] by integrating a heading and speed driven by two features.
pub struct Trajectory;

impl Trajectory {
    /// Steps one point per frame, reflecting off the canvas edges.
    pub fn integrate(
        speed: &dyn Feature,
        direction: &dyn Feature,
        settings: &TrajectorySettings,
    ) -> FramePath {
        let frame_count = match (speed.frame_count(), direction.frame_count()) {
            (Some(a), Some(b)) => a.min(b),
            (Some(count), None) | (None, Some(count)) => count,
            (None, None) => 0,
        };
        let dt = 1.0 / settings.frame_rate.max(1.0);
        let speed_range = settings.max_speed - settings.min_speed;
        let direction_range = settings.max_direction - settings.min_direction;

        let mut position = settings.start;
        let mut current_speed = settings.min_speed;
        let mut current_direction = settings.min_direction;
        let mut points = Vec::with_capacity(frame_count);
        let mut angles = Vec::with_capacity(frame_count);

        for frame in 0..frame_count {
            let speed_value = normalized(speed, frame);
            let direction_value = normalized(direction, frame);

            let target_speed = settings.min_speed + speed_value * speed_range;
            let heading = settings.min_direction + direction_value * direction_range;
            let target_direction = match settings.direction_mode {
                DirectionMode::Absolute => heading,
                DirectionMode::Relative => current_direction + heading,
            };

            current_speed = smooth(current_speed, target_speed, settings.speed_smoothing);
            current_direction =
                smooth(current_direction, target_direction, settings.direction_smoothing);

            let step = |degrees: f32| Vec2::from_angle(degrees.to_radians()) * current_speed * dt;
            let mut next = position + step(current_direction);

            if !(0.0..=1.0).contains(&next.x) {
                current_direction = 180.0 - current_direction;
                next.x = position.x + step(current_direction).x;
            }
            if !(0.0..=1.0).contains(&next.y) {
                current_direction = -current_direction;
                next.y = position.y + step(current_direction).y;
            }

            position = next.clamp(Vec2::ZERO, Vec2::ONE);
            points.push(position);
            angles.push(current_direction);
        }

        FramePath::new(points, angles)
    }
}

fn smooth(current: f32, target: f32, factor: f32) -> f32 {
    (1.0 - factor) * current + factor * target
}

fn normalized(feature: &dyn Feature, frame: usize) -> f32 {
    let value = feature.value_at(frame);
    let value = match (feature.min_value(), feature.max_value()) {
        (Some(min), Some(max)) if max > min => (value - min) / (max - min),
        _ => value,
    };
    value.clamp(0.0, 1.0)
}
