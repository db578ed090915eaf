//! Emitter paths: arclength-parameterized polylines and precomputed per-frame paths.

mod shape;
mod trajectory;

pub use shape::{PathShape, ShapeTransform};
pub use trajectory::{DirectionMode, Trajectory, TrajectorySettings};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::asset::serde_helpers::is_false;

/// How path progress behaves when it runs past either end of the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Reflect)]
pub enum LoopMode {
    /// Wraps around to the start.
    #[default]
    Loop,
    /// Stops at the nearest end.
    Clamp,
    /// Reflects back and travels the other way.
    PingPong,
}

/// A path an emitter can be bound to, in normalized `[0, 1]` canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParticlePath {
    /// Polyline sampled by progress along its length.
    Points {
        /// Vertices in order of travel.
        points: Vec<Vec2>,
        /// Whether the last vertex joins back to the first.
        #[serde(default, skip_serializing_if = "is_false")]
        closed: bool,
    },
    /// One point per frame, looped by frame index.
    Frames(FramePath),
}

impl ParticlePath {
    /// Polyline path through `points`. A closed path with more than two points gets
    /// its first point appended.
    pub fn from_points(mut points: Vec<Vec2>, closed: bool) -> Self {
        if closed && points.len() > 2 {
            points.push(points[0]);
        }
        Self::Points { points, closed }
    }

    /// Polyline path traced from a parametric shape.
    pub fn from_shape(shape: &PathShape, transform: &ShapeTransform, closed: bool) -> Self {
        Self::from_points(shape.points(transform), closed)
    }

    /// Normalized points of the path, whichever representation it uses.
    pub fn points(&self) -> &[Vec2] {
        match self {
            Self::Points { points, .. } => points,
            Self::Frames(frames) => &frames.points,
        }
    }
}

impl From<FramePath> for ParticlePath {
    fn from(frames: FramePath) -> Self {
        Self::Frames(frames)
    }
}

/// Position and tangent angle at a point on a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    /// Position in pixels.
    pub position: Vec2,
    /// Tangent angle in degrees.
    pub angle: f32,
}

/// Per-frame positions and optional heading angles (degrees).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FramePath {
    /// Normalized position for each frame.
    pub points: Vec<Vec2>,
    /// Heading for each frame. May be empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub angles: Vec<f32>,
}

impl FramePath {
    /// Frame path from parallel point and angle lists.
    pub fn new(points: Vec<Vec2>, angles: Vec<f32>) -> Self {
        Self { points, angles }
    }

    /// Number of frames before the path repeats.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` when the path has no frames.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point for `frame`, indexed modulo the path length. The angle is `None` when
    /// the path carries no angles.
    pub fn at(&self, frame: usize) -> Option<(Vec2, Option<f32>)> {
        if self.points.is_empty() {
            return None;
        }
        let index = frame % self.points.len();
        Some((self.points[index], self.angles.get(index).copied()))
    }
}

/// A polyline converted to pixel space with precomputed segment lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPath {
    points: Vec<Vec2>,
    segment_lengths: Vec<f32>,
    total_length: f32,
}

impl PreparedPath {
    /// Scales normalized `points` to a `width`×`height` canvas.
    ///
    /// Returns `None` for fewer than two points.
    pub fn prepare(points: &[Vec2], width: u32, height: u32) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let scale = Vec2::new(width as f32, height as f32);
        let points: Vec<Vec2> = points.iter().map(|point| *point * scale).collect();
        let segment_lengths: Vec<f32> = points
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .collect();
        let total_length = segment_lengths.iter().sum();

        Some(Self {
            points,
            segment_lengths,
            total_length,
        })
    }

    /// Vertices in pixels.
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Sum of the segment lengths in pixels.
    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    /// Position and tangent at `progress` (clamped to `[0, 1]`) along the path length.
    ///
    /// Returns `None` for a zero-length path.
    pub fn sample(&self, progress: f32) -> Option<PathSample> {
        if self.total_length <= 0.0 {
            return None;
        }
        let target = progress.clamp(0.0, 1.0) * self.total_length;

        let mut travelled = 0.0;
        for (index, length) in self.segment_lengths.iter().enumerate() {
            if travelled + length >= target {
                let start = self.points[index];
                let end = self.points[index + 1];
                let t = (target - travelled) / length.max(1e-6);
                let delta = end - start;
                return Some(PathSample {
                    position: start + delta * t,
                    angle: delta.y.atan2(delta.x).to_degrees(),
                });
            }
            travelled += length;
        }

        let last = self.points.last()?;
        Some(PathSample {
            position: *last,
            angle: 0.0,
        })
    }
}

/// Progress along a path plus the travel direction used by [`LoopMode::PingPong`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathProgress {
    /// Position along the path in `[0, 1]`.
    pub progress: f32,
    /// `1.0` forwards, `-1.0` backwards.
    pub direction: f32,
}

impl Default for PathProgress {
    fn default() -> Self {
        Self {
            progress: 0.0,
            direction: 1.0,
        }
    }
}

impl PathProgress {
    /// Moves by `delta` under `mode` and returns the new progress.
    pub fn advance(&mut self, delta: f32, mode: LoopMode) -> f32 {
        match mode {
            LoopMode::Loop => {
                self.progress = (self.progress + delta).rem_euclid(1.0);
            }
            LoopMode::Clamp => {
                self.progress = (self.progress + delta).clamp(0.0, 1.0);
            }
            LoopMode::PingPong => {
                self.progress += delta * self.direction;
                if self.progress > 1.0 {
                    self.progress = 2.0 - self.progress;
                    self.direction = -1.0;
                } else if self.progress < 0.0 {
                    self.progress = -self.progress;
                    self.direction = 1.0;
                }
            }
        }
        self.progress
    }

    /// Back to the start, moving forwards.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
