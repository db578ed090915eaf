use std::f32::consts::TAU;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Placement of a generated shape in normalized canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeTransform {
    /// Where the shape's origin lands.
    #[serde(default = "default_center")]
    pub center: Vec2,
    /// Bounding size of the shape.
    #[serde(default = "default_size")]
    pub size: Vec2,
    /// Rotation in degrees, applied before the center offset.
    #[serde(default)]
    pub rotation: f32,
}

fn default_center() -> Vec2 {
    Vec2::splat(0.5)
}

fn default_size() -> Vec2 {
    Vec2::splat(0.6)
}

impl Default for ShapeTransform {
    fn default() -> Self {
        Self {
            center: default_center(),
            size: default_size(),
            rotation: 0.0,
        }
    }
}

impl ShapeTransform {
    /// Rotates `local` about the origin and moves it to the center.
    pub fn apply(&self, local: Vec2) -> Vec2 {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        self.center + Vec2::new(local.x * cos - local.y * sin, local.x * sin + local.y * cos)
    }
}

/// Parametric shapes that generate path points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathShape {
    /// Diagonal across the bounding box.
    Line,
    /// Full circle with a diameter of the bounding width.
    Circle {
        /// Number of chords.
        segments: u32,
    },
    /// Angles in degrees.
    Arc {
        /// Angle of the first point.
        start_angle: f32,
        /// Angle of the last point.
        end_angle: f32,
        /// Number of chords.
        segments: u32,
    },
    /// Regular polygon, closed, with optionally smoothed corners.
    Polygon {
        /// Number of sides, at least 3.
        sides: u32,
        /// Corner smoothing amount. `0` keeps sharp corners.
        corner_radius: f32,
        /// Kept for authoring; corner smoothing does not read it.
        segments: u32,
    },
    /// Same outline as [`PathShape::Polygon`], meant to be used with a corner radius.
    RoundedRect {
        /// Number of sides, at least 3.
        sides: u32,
        /// Corner smoothing amount.
        corner_radius: f32,
        /// Kept for authoring; corner smoothing does not read it.
        segments: u32,
    },
    /// Explicit points, used as given.
    Polyline(Vec<Vec2>),
}

impl PathShape {
    /// Generates the shape's points placed by `transform`.
    pub fn points(&self, transform: &ShapeTransform) -> Vec<Vec2> {
        let half = transform.size * 0.5;
        match self {
            Self::Line => vec![transform.apply(-half), transform.apply(half)],
            Self::Circle { segments } => arc_points(transform, half.x, 0.0, TAU, *segments),
            Self::Arc {
                start_angle,
                end_angle,
                segments,
            } => arc_points(
                transform,
                half.x,
                start_angle.to_radians(),
                end_angle.to_radians(),
                *segments,
            ),
            Self::Polygon {
                sides,
                corner_radius,
                ..
            }
            | Self::RoundedRect {
                sides,
                corner_radius,
                ..
            } => polygon_points(transform, *sides, *corner_radius),
            Self::Polyline(points) => points.clone(),
        }
    }
}

fn arc_points(transform: &ShapeTransform, radius: f32, start: f32, end: f32, segments: u32) -> Vec<Vec2> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            let t = start + (end - start) * (i as f32 / segments as f32);
            transform.apply(Vec2::new(t.cos(), t.sin()) * radius)
        })
        .collect()
}

fn polygon_points(transform: &ShapeTransform, sides: u32, corner_radius: f32) -> Vec<Vec2> {
    let sides = sides.max(3);
    let corner_radius = corner_radius.max(0.0);
    let half = transform.size * 0.5;

    let mut points: Vec<Vec2> = (0..sides)
        .map(|i| {
            let angle = TAU * i as f32 / sides as f32;
            transform.apply(Vec2::new(angle.cos(), angle.sin()) * half)
        })
        .collect();

    if corner_radius > 0.0 {
        let radius = if corner_radius <= 1.0 {
            corner_radius * transform.size.min_element() * 0.5
        } else {
            corner_radius
        };
        let iterations = ((radius * 10.0) as i32).clamp(1, 6);
        for _ in 0..iterations {
            points = chaikin(&points);
        }
    }

    points.push(points[0]);
    points
}

/// One corner-cutting pass over a closed polygon.
fn chaikin(points: &[Vec2]) -> Vec<Vec2> {
    let count = points.len();
    let mut smoothed = Vec::with_capacity(count * 2);
    for (i, p0) in points.iter().enumerate() {
        let p1 = points[(i + 1) % count];
        smoothed.push(*p0 * 0.75 + p1 * 0.25);
        smoothed.push(*p0 * 0.25 + p1 * 0.75);
    }
    smoothed
}
