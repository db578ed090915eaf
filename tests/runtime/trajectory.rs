use super::helpers::*;

use bevy::prelude::*;
use sprinkles_mask::feature::FeatureCurve;
use sprinkles_mask::path::{DirectionMode, Trajectory, TrajectorySettings};

fn instant_settings(start: Vec2, max_speed: f32) -> TrajectorySettings {
    TrajectorySettings {
        frame_rate: 30.0,
        start,
        min_speed: 0.0,
        max_speed,
        min_direction: -180.0,
        max_direction: 180.0,
        direction_mode: DirectionMode::Absolute,
        direction_smoothing: 1.0,
        speed_smoothing: 1.0,
    }
}

#[test]
fn path_length_follows_the_shorter_feature() {
    let speed = FeatureCurve::new(vec![0.5; 10]);
    let direction = FeatureCurve::new(vec![0.5; 5]);

    let path = Trajectory::integrate(&speed, &direction, &TrajectorySettings::default());

    assert_eq!(path.len(), 5);
    assert_eq!(path.angles.len(), 5);
}

#[test]
fn points_stay_on_the_canvas() {
    let speed = FeatureCurve::new(vec![1.0; 120]);
    let direction = FeatureCurve::new(
        (0..120)
            .map(|i| (i as f32 * 0.37).sin() * 0.5 + 0.5)
            .collect::<Vec<_>>(),
    );

    let path = Trajectory::integrate(&speed, &direction, &instant_settings(Vec2::splat(0.5), 4.0));

    assert_eq!(path.len(), 120);
    for point in &path.points {
        assert!(
            (0.0..=1.0).contains(&point.x) && (0.0..=1.0).contains(&point.y),
            "{point:?} left the canvas"
        );
    }
}

#[test]
fn heading_reflects_off_the_right_edge() {
    let speed = FeatureCurve::new(vec![1.0]);
    let direction = FeatureCurve::new(vec![0.5]);

    let path = Trajectory::integrate(
        &speed,
        &direction,
        &instant_settings(Vec2::new(0.99, 0.5), 3.0),
    );

    let (position, angle) = path.at(0).expect("one frame");
    assert_approx(position.x, 0.89, "reflected x");
    assert_approx(position.y, 0.5, "y unchanged");
    assert_approx(angle.expect("angles are recorded"), 180.0, "reflected heading");
}

#[test]
fn ranged_features_are_normalized() {
    let speed = FeatureCurve::new(vec![10.0]).with_range(0.0, 20.0);
    let direction = FeatureCurve::new(vec![0.5]);
    let settings = instant_settings(Vec2::new(0.2, 0.5), 3.0);

    let path = Trajectory::integrate(&speed, &direction, &settings);

    let (position, _) = path.at(0).expect("one frame");
    assert_approx(position.x, 0.25, "half of max speed for one frame");
}

#[test]
fn empty_features_give_an_empty_path() {
    let empty = FeatureCurve::default();
    let path = Trajectory::integrate(&empty, &empty, &TrajectorySettings::default());
    assert!(path.is_empty());
}
