use super::helpers::*;

use bevy::prelude::*;
use sprinkles_mask::asset::ParticleMaskAsset;
use sprinkles_mask::runtime::{ParticleMask, ParticleMaskRuntime};

fn mask(frame_count: u32) -> ParticleMask {
    ParticleMask {
        handle: Handle::default(),
        width: 32,
        height: 32,
        frame_count,
    }
}

fn runtime(asset: &ParticleMaskAsset, frame_count: u32) -> ParticleMaskRuntime {
    let pool = test_pool(asset.settings.particle_count, 32, 32);
    ParticleMaskRuntime::new(asset, &mask(frame_count), pool)
}

fn asset() -> ParticleMaskAsset {
    create_test_asset(quiet_settings(10.0), vec![still_emitter(10.0)])
}

#[test]
fn new_runtime_uses_the_fixed_seed() {
    let asset = asset();
    let runtime = runtime(&asset, 4);

    assert_eq!(runtime.seed, 7);
    assert_eq!(runtime.pool.seed(), 7);
    assert_eq!(runtime.frame, 0);
    assert!(!runtime.paused);
    assert!(!runtime.finished);
}

#[test]
fn step_advances_until_finished() {
    let asset = asset();
    let mut runtime = runtime(&asset, 2);

    assert!(runtime.step(&asset).is_some());
    assert!(!runtime.finished);
    assert!(runtime.step(&asset).is_some());
    assert!(runtime.finished);
    assert!(runtime.step(&asset).is_none());
    assert_eq!(runtime.frame, 2);
}

#[test]
fn paused_runtime_does_not_step() {
    let asset = asset();
    let mut runtime = runtime(&asset, 4);

    runtime.pause();
    assert!(runtime.step(&asset).is_none());
    assert_eq!(runtime.frame, 0);

    runtime.toggle();
    assert!(!runtime.paused);
    assert!(runtime.step(&asset).is_some());

    runtime.toggle();
    runtime.resume();
    assert!(runtime.step(&asset).is_some());
    assert_eq!(runtime.frame, 2);
}

#[test]
fn restart_rewinds_to_the_first_frame() {
    let asset = asset();
    let mut runtime = runtime(&asset, 3);
    let first = runtime.step(&asset).expect("first frame");
    runtime.step(&asset);
    runtime.step(&asset);
    assert!(runtime.finished);

    runtime.restart(Some(7));

    assert_eq!(runtime.frame, 0);
    assert!(!runtime.finished);
    assert_eq!(runtime.pool.active_count(), 0);
    assert_eq!(runtime.step(&asset), Some(first));
}

#[test]
fn zero_frame_mask_starts_finished() {
    let asset = asset();
    let mut runtime = runtime(&asset, 0);

    assert!(runtime.finished);
    assert!(runtime.step(&asset).is_none());
}
