use super::helpers::*;

use bevy::prelude::*;
use sprinkles_mask::compute::{ComputeBackend, ComputeSettings};
use sprinkles_mask::pool::{EmitterSettings, ParticlePool, ParticleShape};

fn pool_with_threads(threads: usize, capacity: usize, width: u32, height: u32) -> ParticlePool {
    let settings = ComputeSettings {
        threads: Some(threads),
        ..test_compute_settings()
    };
    let backend = ComputeBackend::new(&settings).expect("backend should build");
    let mut pool = ParticlePool::new(capacity, width, height, backend);
    pool.set_seed(7);
    pool
}

fn crowded_circles() -> EmitterSettings {
    EmitterSettings {
        position: Vec2::new(32.0, 32.0),
        emission_radius: 6.0,
        size: 9.0,
        color: Vec3::new(0.9, 0.35, 0.1),
        ..still_settings(Vec2::new(32.0, 32.0))
    }
}

#[test]
fn bounded_emit_fills_requested_slots() {
    let mut pool = test_pool(10, 100, 100);
    pool.emit(4, &still_settings(Vec2::new(50.0, 50.0)));

    assert_eq!(pool.active_count(), 4);
    assert_eq!(pool.emitted_count(), 4);
}

#[test]
fn bounded_emit_drops_claims_past_capacity() {
    let mut pool = test_pool(4, 100, 100);
    pool.emit(10, &still_settings(Vec2::new(50.0, 50.0)));

    assert_eq!(pool.active_count(), 4);
    assert_eq!(pool.emitted_count(), 10, "dropped claims still advance the cursor");

    pool.emit(3, &still_settings(Vec2::new(50.0, 50.0)));
    assert_eq!(pool.active_count(), 4);
}

#[test]
fn endless_emit_wraps_around_capacity() {
    let mut pool = test_pool(4, 100, 100);
    let settings = EmitterSettings {
        endless: true,
        ..still_settings(Vec2::new(50.0, 50.0))
    };
    pool.emit(6, &settings);

    assert_eq!(pool.active_count(), 4);
    assert_eq!(pool.emitted_count(), 6);
}

#[test]
fn endless_emit_overwrites_oldest_slots() {
    let mut pool = test_pool(4, 100, 100);
    let red = EmitterSettings {
        endless: true,
        color: Vec3::new(1.0, 0.0, 0.0),
        ..still_settings(Vec2::new(50.0, 50.0))
    };
    let blue = EmitterSettings {
        color: Vec3::new(0.0, 0.0, 1.0),
        ..red.clone()
    };

    pool.emit(4, &red);
    pool.emit(2, &blue);

    let color = |index| pool.particle(index).expect("slot should exist").color;
    assert_eq!(color(0), blue.color);
    assert_eq!(color(1), blue.color);
    assert_eq!(color(2), red.color);
    assert_eq!(color(3), red.color);
}

#[test]
fn endless_emit_far_past_capacity_keeps_the_latest_claims() {
    let settings = EmitterSettings {
        endless: true,
        spread: std::f32::consts::TAU,
        speed: 20.0,
        emission_radius: 4.0,
        ..still_settings(Vec2::new(50.0, 50.0))
    };

    let mut at_once = test_pool(10, 100, 100);
    at_once.emit(5_000_000, &settings);

    let mut in_two = test_pool(10, 100, 100);
    in_two.emit(4_999_990, &settings);
    in_two.emit(10, &settings);

    assert_eq!(at_once.emitted_count(), 5_000_000);
    assert_eq!(at_once.active_count(), 10);
    for index in 0..10 {
        assert_eq!(at_once.particle(index), in_two.particle(index), "slot {index}");
    }
}

#[test]
fn bounded_emit_far_past_capacity_fills_every_slot_once() {
    let mut pool = test_pool(10, 100, 100);
    pool.emit(u32::MAX, &still_settings(Vec2::new(50.0, 50.0)));

    assert_eq!(pool.emitted_count(), u32::MAX as u64);
    assert_eq!(pool.active_count(), 10);
}

#[test]
fn zero_count_emit_is_a_no_op() {
    let mut pool = test_pool(4, 100, 100);
    pool.emit(0, &still_settings(Vec2::new(50.0, 50.0)));

    assert_eq!(pool.active_count(), 0);
    assert_eq!(pool.emitted_count(), 0);
}

#[test]
fn update_with_zero_delta_changes_nothing() {
    let mut pool = test_pool(4, 100, 100);
    pool.emit(1, &still_settings(Vec2::new(20.0, 30.0)));
    let before = pool.particle(0);

    pool.update(0.0, Vec2::new(0.0, 150.0));

    assert_eq!(pool.particle(0), before);
}

#[test]
fn particles_expire_when_age_reaches_life() {
    let mut pool = test_pool(4, 100, 100);
    let settings = EmitterSettings {
        particle_life: 1.0,
        ..still_settings(Vec2::new(50.0, 50.0))
    };
    pool.emit(1, &settings);

    for _ in 0..3 {
        pool.update(0.25, Vec2::ZERO);
    }
    assert_eq!(pool.active_count(), 1, "age 0.75 is still alive");

    pool.update(0.25, Vec2::ZERO);
    assert_eq!(pool.active_count(), 0, "age 1.0 has expired");
}

#[test]
fn velocity_integrates_before_position() {
    let mut pool = test_pool(4, 100, 100);
    pool.emit(1, &still_settings(Vec2::new(10.0, 10.0)));

    let gravity = Vec2::new(0.0, 4.0);
    pool.update(1.0, gravity);
    let particle = pool.particle(0).expect("slot should exist");
    assert_vec2_approx(particle.velocity, Vec2::new(0.0, 4.0), "velocity after one step");
    assert_vec2_approx(particle.position, Vec2::new(10.0, 14.0), "position after one step");

    pool.update(1.0, gravity);
    let particle = pool.particle(0).expect("slot should exist");
    assert_vec2_approx(particle.position, Vec2::new(10.0, 22.0), "position after two steps");
}

#[test]
fn particles_spawned_off_canvas_start_inactive() {
    let mut pool = test_pool(4, 100, 100);
    pool.emit(1, &still_settings(Vec2::new(-5.0, 50.0)));

    assert_eq!(pool.emitted_count(), 1);
    assert_eq!(pool.active_count(), 0);
}

#[test]
fn particles_leaving_the_canvas_are_deactivated() {
    let mut pool = test_pool(4, 100, 100);
    pool.emit(1, &still_settings(Vec2::new(99.5, 50.0)));

    pool.update(1.0, Vec2::new(10.0, 0.0));

    assert_eq!(pool.active_count(), 0);
}

#[test]
fn square_covers_a_solid_box() {
    let mut pool = test_pool(4, 10, 10);
    let settings = EmitterSettings {
        shape: ParticleShape::Square,
        size: 2.0,
        ..still_settings(Vec2::new(5.0, 5.0))
    };
    pool.emit(1, &settings);
    pool.rasterize();

    let image = pool.get_image();
    assert_eq!(image.mask().iter().filter(|alpha| **alpha > 0.0).count(), 9);
    for y in 4..=6 {
        for x in 4..=6 {
            assert_eq!(image.pixel(x, y).map(|p| p[3]), Some(1.0), "pixel ({x}, {y})");
        }
    }
    assert_eq!(image.pixel(3, 5).map(|p| p[3]), Some(0.0));
}

#[test]
fn circle_falls_off_linearly_from_the_center() {
    let mut pool = test_pool(4, 10, 10);
    let settings = EmitterSettings {
        shape: ParticleShape::Circle,
        size: 4.0,
        ..still_settings(Vec2::new(5.0, 5.0))
    };
    pool.emit(1, &settings);
    pool.rasterize();

    let image = pool.get_image();
    let alpha = |x, y| image.pixel(x, y).map(|p| p[3]).unwrap_or_default();
    assert_approx(alpha(5, 5), 1.0, "center");
    assert_approx(alpha(6, 5), 0.5, "distance 1");
    assert_approx(alpha(5, 3), 0.0, "distance 2");
    assert_approx(alpha(7, 6), 0.0, "outside radius");
}

#[test]
fn spark_fades_along_its_velocity() {
    let mut pool = test_pool(4, 10, 10);
    let settings = EmitterSettings {
        shape: ParticleShape::Spark,
        speed: 100.0,
        spark_length: 4.0,
        ..still_settings(Vec2::new(2.0, 5.0))
    };
    pool.emit(1, &settings);
    pool.rasterize();

    let image = pool.get_image();
    let alpha = |x| image.pixel(x, 5).map(|p| p[3]).unwrap_or_default();
    assert_approx(alpha(2), 1.0, "head");
    assert_approx(alpha(3), 0.75, "step 1");
    assert_approx(alpha(4), 0.5, "step 2");
    assert_approx(alpha(1), 0.0, "behind the head");
}

#[test]
fn overlapping_particles_accumulate() {
    let mut pool = test_pool(4, 10, 10);
    let settings = EmitterSettings {
        shape: ParticleShape::Square,
        size: 2.0,
        ..still_settings(Vec2::new(5.0, 5.0))
    };
    pool.emit(2, &settings);
    pool.rasterize();

    let image = pool.get_image();
    assert_approx(image.pixel(5, 5).map(|p| p[3]).unwrap_or_default(), 2.0, "raw alpha");
    assert_approx(pool.mask()[5 * 10 + 5], 1.0, "clamped mask");
    assert_eq!(image.rgb()[5 * 10 + 5], Vec3::ONE);
}

#[test]
fn repeated_rasterization_is_bit_identical() {
    let mut pool = pool_with_threads(8, 20_000, 64, 64);
    pool.emit(20_000, &crowded_circles());
    pool.rasterize();
    let first = pool.image_bytes();

    for run in 0..10 {
        pool.clear_image();
        pool.rasterize();
        assert!(pool.image_bytes() == first, "run {run} differs from the first");
    }
}

#[test]
fn rasterization_does_not_depend_on_thread_count() {
    let mut single = pool_with_threads(1, 5_000, 64, 64);
    let mut many = pool_with_threads(8, 5_000, 64, 64);
    single.emit(5_000, &crowded_circles());
    many.emit(5_000, &crowded_circles());

    single.rasterize();
    many.rasterize();

    assert!(single.image_bytes() == many.image_bytes());
}

#[test]
fn rasterize_leaves_particles_untouched() {
    let mut pool = test_pool(4, 100, 100);
    pool.emit(2, &still_settings(Vec2::new(50.0, 50.0)));
    let before: Vec<_> = (0..4).map(|i| pool.particle(i)).collect();

    pool.rasterize();

    let after: Vec<_> = (0..4).map(|i| pool.particle(i)).collect();
    assert_eq!(before, after);
}

#[test]
fn reset_clears_slots_cursor_and_image() {
    let mut pool = test_pool(4, 10, 10);
    pool.emit(3, &still_settings(Vec2::new(5.0, 5.0)));
    pool.rasterize();

    pool.reset();

    assert_eq!(pool.active_count(), 0);
    assert_eq!(pool.emitted_count(), 0);
    assert!(pool.mask().iter().all(|alpha| *alpha == 0.0));
}

#[test]
fn clearing_the_image_twice_is_harmless() {
    let mut pool = test_pool(4, 10, 10);
    pool.emit(1, &still_settings(Vec2::new(5.0, 5.0)));
    pool.rasterize();

    pool.clear_image();
    pool.clear_image();

    assert!(pool.get_image().pixels.iter().all(|p| *p == [0.0; 4]));
    assert_eq!(pool.active_count(), 1, "clearing the image keeps particles");
}

#[test]
fn image_bytes_hold_four_floats_per_pixel() {
    let pool = test_pool(4, 12, 7);
    assert_eq!(pool.image_bytes().len(), 12 * 7 * 16);
}

#[test]
fn same_seed_emits_identical_particles() {
    let settings = EmitterSettings {
        position: Vec2::new(50.0, 50.0),
        spread: std::f32::consts::TAU,
        speed: 50.0,
        emission_radius: 5.0,
        ..default()
    };

    let mut a = test_pool(64, 100, 100);
    let mut b = test_pool(64, 100, 100);
    a.emit(40, &settings);
    b.emit(40, &settings);

    for index in 0..64 {
        assert_eq!(a.particle(index), b.particle(index), "slot {index}");
    }

    let mut c = test_pool(64, 100, 100);
    c.set_seed(43);
    c.emit(40, &settings);
    assert!(
        (0..40).any(|index| a.particle(index) != c.particle(index)),
        "a different seed should change the draws"
    );
}

#[test]
fn spawn_radius_stays_inside_the_disc() {
    let mut pool = test_pool(64, 100, 100);
    let settings = EmitterSettings {
        emission_radius: 5.0,
        ..still_settings(Vec2::new(50.0, 50.0))
    };
    pool.emit(64, &settings);

    for index in 0..64 {
        let particle = pool.particle(index).expect("slot should exist");
        assert!(particle.position.distance(Vec2::new(50.0, 50.0)) <= 5.0 + EPSILON);
    }
}

#[test]
fn negative_spawn_radius_spawns_at_the_emitter() {
    let mut pool = test_pool(8, 100, 100);
    let settings = EmitterSettings {
        emission_radius: -5.0,
        ..still_settings(Vec2::new(50.0, 50.0))
    };
    pool.emit(8, &settings);

    for index in 0..8 {
        let particle = pool.particle(index).expect("slot should exist");
        assert_eq!(particle.position, Vec2::new(50.0, 50.0));
    }
}

#[test]
fn capacity_is_at_least_one() {
    let pool = test_pool(0, 10, 10);
    assert_eq!(pool.capacity(), 1);
    assert!(pool.particle(1).is_none());
}
