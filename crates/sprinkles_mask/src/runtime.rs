use bevy::prelude::*;

use crate::asset::ParticleMaskAsset;
use crate::modulation::BurstDetector;
use crate::path::PathProgress;
use crate::pool::ParticlePool;
use crate::simulation::{ParticleFrame, ParticleMaskSimulation};

/// Renders a [`ParticleMaskAsset`] into a `width`×`height` mask sequence, one frame
/// per app update.
#[derive(Component)]
pub struct ParticleMask {
    /// The particle mask asset to simulate.
    pub handle: Handle<ParticleMaskAsset>,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Frames to produce before the mask finishes.
    pub frame_count: u32,
}

/// Latest output of a [`ParticleMask`].
#[derive(Component, Debug, Clone)]
pub struct ParticleMaskFrame {
    /// Zero-based frame number.
    pub index: u32,
    /// Clamped image and mask.
    pub frame: ParticleFrame,
}

/// Per-emitter state carried from one frame to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterRuntime {
    /// Position of the emitter in the asset's emitter list.
    pub emitter_index: usize,
    /// Fractional particles not yet emitted.
    pub accumulator: f32,
    /// Onset detection state shared by audio and path bursts.
    pub burst: BurstDetector,
    /// Progress along a point path.
    pub path_progress: PathProgress,
}

impl EmitterRuntime {
    /// Fresh state for emitter `emitter_index`.
    pub fn new(emitter_index: usize) -> Self {
        Self {
            emitter_index,
            accumulator: 0.0,
            burst: BurstDetector::default(),
            path_progress: PathProgress::default(),
        }
    }

    /// Adds `rate * dt` particles and returns the whole ones, keeping the remainder.
    pub fn accumulate(&mut self, rate: f32, dt: f32) -> u32 {
        self.accumulator += rate.max(0.0) * dt;
        let whole = self.accumulator.floor();
        self.accumulator -= whole;
        whole as u32
    }

    /// Returns to the state of a fresh run.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.burst.reset();
        self.path_progress.reset();
    }
}

/// Simulation state and particle storage of a spawned [`ParticleMask`].
#[derive(Component)]
pub struct ParticleMaskRuntime {
    /// Per-emitter state.
    pub simulation: ParticleMaskSimulation,
    /// Particle storage owned by this mask.
    pub pool: ParticlePool,
    /// Next frame to simulate.
    pub frame: u32,
    /// Paused runtimes skip their updates.
    pub paused: bool,
    /// Set once the last frame has been produced.
    pub finished: bool,
    /// Seed of the current run.
    pub seed: u32,
}

impl ParticleMaskRuntime {
    /// Starts a run of `asset` on `pool`, seeded from the asset's fixed seed or the clock.
    pub fn new(asset: &ParticleMaskAsset, mask: &ParticleMask, mut pool: ParticlePool) -> Self {
        let seed = asset.settings.fixed_seed.unwrap_or_else(rand_seed);
        pool.reset();
        pool.set_seed(seed);

        Self {
            simulation: ParticleMaskSimulation::new(
                &asset.emitters,
                mask.width,
                mask.height,
                mask.frame_count,
            ),
            pool,
            frame: 0,
            paused: false,
            finished: mask.frame_count == 0,
            seed,
        }
    }

    /// Holds the current frame.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Continues after [`pause`](Self::pause).
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Flips between paused and running.
    pub fn toggle(&mut self) {
        self.paused = !self.paused;
    }

    /// Rewinds to frame zero with an empty pool.
    pub fn restart(&mut self, fixed_seed: Option<u32>) {
        self.seed = fixed_seed.unwrap_or_else(rand_seed);
        self.pool.reset();
        self.pool.set_seed(self.seed);
        self.simulation.reset();
        self.frame = 0;
        self.finished = self.simulation.frame_count() == 0;
    }

    /// Simulates the next frame, or returns `None` when paused or finished.
    pub fn step(&mut self, asset: &ParticleMaskAsset) -> Option<ParticleFrame> {
        if self.paused || self.finished {
            return None;
        }

        let Self {
            simulation,
            pool,
            frame,
            ..
        } = self;
        let output = simulation.step(*frame, &asset.emitters, &asset.settings, pool);

        self.frame += 1;
        if self.frame >= self.simulation.frame_count() {
            self.finished = true;
        }
        Some(output)
    }
}

pub(crate) fn rand_seed() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (duration.as_nanos() & 0xFFFFFFFF) as u32
}
