use std::ops::ControlFlow;

use bevy::prelude::*;
use thiserror::Error;

use crate::asset::{EmitterData, ParticleMaskAsset, PathBinding, SimulationSettings};
use crate::cache::ParticleSystemCache;
use crate::compute::ComputeError;
use crate::modulation::EmissionParameters;
use crate::path::{FramePath, ParticlePath, PreparedPath};
use crate::pool::{EmitterSettings, ParticleImage, ParticlePool};
use crate::runtime::{EmitterRuntime, rand_seed};

/// Errors that can end a simulation run.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The compute backend could not be acquired.
    #[error(transparent)]
    Compute(#[from] ComputeError),
    /// The canvas has a zero dimension.
    #[error("Invalid canvas size {width}x{height}")]
    InvalidCanvas {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
    /// The observer stopped the run before `frame` was simulated.
    #[error("Simulation cancelled before frame {frame}")]
    Cancelled {
        /// First frame that was not simulated.
        frame: u32,
    },
}

/// Receives progress callbacks from [`ParticleMaskSimulation::run`].
pub trait FrameObserver {
    /// Called once before the first frame.
    fn on_start(&mut self, _frame_count: u32) {}

    /// Called after each frame is complete. Returning [`ControlFlow::Break`] cancels
    /// the run before the next frame.
    fn on_frame(&mut self, _frame: u32) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called once after the last frame of a run that was not cancelled.
    fn on_finish(&mut self) {}
}

impl FrameObserver for () {}

/// Clamped output of one simulated frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGB, clamped to `[0, 1]`.
    pub image: Vec<Vec3>,
    /// Row-major alpha, clamped to `[0, 1]`.
    pub mask: Vec<f32>,
    /// Particles requested by emitters this frame, including dropped ones.
    pub emitted: u32,
}

impl ParticleFrame {
    /// Clamps an accumulated pool image into a frame.
    pub fn from_image(image: &ParticleImage, emitted: u32) -> Self {
        Self {
            width: image.width,
            height: image.height,
            image: image.rgb(),
            mask: image.mask(),
            emitted,
        }
    }

    /// Mask value at `(x, y)`, or `None` outside the frame.
    pub fn mask_at(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.mask
            .get((y as usize) * (self.width as usize) + x as usize)
            .copied()
    }

    /// Number of pixels with any particle coverage.
    pub fn covered_pixels(&self) -> usize {
        self.mask.iter().filter(|alpha| **alpha > 0.0).count()
    }
}

/// A resolved emission request for one emitter on one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    /// Particles to spawn, bursts included.
    pub count: u32,
    /// Pixel-space emitter parameters, angles in radians.
    pub settings: EmitterSettings,
}

enum ResolvedPath {
    Points(PreparedPath),
    Frames(FramePath),
}

/// Drives a [`ParticlePool`] from a list of emitters, one frame at a time.
///
/// Holds the per-emitter state that persists across frames: the fractional emission
/// accumulator, the burst detector and the path progress.
pub struct ParticleMaskSimulation {
    width: u32,
    height: u32,
    frame_count: u32,
    runtimes: Vec<EmitterRuntime>,
    paths: Vec<Option<ResolvedPath>>,
}

impl ParticleMaskSimulation {
    /// Prepares `emitters` for a `width`×`height` canvas. Paths that cannot be
    /// sampled are dropped with a debug log and the emitter stays at its base position.
    pub fn new(emitters: &[EmitterData], width: u32, height: u32, frame_count: u32) -> Self {
        let runtimes = (0..emitters.len()).map(EmitterRuntime::new).collect();
        let paths = emitters
            .iter()
            .map(|emitter| {
                let binding = emitter.path.as_ref()?;
                let resolved = resolve_path(binding, emitter.position, width, height);
                if resolved.is_none() {
                    debug!("emitter \"{}\": path has no usable points, ignoring it", emitter.name);
                }
                resolved
            })
            .collect();

        Self {
            width,
            height,
            frame_count,
            runtimes,
            paths,
        }
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of frames a full run produces.
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Persistent state of emitter `index`.
    pub fn emitter_runtime(&self, index: usize) -> Option<&EmitterRuntime> {
        self.runtimes.get(index)
    }

    /// Clears every emitter's accumulated state.
    pub fn reset(&mut self) {
        for runtime in &mut self.runtimes {
            runtime.reset();
        }
    }

    /// Works out how many particles emitter `index` spawns on `frame`, and with what settings.
    ///
    /// Advances that emitter's accumulator, burst detector and path progress. Returns
    /// `None` when the emitter is outside its window or spawns nothing this frame.
    pub fn resolve_emission(
        &mut self,
        frame: u32,
        index: usize,
        emitter: &EmitterData,
        settings: &SimulationSettings,
    ) -> Option<Emission> {
        if !emitter.enabled
            || !emitter.time.is_active_at(frame)
            || !settings.frame_window(self.frame_count).contains(&frame)
        {
            return None;
        }

        let runtime = self.runtimes.get_mut(index)?;
        let dt = settings.delta_time();
        let frame_index = frame as usize;
        let canvas = Vec2::new(self.width as f32, self.height as f32);

        let mut parameters = EmissionParameters {
            emission_rate: emitter.emission.rate,
            position: emitter.position,
            size: emitter.draw_pass.size,
            spread: emitter.velocities.spread,
            direction: emitter.velocities.direction,
            path_speed: emitter.path.as_ref().map_or(0.0, |binding| binding.speed),
        };

        let mut burst = 0u32;
        if let Some(audio) = &emitter.audio_modulation {
            burst += audio.modulate(frame_index, &mut parameters, &mut runtime.burst);
        }
        if let Some(modulation) = &emitter.path_modulation {
            burst += modulation.modulate(frame_index, &mut parameters, &mut runtime.burst);
        }

        let path = self.paths.get(index).and_then(Option::as_ref);
        if let (Some(binding), Some(path)) = (&emitter.path, path) {
            match path {
                ResolvedPath::Frames(frames) => {
                    if let Some((position, angle)) = frames.at(frame_index) {
                        parameters.position = position;
                        if let (true, Some(angle)) = (binding.align_to_path(), angle) {
                            parameters.direction = angle;
                        }
                    }
                }
                ResolvedPath::Points(prepared) => {
                    let progress = runtime
                        .path_progress
                        .advance(parameters.path_speed * dt, binding.loop_mode);
                    if let Some(sample) = prepared.sample(progress) {
                        parameters.position = sample.position / canvas;
                        if binding.align_to_path() {
                            parameters.direction = sample.angle;
                        }
                    }
                }
            }
        }

        let count = runtime
            .accumulate(parameters.emission_rate, dt)
            .saturating_add(burst);
        if count == 0 {
            return None;
        }

        let direction = parameters.direction + emitter.velocities.direction_offset;
        Some(Emission {
            count,
            settings: EmitterSettings {
                position: parameters.position * canvas,
                direction: direction.to_radians(),
                spread: parameters.spread.to_radians(),
                speed: emitter.velocities.speed,
                size: parameters.size,
                emission_radius: emitter.emission.radius,
                color: emitter.draw_pass.color,
                particle_life: emitter.time.effective_lifetime(settings.particle_lifetime),
                shape: emitter.draw_pass.shape,
                spark_length: emitter.draw_pass.spark_length,
                endless: emitter.emission.endless,
            },
        })
    }

    /// Simulates `frame`: emits for every emitter, then integrates and rasterizes once.
    pub fn step(
        &mut self,
        frame: u32,
        emitters: &[EmitterData],
        settings: &SimulationSettings,
        pool: &mut ParticlePool,
    ) -> ParticleFrame {
        pool.clear_image();

        let mut emitted = 0u32;
        for (index, emitter) in emitters.iter().enumerate() {
            let Some(emission) = self.resolve_emission(frame, index, emitter, settings) else {
                continue;
            };
            pool.emit(emission.count, &emission.settings);
            emitted = emitted.saturating_add(emission.count);
        }

        pool.update(settings.delta_time(), settings.gravity_vector());
        pool.rasterize();

        ParticleFrame::from_image(&pool.get_image(), emitted)
    }

    /// Simulates `frame_count` frames of `asset` on a `width`×`height` canvas.
    ///
    /// The pool comes from `cache` and is reset first. Returns one frame per index, or
    /// [`SimulationError::Cancelled`] if `observer` stops the run early.
    pub fn run(
        asset: &ParticleMaskAsset,
        width: u32,
        height: u32,
        frame_count: u32,
        cache: &mut ParticleSystemCache,
        observer: &mut impl FrameObserver,
    ) -> Result<Vec<ParticleFrame>, SimulationError> {
        if width == 0 || height == 0 {
            return Err(SimulationError::InvalidCanvas { width, height });
        }

        let settings = &asset.settings;
        let pool = cache.get_or_create(width, height, settings.particle_count)?;
        pool.reset();
        pool.set_seed(settings.fixed_seed.unwrap_or_else(rand_seed));

        let mut simulation = Self::new(&asset.emitters, width, height, frame_count);
        let mut frames = Vec::with_capacity(frame_count as usize);

        observer.on_start(frame_count);
        for frame in 0..frame_count {
            frames.push(simulation.step(frame, &asset.emitters, settings, pool));

            let next = frame + 1;
            if observer.on_frame(frame).is_break() && next < frame_count {
                info!("particle mask \"{}\" cancelled after {next} frames", asset.name);
                return Err(SimulationError::Cancelled { frame: next });
            }
        }
        observer.on_finish();

        Ok(frames)
    }
}

fn resolve_path(
    binding: &PathBinding,
    origin: Vec2,
    width: u32,
    height: u32,
) -> Option<ResolvedPath> {
    match &binding.path {
        ParticlePath::Frames(frames) => {
            (!frames.is_empty()).then(|| ResolvedPath::Frames(frames.clone()))
        }
        ParticlePath::Points { points, .. } => {
            let shift = if binding.use_emitter_origin() {
                origin - Vec2::splat(0.5)
            } else {
                Vec2::ZERO
            };
            let points: Vec<Vec2> = points
                .iter()
                .map(|point| (*point + shift).clamp(Vec2::ZERO, Vec2::ONE))
                .collect();
            PreparedPath::prepare(&points, width, height).map(ResolvedPath::Points)
        }
    }
}
