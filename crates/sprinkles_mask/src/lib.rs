#![deny(missing_docs)]
//! **Sprinkles Mask** simulates particle emitters and rasterizes them into per-frame
//! alpha masks and color images, for compositing into video mask sequences.
//!
//! Particles live in a fixed-capacity [`ParticlePool`] whose emission, integration
//! and rasterization kernels run in parallel on a shared [`ComputeBackend`]. A
//! [`ParticleMaskSimulation`] turns a list of declarative [`EmitterData`] entries into
//! emission events every frame, applying feature-driven modulation and moving emitters
//! along paths.
//!
//! # Getting started
//!
//! ## Running a simulation directly
//!
//! ```no_run
//! use bevy::prelude::*;
//! use sprinkles_mask::prelude::*;
//!
//! let asset = ParticleMaskAsset::new(
//!     "Sparks".into(),
//!     SimulationSettings {
//!         fixed_seed: Some(7),
//!         ..default()
//!     },
//!     vec![EmitterData {
//!         emission: EmitterEmission {
//!             rate: 120.0,
//!             ..default()
//!         },
//!         draw_pass: EmitterDrawPass {
//!             shape: ParticleShape::Spark,
//!             ..default()
//!         },
//!         ..default()
//!     }],
//! );
//!
//! let mut cache = ParticleSystemCache::default();
//! let frames = ParticleMaskSimulation::run(&asset, 512, 512, 90, &mut cache, &mut ())
//!     .expect("simulation failed");
//! assert_eq!(frames.len(), 90);
//! ```
//!
//! ## Inside a Bevy app
//!
//! Add [`SprinklesMaskPlugin`] and spawn a [`ParticleMask`]. Each app update simulates
//! one frame and stores it in a [`ParticleMaskFrame`] component on the same entity.
//!
//! ```
//! use bevy::prelude::*;
//! use sprinkles_mask::prelude::*;
//!
//! fn setup(mut commands: Commands, asset_server: Res<AssetServer>) {
//!     commands.spawn(ParticleMask {
//!         handle: asset_server.load("confetti.ron"),
//!         width: 1920,
//!         height: 1080,
//!         frame_count: 240,
//!     });
//! }
//! ```
//!
//! # Table of contents
//!
//! - [Emitters](EmitterData): [timing](EmitterTime), [emission](EmitterEmission),
//!   [velocities](EmitterVelocities) and [drawing](EmitterDrawPass)
//! - [Paths](path): polylines, [shapes](PathShape) and
//!   [feature-driven trajectories](Trajectory)
//! - [Modulation](modulation): [audio](AudioModulation) and [path](PathModulation)
//!   modulation, with onset bursts
//! - [Pool caching](ParticleSystemCache) per canvas size

/// Particle mask asset definitions, emitter data, and serialization types.
pub mod asset;
/// Pool caching keyed by canvas size.
pub mod cache;
/// Parallel execution context and atomic buffers.
pub mod compute;
/// Per-frame scalar signals.
pub mod feature;
pub mod modulation;
pub mod path;
/// Fixed-capacity particle storage and its kernels.
pub mod pool;
/// Convenience re-exports for common particle mask types.
pub mod prelude;
/// Runtime components and per-emitter state.
pub mod runtime;
/// Frame orchestration.
pub mod simulation;
mod spawning;

use bevy::prelude::*;

use asset::{ParticleMaskAsset, ParticleMaskAssetLoader};
use spawning::{
    cleanup_particle_masks, restart_modified_particle_masks, setup_particle_masks,
    step_particle_masks,
};

/// Plugin that adds particle mask simulation to a Bevy app.
///
/// Registers the RON asset loader, the pool cache, and the systems that step every
/// [`ParticleMask`] entity one frame per update.
pub struct SprinklesMaskPlugin;

impl Plugin for SprinklesMaskPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<ParticleMaskAsset>()
            .init_asset_loader::<ParticleMaskAssetLoader>();

        app.init_resource::<cache::ParticleSystemCache>();

        app.add_systems(
            Update,
            (
                restart_modified_particle_masks,
                setup_particle_masks,
                step_particle_masks,
                cleanup_particle_masks,
            )
                .chain(),
        );
    }
}

pub use asset::{
    EmitterData, EmitterDrawPass, EmitterEmission, EmitterTime, EmitterVelocities, PathBinding,
    PathFlags, SimulationSettings,
};
pub use cache::ParticleSystemCache;
pub use compute::{ComputeBackend, ComputeError, ComputeSettings};
pub use feature::{Feature, FeatureCurve, FeatureSource};
pub use modulation::{AudioModulation, BurstSettings, ModulationMode, ModulationTarget, PathModulation};
pub use path::{LoopMode, ParticlePath, PathShape, Trajectory};
pub use pool::{EmitterSettings, Particle, ParticlePool, ParticleShape};
pub use runtime::{EmitterRuntime, ParticleMask, ParticleMaskFrame, ParticleMaskRuntime};
pub use simulation::{FrameObserver, ParticleFrame, ParticleMaskSimulation, SimulationError};
