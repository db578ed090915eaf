pub(crate) mod serde_helpers;
mod settings;
/// Asset format version tracking and compatibility validation.
pub mod versioning;

pub use settings::SimulationSettings;

use bevy::{
    asset::{AssetLoader, LoadContext, io::Reader},
    prelude::*,
};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::modulation::{AudioModulation, PathModulation};
use crate::path::{LoopMode, ParticlePath};
use crate::pool::ParticleShape;
use serde_helpers::*;
use versioning::{VersionStatus, current_format_version};

/// Asset loader for [`ParticleMaskAsset`] files in RON format.
#[derive(Default, TypePath)]
pub struct ParticleMaskAssetLoader;

/// Errors that can occur when loading a [`ParticleMaskAsset`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ParticleMaskAssetLoaderError {
    /// An I/O error occurred while reading the asset file.
    #[error("Could not load asset: {0}")]
    Io(#[from] std::io::Error),
    /// The asset file contained invalid RON syntax.
    #[error("Could not parse RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
    /// The asset file has an unknown format version, likely from a newer release.
    #[error("Unknown sprinkles_mask_version. You may need a newer version of sprinkles_mask.")]
    UnknownVersion,
    /// The asset file has a version that requires breaking changes to upgrade.
    #[error(
        "Asset version \"{found}\" is incompatible with current version \"{current}\". Manual migration is required."
    )]
    IncompatibleVersion {
        /// The version found in the asset file.
        found: String,
        /// The current format version.
        current: String,
    },
}

impl AssetLoader for ParticleMaskAssetLoader {
    type Asset = ParticleMaskAsset;
    type Settings = ();
    type Error = ParticleMaskAssetLoaderError;

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &(),
        load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        let mut asset = ron::de::from_bytes::<ParticleMaskAsset>(&bytes)?;

        match asset.try_upgrade_version() {
            VersionStatus::Current => {}
            VersionStatus::Outdated { found, current } => {
                let path = load_context.path();
                warn!(
                    "{path:?}: loaded asset with sprinkles_mask_version \"{found}\", current is \"{current}\""
                );
            }
            VersionStatus::Incompatible { found, current } => {
                return Err(ParticleMaskAssetLoaderError::IncompatibleVersion {
                    found,
                    current: current.to_string(),
                });
            }
            VersionStatus::Unknown => {
                return Err(ParticleMaskAssetLoaderError::UnknownVersion);
            }
        }

        Ok(asset)
    }

    fn extensions(&self) -> &[&str] {
        &["ron"]
    }
}

bitflags! {
    /// Bitflags that control how an emitter follows its path.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PathFlags: u32 {
        /// If set, particles are fired along the path tangent instead of the emitter direction.
        const ALIGN_TO_PATH = 1 << 0;
        /// If set, point paths are shifted so the canvas center lands on the emitter position.
        const USE_EMITTER_ORIGIN = 1 << 1;
    }
}

impl Default for PathFlags {
    fn default() -> Self {
        Self::ALIGN_TO_PATH | Self::USE_EMITTER_ORIGIN
    }
}

/// Binds an emitter to a [`ParticlePath`] it travels along.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathBinding {
    /// The path to follow.
    pub path: ParticlePath,
    /// Fraction of the path length covered per second. Negative values travel backwards.
    ///
    /// Ignored for frame paths. Defaults to `0.2`.
    #[serde(default = "default_path_speed")]
    pub speed: f32,
    /// What happens at the ends of the path. Defaults to [`LoopMode::Loop`].
    #[serde(default)]
    pub loop_mode: LoopMode,
    /// Alignment and origin flags. Defaults to both set.
    #[serde(default)]
    pub flags: PathFlags,
}

fn default_path_speed() -> f32 {
    0.2
}

impl PathBinding {
    /// Binds `path` with the default speed, loop mode and flags.
    pub fn new(path: impl Into<ParticlePath>) -> Self {
        Self {
            path: path.into(),
            speed: default_path_speed(),
            loop_mode: LoopMode::default(),
            flags: PathFlags::default(),
        }
    }

    /// Whether particles launch along the path tangent.
    pub fn align_to_path(&self) -> bool {
        self.flags.contains(PathFlags::ALIGN_TO_PATH)
    }

    /// Whether point paths are shifted onto the emitter position.
    pub fn use_emitter_origin(&self) -> bool {
        self.flags.contains(PathFlags::USE_EMITTER_ORIGIN)
    }
}

/// Frame window and lifetime configuration for an emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Reflect)]
pub struct EmitterTime {
    /// Lifetime of each particle in seconds. `0.0` uses
    /// [`SimulationSettings::particle_lifetime`].
    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub particle_lifetime: f32,
    /// First frame this emitter spawns on. Defaults to `0`.
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub start_frame: u32,
    /// Frame this emitter stops spawning on, exclusive. `0` never stops.
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub end_frame: u32,
}

impl Default for EmitterTime {
    fn default() -> Self {
        Self {
            particle_lifetime: 0.0,
            start_frame: 0,
            end_frame: 0,
        }
    }
}

impl EmitterTime {
    /// Returns `true` if `frame` lies inside `[start_frame, end_frame)`.
    pub fn is_active_at(&self, frame: u32) -> bool {
        frame >= self.start_frame && (self.end_frame == 0 || frame < self.end_frame)
    }

    /// Lifetime of particles spawned by this emitter under a global default of `global`.
    pub fn effective_lifetime(&self, global: f32) -> f32 {
        if self.particle_lifetime > 0.0 {
            self.particle_lifetime
        } else {
            global
        }
    }
}

/// How many particles an emitter spawns and how they fill the slot pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Reflect)]
pub struct EmitterEmission {
    /// Particles per second. Fractions carry over between frames. Defaults to `10.0`.
    #[serde(default = "default_emission_rate")]
    pub rate: f32,
    /// Radius in pixels of the disc particles spawn inside. Defaults to `0.0`.
    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub radius: f32,
    /// If `true`, the emission cursor wraps and overwrites the oldest slots once the
    /// pool is full. Otherwise emission stops at capacity. Defaults to `false`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub endless: bool,
}

fn default_emission_rate() -> f32 {
    10.0
}

impl Default for EmitterEmission {
    fn default() -> Self {
        Self {
            rate: default_emission_rate(),
            radius: 0.0,
            endless: false,
        }
    }
}

/// Initial particle velocity. Angles are in degrees, with 90° pointing down the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Reflect)]
pub struct EmitterVelocities {
    /// Center direction particles are fired in. Defaults to `0.0`.
    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub direction: f32,
    /// Constant offset added after any path alignment or modulation. Defaults to `0.0`.
    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub direction_offset: f32,
    /// Width of the cone directions are drawn from. Defaults to `45.0`.
    #[serde(default = "default_spread")]
    pub spread: f32,
    /// Initial speed in pixels per second. Defaults to `200.0`.
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_spread() -> f32 {
    45.0
}

fn default_speed() -> f32 {
    200.0
}

impl Default for EmitterVelocities {
    fn default() -> Self {
        Self {
            direction: 0.0,
            direction_offset: 0.0,
            spread: default_spread(),
            speed: default_speed(),
        }
    }
}

/// How particles are drawn into the mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Reflect)]
pub struct EmitterDrawPass {
    /// Primitive drawn for each particle. Defaults to [`ParticleShape::Circle`].
    #[serde(default)]
    pub shape: ParticleShape,
    /// Diameter in pixels. Defaults to `6.0`.
    #[serde(default = "default_size")]
    pub size: f32,
    /// Streak length in pixels for [`ParticleShape::Spark`]. Defaults to `12.0`.
    #[serde(default = "default_spark_length")]
    pub spark_length: f32,
    /// Linear RGB color. Defaults to white.
    #[serde(default = "default_color", skip_serializing_if = "is_one_vec3")]
    pub color: Vec3,
}

fn default_size() -> f32 {
    6.0
}

fn default_spark_length() -> f32 {
    12.0
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

impl Default for EmitterDrawPass {
    fn default() -> Self {
        Self {
            shape: ParticleShape::default(),
            size: default_size(),
            spark_length: default_spark_length(),
            color: default_color(),
        }
    }
}

/// Complete configuration for a single particle emitter.
///
/// An emitter is a declarative source of particles. Its base values can be driven by
/// audio and path modulation, and its position can follow a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterData {
    /// Display name for this emitter.
    pub name: String,
    /// Whether this emitter is active. Disabled emitters do not spawn particles.
    ///
    /// Defaults to `true`.
    #[serde(default = "default_enabled", skip_serializing_if = "is_true")]
    pub enabled: bool,

    /// Emitter position in normalized canvas coordinates. Defaults to the canvas center.
    #[serde(default = "default_position")]
    pub position: Vec2,

    /// Frame window and lifetime override.
    #[serde(default)]
    pub time: EmitterTime,

    /// Emission rate, spawn radius and slot reuse.
    #[serde(default)]
    pub emission: EmitterEmission,

    /// Direction, spread and speed.
    #[serde(default)]
    pub velocities: EmitterVelocities,

    /// Shape, size and color.
    #[serde(default)]
    pub draw_pass: EmitterDrawPass,

    /// Optional path the emitter travels along.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBinding>,

    /// Optional feature-driven emission rate and bursts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_modulation: Option<AudioModulation>,

    /// Optional feature-driven path speed, size, angle and spread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_modulation: Option<PathModulation>,
}

fn default_enabled() -> bool {
    true
}

fn default_position() -> Vec2 {
    Vec2::splat(0.5)
}

impl Default for EmitterData {
    fn default() -> Self {
        Self {
            name: "Emitter".to_string(),
            enabled: true,
            position: default_position(),
            time: EmitterTime::default(),
            emission: EmitterEmission::default(),
            velocities: EmitterVelocities::default(),
            draw_pass: EmitterDrawPass::default(),
            path: None,
            audio_modulation: None,
            path_modulation: None,
        }
    }
}

impl EmitterData {
    /// Appends this emitter to `previous`, or starts a new list.
    pub fn chain(self, previous: Option<Vec<EmitterData>>) -> Vec<EmitterData> {
        let mut emitters = previous.unwrap_or_default();
        emitters.push(self);
        emitters
    }
}

/// A complete particle mask description, loadable from RON files.
///
/// Holds the global [`SimulationSettings`] and the emitters that feed one shared
/// particle pool. Reference it from a [`ParticleMask`](crate::runtime::ParticleMask)
/// component, or pass it to [`ParticleMaskSimulation::run`](crate::simulation::ParticleMaskSimulation::run).
#[derive(Asset, TypePath, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleMaskAsset {
    sprinkles_mask_version: String,
    /// Display name for this mask.
    pub name: String,
    /// Pool size, gravity, wind and frame timing.
    #[serde(default)]
    pub settings: SimulationSettings,
    /// The list of emitters, processed in order every frame.
    pub emitters: Vec<EmitterData>,
}

impl ParticleMaskAsset {
    /// Creates a new particle mask asset with the current format version.
    pub fn new(name: String, settings: SimulationSettings, emitters: Vec<EmitterData>) -> Self {
        Self {
            sprinkles_mask_version: current_format_version().to_string(),
            name,
            settings,
            emitters,
        }
    }

    /// The asset's `sprinkles_mask_version`.
    pub fn version(&self) -> &str {
        &self.sprinkles_mask_version
    }

    /// Validates this asset's `sprinkles_mask_version` against the current format version.
    ///
    /// If the version is outdated but compatible, it is automatically upgraded.
    /// Returns the original [`VersionStatus`] so the caller can react accordingly.
    pub fn try_upgrade_version(&mut self) -> VersionStatus {
        let status = versioning::validate_version(&self.sprinkles_mask_version);
        if matches!(status, VersionStatus::Outdated { .. }) {
            self.sprinkles_mask_version = current_format_version().to_string();
        }
        status
    }
}
