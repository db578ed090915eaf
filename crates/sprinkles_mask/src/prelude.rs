pub use crate::SprinklesMaskPlugin;

pub use crate::asset::{
    EmitterData, EmitterDrawPass, EmitterEmission, EmitterTime, EmitterVelocities,
    ParticleMaskAsset, PathBinding, PathFlags, SimulationSettings,
};
pub use crate::cache::ParticleSystemCache;
pub use crate::compute::{ComputeBackend, ComputeSettings};
pub use crate::feature::{Feature, FeatureCurve, FeatureSource};
pub use crate::modulation::{
    AudioModulation, BurstSettings, ModulationMode, ModulationTarget, PathModulation,
};
pub use crate::path::{
    DirectionMode, FramePath, LoopMode, ParticlePath, PathShape, ShapeTransform, Trajectory,
    TrajectorySettings,
};
pub use crate::pool::{EmitterSettings, ParticlePool, ParticleShape};
pub use crate::runtime::{ParticleMask, ParticleMaskFrame, ParticleMaskRuntime};
pub use crate::simulation::{FrameObserver, ParticleFrame, ParticleMaskSimulation, SimulationError};
