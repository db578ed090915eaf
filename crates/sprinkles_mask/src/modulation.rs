//! Feature-driven parameter modulation and onset bursts.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::asset::serde_helpers::is_zero_f32;
use crate::feature::FeatureSource;

/// How a feature value combines with a base parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Reflect)]
pub enum ModulationMode {
    /// `base * (1 + scale * value) + offset`
    #[default]
    Relative,
    /// `base + offset + scale * value`
    Absolute,
}

/// Modulates `base` by a thresholded feature value.
///
/// Without a feature value, `base` is returned unchanged.
pub fn apply_modulation(
    base: f32,
    feature_value: Option<f32>,
    scale: f32,
    offset: f32,
    threshold: f32,
    mode: ModulationMode,
) -> f32 {
    let Some(feature_value) = feature_value else {
        return base;
    };
    let value = (feature_value - threshold).max(0.0);
    match mode {
        ModulationMode::Absolute => base + offset + scale * value,
        ModulationMode::Relative => base * (1.0 + scale * value) + offset,
    }
}

fn default_scale() -> f32 {
    1.0
}

/// One modulated parameter: which feature drives it and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulationTarget {
    /// Driving feature. Without one the parameter keeps its base value.
    #[serde(default, skip_serializing_if = "FeatureSource::is_none")]
    pub feature: FeatureSource,
    /// Multiplier on the thresholded feature value.
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Constant added to the modulated value.
    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub offset: f32,
    /// Subtracted from the feature value, which is then floored at zero.
    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub threshold: f32,
    /// Formula combining base and feature.
    #[serde(default)]
    pub mode: ModulationMode,
}

impl Default for ModulationTarget {
    fn default() -> Self {
        Self {
            feature: FeatureSource::None,
            scale: default_scale(),
            offset: 0.0,
            threshold: 0.0,
            mode: ModulationMode::default(),
        }
    }
}

impl ModulationTarget {
    /// Target driven by `feature` with the given `scale`, relative mode.
    pub fn new(feature: impl Into<FeatureSource>, scale: f32) -> Self {
        Self {
            feature: feature.into(),
            scale,
            ..default()
        }
    }

    /// Sets the additive offset.
    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the feature threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the combination mode.
    pub fn with_mode(mut self, mode: ModulationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Modulated value of `base` at `frame`.
    pub fn apply(&self, base: f32, frame: usize) -> f32 {
        apply_modulation(
            base,
            self.feature.value_at(frame),
            self.scale,
            self.offset,
            self.threshold,
            self.mode,
        )
    }

    /// Feature value at `frame` after the threshold is removed, floored at zero.
    pub fn thresholded(&self, frame: usize) -> Option<f32> {
        self.feature
            .value_at(frame)
            .map(|value| (value - self.threshold).max(0.0))
    }
}

/// Onset detection parameters. A bound of `0` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstSettings {
    /// Smallest frame-to-frame rise that counts as an onset.
    pub onset_threshold: f32,
    /// Particles per unit of rise.
    pub burst_strength: f32,
    /// Minimum burst size.
    pub burst_min: u32,
    /// Maximum burst size.
    pub burst_max: u32,
}

impl Default for BurstSettings {
    fn default() -> Self {
        Self {
            onset_threshold: 0.08,
            burst_strength: 200.0,
            burst_min: 0,
            burst_max: 0,
        }
    }
}

impl BurstSettings {
    /// Extra particles for a rise of `delta` between consecutive frames.
    pub fn burst_count(&self, delta: f32) -> u32 {
        if delta < self.onset_threshold {
            return 0;
        }
        let mut count = (self.burst_strength * delta) as i64;
        if self.burst_min > 0 {
            count = count.max(self.burst_min as i64);
        }
        if self.burst_max > 0 {
            count = count.min(self.burst_max as i64);
        }
        count.max(0) as u32
    }
}

/// Tracks the previous thresholded feature value for onset detection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BurstDetector {
    /// Thresholded value seen on the previous frame.
    pub previous: f32,
}

impl BurstDetector {
    /// Returns the burst for `value` and records it as the previous value, burst or not.
    pub fn detect(&mut self, value: f32, settings: &BurstSettings) -> u32 {
        let delta = value - self.previous;
        self.previous = value;
        settings.burst_count(delta)
    }

    /// Forgets the previous value.
    pub fn reset(&mut self) {
        self.previous = 0.0;
    }
}

/// Emission parameters after modulation, before they become pixel-space settings.
///
/// Angles are in degrees, position is normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionParameters {
    /// Particles per second.
    pub emission_rate: f32,
    /// Emitter position, normalized to the canvas.
    pub position: Vec2,
    /// Particle size in pixels.
    pub size: f32,
    /// Launch cone width.
    pub spread: f32,
    /// Launch angle.
    pub direction: f32,
    /// Path progress per second.
    pub path_speed: f32,
}

/// Audio-driven emission rate with onset bursts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioModulation {
    /// Modulates the emission rate.
    pub emission_rate: ModulationTarget,
    /// Bursts triggered by rises in the emission rate feature.
    #[serde(default)]
    pub burst: BurstSettings,
}

impl Default for AudioModulation {
    fn default() -> Self {
        Self {
            emission_rate: ModulationTarget {
                scale: 2.0,
                ..default()
            },
            burst: BurstSettings::default(),
        }
    }
}

impl AudioModulation {
    /// Modulates `parameters` for `frame` and returns the burst count.
    pub fn modulate(
        &self,
        frame: usize,
        parameters: &mut EmissionParameters,
        detector: &mut BurstDetector,
    ) -> u32 {
        parameters.emission_rate = self.emission_rate.apply(parameters.emission_rate, frame);
        match self.emission_rate.thresholded(frame) {
            Some(value) => detector.detect(value, &self.burst),
            None => 0,
        }
    }
}

/// Feature-driven path speed, size, angle and spread, with onset bursts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathModulation {
    /// Modulates the path speed.
    pub speed: ModulationTarget,
    /// Modulates the particle size.
    pub size: ModulationTarget,
    /// Modulates the launch direction.
    pub angle: ModulationTarget,
    /// Modulates the spread.
    pub spread: ModulationTarget,
    /// Burst parameters.
    pub burst: BurstSettings,
    /// Drives bursts. Falls back to the speed feature when unset.
    #[serde(skip_serializing_if = "FeatureSource::is_none")]
    pub burst_feature: FeatureSource,
}

impl Default for PathModulation {
    fn default() -> Self {
        Self {
            speed: ModulationTarget::default(),
            size: ModulationTarget {
                scale: 0.5,
                ..default()
            },
            angle: ModulationTarget {
                scale: 45.0,
                ..default()
            },
            spread: ModulationTarget {
                scale: 30.0,
                ..default()
            },
            burst: BurstSettings::default(),
            burst_feature: FeatureSource::None,
        }
    }
}

impl PathModulation {
    /// Modulates `parameters` for `frame` and returns the burst count.
    pub fn modulate(
        &self,
        frame: usize,
        parameters: &mut EmissionParameters,
        detector: &mut BurstDetector,
    ) -> u32 {
        parameters.path_speed = self.speed.apply(parameters.path_speed, frame);
        parameters.size = self.size.apply(parameters.size, frame);
        parameters.direction = self.angle.apply(parameters.direction, frame);
        parameters.spread = self.spread.apply(parameters.spread, frame);

        let source = if self.burst_feature.is_none() {
            &self.speed.feature
        } else {
            &self.burst_feature
        };
        match source.value_at(frame) {
            Some(value) => {
                let value = (value - self.speed.threshold).max(0.0);
                detector.detect(value, &self.burst)
            }
            None => 0,
        }
    }
}
