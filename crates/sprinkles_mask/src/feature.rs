//! Per-frame scalar signals that drive modulation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A scalar value sampled per frame, e.g. an audio envelope.
pub trait Feature: Send + Sync {
    /// Value at `frame`.
    fn value_at(&self, frame: usize) -> f32;

    /// Lower bound of the signal, when known. Used to normalize it.
    fn min_value(&self) -> Option<f32> {
        None
    }

    /// Upper bound of the signal, when known.
    fn max_value(&self) -> Option<f32> {
        None
    }

    /// Number of frames with data, when finite.
    fn frame_count(&self) -> Option<usize> {
        None
    }
}

/// A feature stored as one value per frame. Frames past the end hold the last value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureCurve {
    /// One value per frame.
    pub values: Vec<f32>,
    /// Declared lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f32>,
    /// Declared upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f32>,
}

impl FeatureCurve {
    /// Creates a curve without a declared range.
    pub fn new(values: impl Into<Vec<f32>>) -> Self {
        Self {
            values: values.into(),
            min: None,
            max: None,
        }
    }

    /// Declares the `[min, max]` range of the values.
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

impl Feature for FeatureCurve {
    fn value_at(&self, frame: usize) -> f32 {
        self.values
            .get(frame)
            .or(self.values.last())
            .copied()
            .unwrap_or(0.0)
    }

    fn min_value(&self) -> Option<f32> {
        self.min
    }

    fn max_value(&self) -> Option<f32> {
        self.max
    }

    fn frame_count(&self) -> Option<usize> {
        Some(self.values.len())
    }
}

/// Where a modulation target reads its feature from. `None` disables the target.
#[derive(Clone, Default, Serialize, Deserialize)]
pub enum FeatureSource {
    /// No feature.
    #[default]
    None,
    /// Values stored with the asset.
    Curve(FeatureCurve),
    /// A feature supplied at runtime. Not serializable.
    #[serde(skip)]
    Shared(Arc<dyn Feature>),
}

impl FeatureSource {
    /// Wraps a runtime feature.
    pub fn shared(feature: impl Feature + 'static) -> Self {
        Self::Shared(Arc::new(feature))
    }

    /// Returns `true` for [`FeatureSource::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The underlying feature, if any.
    pub fn as_feature(&self) -> Option<&dyn Feature> {
        match self {
            Self::None => None,
            Self::Curve(curve) => Some(curve),
            Self::Shared(feature) => Some(feature.as_ref()),
        }
    }

    /// Feature value at `frame`, or `None` when there is no feature.
    pub fn value_at(&self, frame: usize) -> Option<f32> {
        self.as_feature().map(|feature| feature.value_at(frame))
    }
}

impl From<FeatureCurve> for FeatureSource {
    fn from(curve: FeatureCurve) -> Self {
        Self::Curve(curve)
    }
}

impl fmt::Debug for FeatureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Curve(curve) => f.debug_tuple("Curve").field(curve).finish(),
            Self::Shared(feature) => f
                .debug_struct("Shared")
                .field("frame_count", &feature.frame_count())
                .finish_non_exhaustive(),
        }
    }
}

impl PartialEq for FeatureSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Curve(a), Self::Curve(b)) => a == b,
            (Self::Shared(a), Self::Shared(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
