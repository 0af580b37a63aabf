//! Non-destructive visual adjustments.
//!
//! Adjustments describe *how to display* an artifact, never a change to it.
//! [`render`] maps an artifact reference plus an [`Adjustments`] bundle to a
//! [`RenderDescriptor`]; the artifact itself is untouched, so undo is just
//! resetting the parameters.
//!
//! ## Factors
//!
//! ```text
//! brightness_factor = 1 + brightness / 100
//! contrast_factor   = 1 + contrast   / 100
//! saturation_factor = 1 + saturation / 100
//! ```
//!
//! Each parameter lives in [-50, 50], so every factor lands in [0.5, 1.5].
//! Sharpness has no display factor: it is carried through to export.

use crate::types::ArtifactRef;
use serde::{Deserialize, Serialize};

pub const LEVEL_MIN: i32 = -50;
pub const LEVEL_MAX: i32 = 50;

/// A signed adjustment amount in [-50, 50]. Clamped on construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub struct Level(i32);

impl Level {
    pub fn new(value: i32) -> Self {
        Self(value.clamp(LEVEL_MIN, LEVEL_MAX))
    }

    pub fn value(self) -> i32 {
        self.0
    }

    /// `1 + value / 100`.
    pub fn factor(self) -> f64 {
        1.0 + f64::from(self.0) / 100.0
    }
}

impl From<i32> for Level {
    fn from(value: i32) -> Self {
        Self::new(value)
    }
}

impl From<Level> for i32 {
    fn from(level: Level) -> Self {
        level.0
    }
}

/// Adjustment parameters for one artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    pub brightness: Level,
    pub contrast: Level,
    pub saturation: Level,
    pub sharpness: Level,
}

impl Adjustments {
    pub fn new(brightness: i32, contrast: i32, saturation: i32, sharpness: i32) -> Self {
        Self {
            brightness: Level::new(brightness),
            contrast: Level::new(contrast),
            saturation: Level::new(saturation),
            sharpness: Level::new(sharpness),
        }
    }

    /// All four parameters back to zero.
    pub fn reset_adjustments(self) -> Self {
        Self::default()
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

/// What a presentation layer needs to draw an adjusted artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderDescriptor {
    pub source: ArtifactRef,
    pub brightness_factor: f64,
    pub contrast_factor: f64,
    pub saturation_factor: f64,
    /// Forwarded to export; not composited for display.
    pub sharpness: i32,
}

impl RenderDescriptor {
    /// Render as a CSS `filter` value.
    pub fn to_css_filter(&self) -> String {
        format!(
            "brightness({}) contrast({}) saturate({})",
            trim_float(self.brightness_factor),
            trim_float(self.contrast_factor),
            trim_float(self.saturation_factor)
        )
    }
}

/// Build the render description for `source` under `params`.
pub fn render(source: &ArtifactRef, params: &Adjustments) -> RenderDescriptor {
    RenderDescriptor {
        source: source.clone(),
        brightness_factor: params.brightness.factor(),
        contrast_factor: params.contrast.factor(),
        saturation_factor: params.saturation.factor(),
        sharpness: params.sharpness.value(),
    }
}

fn trim_float(value: f64) -> String {
    let s = format!("{value:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
