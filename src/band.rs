//! Fill bands: vertical slices of a container given in percent of its height.

use crate::error::FillError;
use crate::surface::HeightExtent;
use serde::{Deserialize, Serialize};

/// A vertical band in percent of the container height, `0 <= start <= end <= 100`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillBand {
    /// Lower edge in percent.
    pub start_percent: f32,
    /// Upper edge in percent.
    pub end_percent: f32,
}

/// A band resolved against a concrete container extent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightRange {
    /// Absolute height of the lower edge.
    pub start: f32,
    /// Absolute height of the upper edge.
    pub end: f32,
}

impl HeightRange {
    /// Clamp `y` into the range.
    #[inline]
    pub fn clamp(&self, y: f32) -> f32 {
        y.clamp(self.start, self.end)
    }

    /// Distance between the edges.
    #[inline]
    pub fn height(&self) -> f32 {
        self.end - self.start
    }
}

/// Map percentages onto absolute heights.
///
/// `height = min + (max - min) * percent / 100`. Inputs are expected in
/// `[0, 100]`; use [`FillBand::normalized`] to clamp user input first.
pub fn to_height_range(extent: HeightExtent, start_percent: f32, end_percent: f32) -> HeightRange {
    let at = |percent: f32| extent.min + extent.height() * percent / 100.0;
    HeightRange {
        start: at(start_percent),
        end: at(end_percent),
    }
}

impl FillBand {
    /// Create a band without validation.
    pub const fn new(start_percent: f32, end_percent: f32) -> Self {
        Self {
            start_percent,
            end_percent,
        }
    }

    /// The whole container.
    pub const fn full() -> Self {
        Self::new(0.0, 100.0)
    }

    /// Band width in percent.
    #[inline]
    pub fn percent(&self) -> f32 {
        self.end_percent - self.start_percent
    }

    /// Resolve against a container extent.
    pub fn height_range(&self, extent: HeightExtent) -> HeightRange {
        to_height_range(extent, self.start_percent, self.end_percent)
    }

    /// Clamp both edges into `[0, 100]`.
    ///
    /// Out-of-range edges are reported and clamped. A band whose start still
    /// lies above its end afterwards is rejected.
    pub fn normalized(self) -> Result<Self, FillError> {
        let start = clamp_percent(self.start_percent);
        let end = clamp_percent(self.end_percent);

        if start > end {
            return Err(FillError::InvalidBand { start, end });
        }

        Ok(Self::new(start, end))
    }
}

impl Default for FillBand {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

fn clamp_percent(value: f32) -> f32 {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        return value;
    }

    let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 100.0) };
    warn!("{}, clamping to {}", FillError::InvalidPercent { value }, clamped);
    clamped
}
