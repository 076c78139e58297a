//! Configuration types for fill sessions.
//!
//! Every empirical constant of the engine lives here so a driver can tune
//! it from JSON. All fields carry serde defaults; an empty `{}` document is a
//! valid configuration.

use crate::error::FillError;
use crate::substance::Substance;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_lateral_inset() -> f32 {
    0.6
}

fn default_vertical_inset() -> f32 {
    0.25
}

fn default_apex_jitter() -> f32 {
    0.02
}

fn default_attempt_factor() -> u32 {
    10
}

fn default_height_decimals() -> u32 {
    2
}

fn default_cap_offset() -> f32 {
    0.001
}

fn default_max_substances() -> usize {
    7
}

fn default_max_particles() -> usize {
    1_000_000
}

/// How a cap ring is turned into triangles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapTriangulation {
    /// Ear clipping of the ring outline. Handles non-convex cross-sections.
    #[default]
    Polygon,
    /// Fan around an inserted centre vertex. Assumes a star-convex ring.
    Fan,
}

/// Top-surface reconstruction settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapConfig {
    /// Decimal digits kept when bucketing vertices by height.
    #[serde(default = "default_height_decimals")]
    pub height_decimals: u32,
    /// Distance the cap is lowered below its target height.
    #[serde(default = "default_cap_offset")]
    pub offset: f32,
    /// Triangulation method.
    #[serde(default)]
    pub triangulation: CapTriangulation,
}

impl Default for CapConfig {
    fn default() -> Self {
        Self {
            height_decimals: default_height_decimals(),
            offset: default_cap_offset(),
            triangulation: CapTriangulation::default(),
        }
    }
}

/// Placement settings shared by every substance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Lateral pull toward the axis per unit of particle size.
    #[serde(default = "default_lateral_inset")]
    pub lateral_inset: f32,
    /// Vertical pull toward the band floor per unit of particle size.
    #[serde(default = "default_vertical_inset")]
    pub vertical_inset: f32,
    /// Maximum height jitter of apex points around the band top.
    #[serde(default = "default_apex_jitter")]
    pub apex_jitter: f32,
    /// Sampling attempts allowed per requested particle.
    #[serde(default = "default_attempt_factor")]
    pub attempt_factor: u32,
    /// Skip samples whose normal faces away from the container axis.
    #[serde(default)]
    pub inner_wall_only: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            lateral_inset: default_lateral_inset(),
            vertical_inset: default_vertical_inset(),
            apex_jitter: default_apex_jitter(),
            attempt_factor: default_attempt_factor(),
            inner_wall_only: false,
        }
    }
}

impl PlacementConfig {
    /// Attempt budget for `requested` particles.
    pub fn attempt_budget(&self, requested: usize) -> usize {
        requested.saturating_mul(self.attempt_factor.max(1) as usize)
    }
}

/// Engine-wide settings for a [`FillSession`](crate::FillSession).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillConfig {
    /// Seed for reproducible fills. `None` seeds from the clock.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Maximum substances in one jar.
    #[serde(default = "default_max_substances")]
    pub max_substances: usize,
    /// Ceiling on any one substance's particle count.
    #[serde(default = "default_max_particles")]
    pub max_particles: usize,
    /// Placement settings.
    #[serde(default)]
    pub placement: PlacementConfig,
    /// Cap settings.
    #[serde(default)]
    pub cap: CapConfig,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_substances: default_max_substances(),
            max_particles: default_max_particles(),
            placement: PlacementConfig::default(),
            cap: CapConfig::default(),
        }
    }
}

impl FillConfig {
    /// Session seed, falling back to the current time.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(42)
        })
    }
}

/// A complete jar description: engine settings plus its substances.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Engine settings.
    #[serde(default)]
    pub fill: FillConfig,
    /// Substances, bottom to top.
    #[serde(default)]
    pub substances: Vec<Substance>,
}

impl SessionConfig {
    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, FillError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FillError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, FillError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
