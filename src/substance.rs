//! Substances: one spice, seed or powder poured into a band of the jar.

use crate::band::FillBand;
use crate::error::FillError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session-assigned handle of a substance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubstanceId(pub u32);

impl fmt::Display for SubstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a substance's particles are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualKind {
    /// Camera-facing point sprites.
    #[default]
    Sprite,
    /// One instanced solid mesh per particle.
    InstancedMesh,
}

fn default_base_size() -> f32 {
    0.1
}

fn default_color() -> Vec3 {
    Vec3::ONE
}

/// One fill material and the rules used to scatter it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Substance {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Particles per percent of container height.
    pub density_per_percent: f32,
    /// Sprite or instanced mesh.
    #[serde(default)]
    pub visual: VisualKind,
    /// Particle size before jitter.
    #[serde(default = "default_base_size")]
    pub base_size: f32,
    /// Amount of random size reduction, 0 = uniform sizes.
    #[serde(default)]
    pub size_jitter: f32,
    /// Euler angles (radians, XYZ order) before jitter.
    #[serde(default)]
    pub base_rotation: Vec3,
    /// Amount of random rotation reduction, 0 = identical orientations.
    #[serde(default)]
    pub rotation_jitter: f32,
    /// Base sprite colour (RGB).
    #[serde(default = "default_color")]
    pub color: Vec3,
    /// Amount of random darkening per sprite.
    #[serde(default)]
    pub color_jitter: f32,
    /// Vertical band the substance fills.
    #[serde(default)]
    pub band: FillBand,
    /// Whether this substance reaches highest. Maintained by the session.
    #[serde(skip)]
    pub is_topmost: bool,
}

impl Substance {
    /// Create a sprite substance with an empty band.
    pub fn new(name: impl Into<String>, density_per_percent: f32) -> Self {
        Self {
            name: name.into(),
            density_per_percent,
            visual: VisualKind::Sprite,
            base_size: default_base_size(),
            size_jitter: 0.0,
            base_rotation: Vec3::ZERO,
            rotation_jitter: 0.0,
            color: default_color(),
            color_jitter: 0.0,
            band: FillBand::default(),
            is_topmost: false,
        }
    }

    /// Set the band in percent.
    pub fn with_band(mut self, start_percent: f32, end_percent: f32) -> Self {
        self.band = FillBand::new(start_percent, end_percent);
        self
    }

    /// Set the visual kind.
    pub fn with_visual(mut self, visual: VisualKind) -> Self {
        self.visual = visual;
        self
    }

    /// Set base size and size jitter.
    pub fn with_size(mut self, base_size: f32, jitter: f32) -> Self {
        self.base_size = base_size;
        self.size_jitter = jitter;
        self
    }

    /// Set base rotation (Euler XYZ, radians) and rotation jitter.
    pub fn with_rotation(mut self, base_rotation: Vec3, jitter: f32) -> Self {
        self.base_rotation = base_rotation;
        self.rotation_jitter = jitter;
        self
    }

    /// Set sprite colour and colour jitter.
    pub fn with_color(mut self, color: Vec3, jitter: f32) -> Self {
        self.color = color;
        self.color_jitter = jitter;
        self
    }

    /// Validate and clamp user-provided parameters.
    ///
    /// Percentages and jitters are clamped into range. An inverted band or a
    /// non-positive density rejects the substance.
    pub fn normalized(mut self) -> Result<Self, FillError> {
        self.band = self.band.normalized()?;

        if !self.density_per_percent.is_finite() || self.density_per_percent <= 0.0 {
            return Err(FillError::InvalidDensity {
                density: self.density_per_percent,
            });
        }

        self.size_jitter = clamp_unit(&self.name, "size_jitter", self.size_jitter);
        self.rotation_jitter = clamp_unit(&self.name, "rotation_jitter", self.rotation_jitter);
        self.color_jitter = clamp_unit(&self.name, "color_jitter", self.color_jitter);

        if !self.base_size.is_finite() || self.base_size < 0.0 {
            warn!("Substance '{}' has size {}, using 0", self.name, self.base_size);
            self.base_size = 0.0;
        }

        Ok(self)
    }
}

fn clamp_unit(name: &str, field: &str, value: f32) -> f32 {
    if (0.0..=1.0).contains(&value) {
        return value;
    }
    let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    warn!("Substance '{}' {} {} outside 0..=1, clamping to {}", name, field, value, clamped);
    clamped
}
