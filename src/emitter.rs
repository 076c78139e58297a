//! Hand-off from placed particles to renderable buffers.
//!
//! Each [`VisualKind`] has one [`ParticleEmitter`] implementation:
//!
//! | Kind | Emitter | Output |
//! |------|---------|--------|
//! | [`VisualKind::Sprite`] | [`SpriteEmitter`] | [`Renderable::Sprites`], flat position/size/colour vertices |
//! | [`VisualKind::InstancedMesh`] | [`MeshInstanceEmitter`] | [`Renderable::Instances`], one model matrix per particle |
//!
//! Both vertex layouts are `#[repr(C)]` and [`Pod`] so they can be uploaded
//! with `bytemuck::cast_slice` without copying.

use crate::placement::ParticleInstance;
use crate::substance::{Substance, VisualKind};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// One point sprite.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    /// World position.
    pub position: [f32; 3],
    /// Point size, the largest axis of the particle scale.
    pub size: f32,
    /// Linear RGB.
    pub color: [f32; 3],
    /// Keeps the record 16-byte aligned.
    pub _pad: f32,
}

/// One mesh instance.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    /// Column-major model matrix.
    pub model: [[f32; 4]; 4],
}

impl From<&ParticleInstance> for InstanceRaw {
    fn from(instance: &ParticleInstance) -> Self {
        Self {
            model: instance.model_matrix().to_cols_array_2d(),
        }
    }
}

/// Output of an emitter, tagged by visual kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Renderable {
    /// Point sprites.
    Sprites(Vec<SpriteVertex>),
    /// Instanced mesh transforms.
    Instances(Vec<InstanceRaw>),
}

impl Renderable {
    /// Number of particles.
    pub fn len(&self) -> usize {
        match self {
            Renderable::Sprites(v) => v.len(),
            Renderable::Instances(v) => v.len(),
        }
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes for a vertex or instance buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Renderable::Sprites(v) => bytemuck::cast_slice(v),
            Renderable::Instances(v) => bytemuck::cast_slice(v),
        }
    }

    /// Kind this renderable was produced for.
    pub fn kind(&self) -> VisualKind {
        match self {
            Renderable::Sprites(_) => VisualKind::Sprite,
            Renderable::Instances(_) => VisualKind::InstancedMesh,
        }
    }
}

/// Turns particle instances into something a renderer can draw.
pub trait ParticleEmitter {
    /// Build render buffers for `instances`, one entry per particle.
    fn emit(&self, instances: &[ParticleInstance]) -> Renderable;
}

/// Emits point sprites with optionally darkened colours.
#[derive(Clone, Debug)]
pub struct SpriteEmitter {
    /// Base RGB colour.
    pub color: Vec3,
    /// Amount of random darkening per sprite, 0 = flat colour.
    pub color_jitter: f32,
    /// Seed for the darkening draws.
    pub seed: u64,
}

impl ParticleEmitter for SpriteEmitter {
    fn emit(&self, instances: &[ParticleInstance]) -> Renderable {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let vertices = instances
            .iter()
            .map(|p| {
                let shade = self.color * rng.gen::<f32>();
                let color = self.color.lerp(shade, self.color_jitter);
                SpriteVertex {
                    position: p.position.to_array(),
                    size: p.scale.max_element(),
                    color: color.to_array(),
                    _pad: 0.0,
                }
            })
            .collect();
        Renderable::Sprites(vertices)
    }
}

/// Emits one model matrix per particle.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeshInstanceEmitter;

impl ParticleEmitter for MeshInstanceEmitter {
    fn emit(&self, instances: &[ParticleInstance]) -> Renderable {
        Renderable::Instances(instances.iter().map(InstanceRaw::from).collect())
    }
}

/// Emitter matching `substance.visual`.
pub fn emitter_for(substance: &Substance, seed: u64) -> Box<dyn ParticleEmitter + Send + Sync> {
    match substance.visual {
        VisualKind::Sprite => Box::new(SpriteEmitter {
            color: substance.color,
            color_jitter: substance.color_jitter,
            seed,
        }),
        VisualKind::InstancedMesh => Box::new(MeshInstanceEmitter),
    }
}
