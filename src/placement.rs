//! Turning surface samples into particle instances.
//!
//! Per sample:
//!
//! 1. Draw a point from the target surface (the bare container, or the
//!    container merged with its cap for the topmost substance).
//! 2. Clamp its height into the band.
//! 3. In cap-aware passes, points clamped onto the band top become apex
//!    points: pulled toward the axis by `random * random` and jittered in
//!    height, which mounds them in the middle. Other passes discard them.
//! 4. Points clamped onto the band floor are discarded so no seam of
//!    particles forms on the lower boundary.
//! 5. Larger particles are pulled inward, away from the container shell.
//! 6. Scale and rotation are jittered per axis.
//!
//! Sampling stops after `attempt_factor * count` draws; a short result is
//! reported through [`Placement::shortfall`], never retried.

use crate::band::HeightRange;
use crate::config::PlacementConfig;
use crate::sampler::{SampledPoint, SurfaceSampler};
use crate::substance::Substance;
use crate::surface::ContainerSurface;
use glam::{EulerRot, Mat4, Quat, Vec3};
use rand::Rng;

/// Most samples reserved up front; larger requests grow as they fill.
const PREALLOCATE_LIMIT: usize = 1 << 16;

/// One placed particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleInstance {
    /// World position.
    pub position: Vec3,
    /// Orientation.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl ParticleInstance {
    /// Model matrix for instanced rendering.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// A sample that survived band clamping but has not been turned into a particle yet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandSample {
    /// Clamped (and for apex points, biased) position.
    pub position: Vec3,
    /// Surface normal at the sample.
    pub normal: Vec3,
    /// Whether the sample was turned into an apex point.
    pub apex: bool,
}

/// Outcome of one placement pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Placement {
    /// Placed particles.
    pub instances: Vec<ParticleInstance>,
    /// Particles asked for.
    pub requested: usize,
    /// Surface draws spent.
    pub attempts: usize,
}

impl Placement {
    /// Particles missing from the request.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.instances.len())
    }

    /// Whether every requested particle was placed.
    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }
}

/// Places particles of any substance on one target surface.
#[derive(Clone, Copy, Debug)]
pub struct PlacementEngine<'a> {
    surface: &'a ContainerSurface,
    sampler: Option<SurfaceSampler<'a>>,
    config: &'a PlacementConfig,
}

impl<'a> PlacementEngine<'a> {
    /// Create an engine for `surface`. A zero-area surface yields empty placements.
    pub fn new(surface: &'a ContainerSurface, config: &'a PlacementConfig) -> Self {
        let sampler = match SurfaceSampler::new(surface) {
            Ok(sampler) => Some(sampler),
            Err(e) => {
                warn!("{}, particles cannot be placed", e);
                None
            }
        };

        Self {
            surface,
            sampler,
            config,
        }
    }

    /// Place up to `count` particles of `substance` inside `heights`.
    ///
    /// `cap_aware` enables apex biasing and should be set for the topmost
    /// substance when the target surface includes its cap.
    pub fn place<R: Rng + ?Sized>(
        &self,
        substance: &Substance,
        heights: HeightRange,
        cap_aware: bool,
        count: usize,
        rng: &mut R,
    ) -> Placement {
        let (samples, attempts) = self.sample_band(heights, cap_aware, count, rng);
        let instances = self.finish_all(substance, heights, &samples, rng);

        let placement = Placement {
            instances,
            requested: count,
            attempts,
        };

        if !placement.is_complete() {
            warn!(
                "Substance '{}': placed {} of {} particles after {} attempts",
                substance.name,
                placement.instances.len(),
                count,
                attempts
            );
        }

        placement
    }

    /// Steps 1 to 4: draw up to `count` in-band samples within the attempt budget.
    ///
    /// Returns the samples and the number of draws spent.
    pub fn sample_band<R: Rng + ?Sized>(
        &self,
        heights: HeightRange,
        cap_aware: bool,
        count: usize,
        rng: &mut R,
    ) -> (Vec<BandSample>, usize) {
        let Some(sampler) = self.sampler else {
            return (Vec::new(), 0);
        };
        if heights.height() <= 0.0 {
            debug!("Empty band at height {}, nothing to sample", heights.start);
            return (Vec::new(), 0);
        }

        let budget = self.config.attempt_budget(count);
        let mut samples = Vec::with_capacity(count.min(PREALLOCATE_LIMIT));
        let mut attempts = 0;

        while samples.len() < count && attempts < budget {
            attempts += 1;
            if let Some(sample) = self.clamp_to_band(sampler.sample(rng), heights, cap_aware, rng) {
                samples.push(sample);
            }
        }

        (samples, attempts)
    }

    /// Steps 5 and 6 for a batch of samples.
    pub fn finish_all<R: Rng + ?Sized>(
        &self,
        substance: &Substance,
        heights: HeightRange,
        samples: &[BandSample],
        rng: &mut R,
    ) -> Vec<ParticleInstance> {
        samples
            .iter()
            .map(|sample| self.finish(substance, heights, sample, rng))
            .collect()
    }

    fn clamp_to_band<R: Rng + ?Sized>(
        &self,
        point: SampledPoint,
        heights: HeightRange,
        cap_aware: bool,
        rng: &mut R,
    ) -> Option<BandSample> {
        let SampledPoint { mut position, normal } = point;

        if self.config.inner_wall_only {
            let radial = position - self.surface.axis_projection(position);
            if normal.dot(radial) > 0.0 {
                return None;
            }
        }

        position.y = heights.clamp(position.y);

        if position.y == heights.end {
            if !cap_aware {
                return None;
            }
            let axis = self.surface.axis_projection(position);
            let pull = rng.gen::<f32>() * rng.gen::<f32>();
            position = position.lerp(axis, pull);
            position.y = heights.end + self.config.apex_jitter * (2.0 * rng.gen::<f32>() - 1.0);
            return Some(BandSample {
                position,
                normal,
                apex: true,
            });
        }

        if position.y == heights.start {
            return None;
        }

        Some(BandSample {
            position,
            normal,
            apex: false,
        })
    }

    fn finish<R: Rng + ?Sized>(
        &self,
        substance: &Substance,
        heights: HeightRange,
        sample: &BandSample,
        rng: &mut R,
    ) -> ParticleInstance {
        let size = substance.base_size;
        let mut position = sample.position;

        let axis = self.surface.axis_projection(position);
        let lateral = (1.0 - size * self.config.lateral_inset).clamp(0.0, 1.0);
        position = axis + (position - axis) * lateral;

        // Apex points keep their mound height
        if !sample.apex {
            let vertical = (1.0 - size * self.config.vertical_inset).clamp(0.0, 1.0);
            position.y = heights.start + (position.y - heights.start) * vertical;
        }

        let mut jitter = |base: f32, amount: f32| base + (base * rng.gen::<f32>() - base) * amount;

        let scale = Vec3::new(
            jitter(size, substance.size_jitter),
            jitter(size, substance.size_jitter),
            jitter(size, substance.size_jitter),
        );

        let base = substance.base_rotation;
        let angles = Vec3::new(
            jitter(base.x, substance.rotation_jitter),
            jitter(base.y, substance.rotation_jitter),
            jitter(base.z, substance.rotation_jitter),
        );

        ParticleInstance {
            position,
            rotation: Quat::from_euler(EulerRot::XYZ, angles.x, angles.y, angles.z),
            scale,
        }
    }
}
