//! Area-weighted random sampling of triangulated surfaces.
//!
//! A triangle is picked with probability proportional to its area, then a
//! point is drawn uniformly inside it. Point density per unit area is
//! therefore independent of how finely the surface is triangulated.
//!
//! Band restrictions are not applied here; callers clamp or discard by
//! height so the same sampler works for a bare container and for a
//! container merged with its cap.

use crate::error::FillError;
use crate::surface::ContainerSurface;
use glam::Vec3;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// A point on a surface together with its unit normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampledPoint {
    /// Position on the surface.
    pub position: Vec3,
    /// Face normal of the triangle the point was drawn from.
    pub normal: Vec3,
}

/// Borrowing sampler over a [`ContainerSurface`].
///
/// ```ignore
/// let sampler = SurfaceSampler::new(&surface)?;
/// let mut rng = SmallRng::seed_from_u64(7);
/// let point = sampler.sample(&mut rng);
/// let more: Vec<SampledPoint> = sampler.sample_iter(&mut rng).take(100).collect();
/// ```
#[derive(Clone, Copy, Debug)]
pub struct SurfaceSampler<'a> {
    surface: &'a ContainerSurface,
    faces: &'a WeightedIndex<f32>,
}

impl<'a> SurfaceSampler<'a> {
    /// Create a sampler. Fails with [`FillError::ZeroArea`] when the surface has no area.
    pub fn new(surface: &'a ContainerSurface) -> Result<Self, FillError> {
        let faces = surface.face_distribution().ok_or(FillError::ZeroArea)?;
        Ok(Self { surface, faces })
    }

    /// The surface being sampled.
    pub fn surface(&self) -> &'a ContainerSurface {
        self.surface
    }

    /// Draw one point and its normal.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SampledPoint {
        let triangle = &self.surface.triangles()[self.faces.sample(rng)];

        let mut u: f32 = rng.gen();
        let mut v: f32 = rng.gen();
        // Fold the upper half of the unit square back onto the triangle
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }

        SampledPoint {
            position: triangle.point_at(u, v),
            normal: triangle.normal,
        }
    }
}

/// Lets callers use `sample_iter` and the other [`Distribution`] adaptors.
impl Distribution<SampledPoint> for SurfaceSampler<'_> {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SampledPoint {
        SurfaceSampler::sample(self, rng)
    }
}
