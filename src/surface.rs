//! Triangulated container surfaces.
//!
//! A [`ContainerSurface`] is built once per container asset and never mutated.
//! Triangle areas, face normals, the vertical extent and the area table used
//! for weighted sampling are all computed at construction. Merging a cap into
//! the surface produces a new instance.
//!
//! The vertical axis is +Y. Lathe-built surfaces wind their triangles so face
//! normals point away from the axis.

use glam::Vec3;
use rand::distributions::WeightedIndex;
use std::f32::consts::TAU;

/// One surface triangle with its precomputed area and face normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    /// First corner.
    pub a: Vec3,
    /// Second corner.
    pub b: Vec3,
    /// Third corner.
    pub c: Vec3,
    /// Unit face normal following the corner winding, zero for degenerate triangles.
    pub normal: Vec3,
    /// Surface area.
    pub area: f32,
}

impl Triangle {
    /// Build a triangle and compute its area and normal.
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let cross = (b - a).cross(c - a);
        Self {
            a,
            b,
            c,
            normal: cross.normalize_or_zero(),
            area: 0.5 * cross.length(),
        }
    }

    /// Point at barycentric weights `u` for `b` and `v` for `c`.
    #[inline]
    pub fn point_at(&self, u: f32, v: f32) -> Vec3 {
        self.a + (self.b - self.a) * u + (self.c - self.a) * v
    }

    /// Centroid of the three corners.
    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }
}

/// Vertical extent of a surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightExtent {
    /// Lowest vertex height.
    pub min: f32,
    /// Highest vertex height.
    pub max: f32,
}

impl HeightExtent {
    /// Create an extent, swapping the bounds if given in the wrong order.
    pub fn new(min: f32, max: f32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Distance between the lowest and highest point.
    #[inline]
    pub fn height(&self) -> f32 {
        self.max - self.min
    }

    /// Whether `y` lies inside the extent (inclusive).
    #[inline]
    pub fn contains(&self, y: f32) -> bool {
        y >= self.min && y <= self.max
    }
}

/// A closed (or open-topped) triangulated container surface.
#[derive(Clone, Debug)]
pub struct ContainerSurface {
    triangles: Vec<Triangle>,
    vertices: Vec<Vec3>,
    extent: HeightExtent,
    center: Vec3,
    total_area: f32,
    faces: Option<WeightedIndex<f32>>,
}

impl ContainerSurface {
    /// Build a surface from triangles, using their corners as the vertex list.
    pub fn from_triangles<I>(triangles: I) -> Self
    where
        I: IntoIterator<Item = Triangle>,
    {
        let triangles: Vec<Triangle> = triangles.into_iter().collect();
        let vertices = triangles.iter().flat_map(|t| [t.a, t.b, t.c]).collect();
        Self::assemble(triangles, vertices)
    }

    /// Build a surface from an indexed vertex list.
    ///
    /// Faces referencing out-of-range vertices are skipped.
    pub fn from_indexed(positions: Vec<Vec3>, indices: &[[u32; 3]]) -> Self {
        let triangles = indices
            .iter()
            .filter_map(|&[i, j, k]| {
                let a = *positions.get(i as usize)?;
                let b = *positions.get(j as usize)?;
                let c = *positions.get(k as usize)?;
                Some(Triangle::new(a, b, c))
            })
            .collect();
        Self::assemble(triangles, positions)
    }

    /// Surface of revolution around the Y axis.
    ///
    /// `profile` lists `(radius, height)` pairs from bottom to top. Each pair
    /// becomes a ring of `segments` vertices; consecutive rings are joined by
    /// quads. A leading `(0.0, h)` entry closes the bottom.
    pub fn lathe(profile: &[(f32, f32)], segments: u32) -> Self {
        let segments = segments.max(3) as usize;
        let mut positions = Vec::with_capacity(profile.len() * segments);

        for &(radius, height) in profile {
            for i in 0..segments {
                let theta = TAU * (i as f32 / segments as f32);
                // Increasing theta runs counter-clockwise seen from +Y
                positions.push(Vec3::new(radius * theta.cos(), height, -radius * theta.sin()));
            }
        }

        let mut indices = Vec::with_capacity(profile.len().saturating_sub(1) * segments * 2);
        for j in 0..profile.len().saturating_sub(1) {
            for i in 0..segments {
                let bl = (j * segments + i) as u32;
                let br = (j * segments + (i + 1) % segments) as u32;
                let tl = bl + segments as u32;
                let tr = br + segments as u32;

                indices.push([bl, br, tl]);
                indices.push([br, tr, tl]);
            }
        }

        Self::from_indexed(positions, &indices)
    }

    /// Open cylinder wall with `rows` evenly spaced vertex rings above the bottom ring.
    pub fn cylinder(radius: f32, min_height: f32, max_height: f32, rows: u32, segments: u32) -> Self {
        let rows = rows.max(1);
        let profile: Vec<(f32, f32)> = (0..=rows)
            .map(|j| {
                let t = j as f32 / rows as f32;
                (radius, min_height + (max_height - min_height) * t)
            })
            .collect();
        Self::lathe(&profile, segments)
    }

    /// Sphere centred on the origin.
    pub fn uv_sphere(radius: f32, rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let profile: Vec<(f32, f32)> = (0..=rings)
            .map(|j| {
                let phi = std::f32::consts::PI * (j as f32 / rings as f32);
                (radius * phi.sin(), -radius * phi.cos())
            })
            .collect();
        Self::lathe(&profile, segments)
    }

    /// New surface holding these triangles plus `extra`.
    pub fn merged_with(&self, extra: &[Triangle]) -> Self {
        let mut triangles = self.triangles.clone();
        triangles.extend_from_slice(extra);

        let mut vertices = self.vertices.clone();
        vertices.extend(extra.iter().flat_map(|t| [t.a, t.b, t.c]));

        Self::assemble(triangles, vertices)
    }

    fn assemble(triangles: Vec<Triangle>, vertices: Vec<Vec3>) -> Self {
        let (lo, hi) = vertices.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), v| (lo.min(*v), hi.max(*v)),
        );

        let (extent, center) = if vertices.is_empty() {
            (HeightExtent::new(0.0, 0.0), Vec3::ZERO)
        } else {
            (HeightExtent::new(lo.y, hi.y), (lo + hi) * 0.5)
        };

        let total_area = triangles.iter().map(|t| t.area).sum();

        // Fails when every weight is zero (or there are no triangles)
        let faces = WeightedIndex::new(triangles.iter().map(|t| t.area)).ok();

        Self {
            triangles,
            vertices,
            extent,
            center,
            total_area,
            faces,
        }
    }

    /// All triangles of the surface.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// All vertex positions, used to reconstruct caps.
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Cached vertical extent.
    pub fn extent(&self) -> HeightExtent {
        self.extent
    }

    /// Centre of the bounding box. The container's vertical axis passes through it.
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Sum of all triangle areas.
    pub fn total_area(&self) -> f32 {
        self.total_area
    }

    /// Area-weighted face distribution, `None` for zero-area surfaces.
    pub(crate) fn face_distribution(&self) -> Option<&WeightedIndex<f32>> {
        self.faces.as_ref()
    }

    /// Project `point` onto the vertical axis through the centre.
    #[inline]
    pub fn axis_projection(&self, point: Vec3) -> Vec3 {
        Vec3::new(self.center.x, point.y, self.center.z)
    }
}
