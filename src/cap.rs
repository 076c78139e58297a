//! Top-surface reconstruction.
//!
//! A fill band ends at some height inside the container. To make the fill
//! look settled, a flat polygon is rebuilt at that height from the container's
//! own vertices:
//!
//! 1. Vertices are bucketed by height at a fixed decimal precision, which
//!    absorbs floating point noise from the source mesh.
//! 2. The bucket closest to the target height is taken and flattened onto it.
//! 3. The ring is sorted counter-clockwise (seen from +Y) around the
//!    container axis and triangulated, by ear clipping or as a centroid fan.
//! 4. The finished cap sits a small offset below the target so it never
//!    z-fights with the wall it closes.
//!
//! The resulting [`TopSurfacePolygon`] is renderable as-is and can be merged
//! into the container surface to give the sampler a flat target.

use crate::config::{CapConfig, CapTriangulation};
use crate::error::FillError;
use crate::surface::{ContainerSurface, Triangle};
use glam::{Vec2, Vec3};
use std::collections::BTreeMap;

/// Ring vertices closer than this (laterally) are treated as one mesh seam vertex.
const RING_MERGE_DISTANCE: f32 = 1e-4;

/// A triangulated flat cap at a fixed height.
#[derive(Clone, Debug)]
pub struct TopSurfacePolygon {
    height: f32,
    center: Vec3,
    ring: Vec<Vec3>,
    positions: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
    triangulation: CapTriangulation,
}

/// Rebuild a cap at `target_height` from a container's vertex list.
///
/// Fails with [`FillError::DegenerateCap`] when the closest height bucket
/// holds fewer than three distinct vertices.
pub fn build_cap(
    vertices: &[Vec3],
    target_height: f32,
    config: &CapConfig,
) -> Result<TopSurfacePolygon, FillError> {
    let (lo, hi) = vertices.iter().fold(
        (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
        |(lo, hi), v| (lo.min(*v), hi.max(*v)),
    );
    if vertices.is_empty() {
        return Err(FillError::EmptyContainer);
    }
    let center = Vec3::new((lo.x + hi.x) * 0.5, target_height, (lo.z + hi.z) * 0.5);

    let scale = 10f32.powi(config.height_decimals as i32);
    let mut buckets: BTreeMap<i64, Vec<Vec3>> = BTreeMap::new();
    for v in vertices {
        buckets.entry((v.y * scale).round() as i64).or_default().push(*v);
    }

    let mut closest: Option<(f32, &Vec<Vec3>)> = None;
    for (key, bucket) in &buckets {
        let distance = (target_height - *key as f32 / scale).abs();
        if closest.map_or(true, |(best, _)| distance < best) {
            closest = Some((distance, bucket));
        }
    }
    let bucket = closest.map(|(_, b)| b).ok_or(FillError::EmptyContainer)?;

    let mut ring: Vec<(f32, Vec3)> = bucket
        .iter()
        .map(|v| {
            let flat = Vec3::new(v.x, target_height, v.z);
            (ring_angle(center, flat), flat)
        })
        .collect();
    ring.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut ordered: Vec<Vec3> = Vec::with_capacity(ring.len());
    for (_, v) in ring {
        if ordered.last().map_or(true, |last| last.distance(v) > RING_MERGE_DISTANCE) {
            ordered.push(v);
        }
    }
    if ordered.len() > 1 && ordered[0].distance(ordered[ordered.len() - 1]) <= RING_MERGE_DISTANCE {
        ordered.pop();
    }

    if ordered.len() < 3 {
        return Err(FillError::DegenerateCap {
            vertex_count: ordered.len(),
        });
    }

    Ok(TopSurfacePolygon::triangulate(
        ordered,
        center,
        target_height,
        config,
    ))
}

/// Angle around the vertical axis through `center`, increasing counter-clockwise seen from +Y.
#[inline]
pub fn ring_angle(center: Vec3, v: Vec3) -> f32 {
    (-(v.z - center.z)).atan2(v.x - center.x)
}

impl TopSurfacePolygon {
    /// Rebuild a cap from a container surface.
    pub fn from_surface(
        surface: &ContainerSurface,
        target_height: f32,
        config: &CapConfig,
    ) -> Result<Self, FillError> {
        build_cap(surface.vertices(), target_height, config)
    }

    fn triangulate(ring: Vec<Vec3>, center: Vec3, height: f32, config: &CapConfig) -> Self {
        let cap_height = height - config.offset;
        let mut positions: Vec<Vec3> = ring
            .iter()
            .map(|v| Vec3::new(v.x, cap_height, v.z))
            .collect();

        let mut triangulation = config.triangulation;
        let indices = match triangulation {
            CapTriangulation::Polygon => {
                let outline: Vec<Vec2> = ring.iter().map(|v| Vec2::new(v.x, -v.z)).collect();
                match ear_clip(&outline) {
                    Some(indices) => indices,
                    None => {
                        warn!(
                            "Ear clipping failed for a {}-vertex cap ring, using a centroid fan",
                            ring.len()
                        );
                        triangulation = CapTriangulation::Fan;
                        fan(&mut positions, center, cap_height)
                    }
                }
            }
            CapTriangulation::Fan => fan(&mut positions, center, cap_height),
        };

        Self {
            height,
            center,
            ring,
            positions,
            indices,
            triangulation,
        }
    }

    /// Height the cap was requested at. The geometry sits `offset` below it.
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Point on the container axis at the cap height.
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Ordered ring vertices at the requested height.
    pub fn ring(&self) -> &[Vec3] {
        &self.ring
    }

    /// Renderable vertex positions.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Triangle indices into [`positions`](Self::positions), counter-clockwise seen from +Y.
    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    /// Method actually used to triangulate the ring.
    pub fn triangulation(&self) -> CapTriangulation {
        self.triangulation
    }

    /// Cap triangles, normals pointing up.
    pub fn triangles(&self) -> Vec<Triangle> {
        self.indices
            .iter()
            .map(|&[a, b, c]| {
                Triangle::new(
                    self.positions[a as usize],
                    self.positions[b as usize],
                    self.positions[c as usize],
                )
            })
            .collect()
    }

    /// Total cap area.
    pub fn area(&self) -> f32 {
        self.triangles().iter().map(|t| t.area).sum()
    }

    /// The cap on its own as a surface.
    pub fn to_surface(&self) -> ContainerSurface {
        ContainerSurface::from_triangles(self.triangles())
    }

    /// A new surface made of `container` plus this cap.
    pub fn merge_into(&self, container: &ContainerSurface) -> ContainerSurface {
        container.merged_with(&self.triangles())
    }
}

fn fan(positions: &mut Vec<Vec3>, center: Vec3, cap_height: f32) -> Vec<[u32; 3]> {
    let n = positions.len() as u32;
    positions.push(Vec3::new(center.x, cap_height, center.z));
    (0..n).map(|i| [n, i, (i + 1) % n]).collect()
}

#[inline]
fn cross2(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

fn inside_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    cross2(b - a, p - a) > 0.0 && cross2(c - b, p - b) > 0.0 && cross2(a - c, p - c) > 0.0
}

/// Ear clipping for a simple counter-clockwise polygon.
///
/// Returns `None` when no ear can be found, which happens for
/// self-intersecting or fully collinear outlines.
fn ear_clip(outline: &[Vec2]) -> Option<Vec<[u32; 3]>> {
    let mut remaining: Vec<usize> = (0..outline.len()).collect();
    let mut indices = Vec::with_capacity(outline.len().saturating_sub(2));

    while remaining.len() > 3 {
        let m = remaining.len();
        let ear = (0..m).find(|&i| {
            let prev = remaining[(i + m - 1) % m];
            let cur = remaining[i];
            let next = remaining[(i + 1) % m];
            let (a, b, c) = (outline[prev], outline[cur], outline[next]);

            if cross2(b - a, c - b) <= f32::EPSILON {
                return false;
            }

            !remaining
                .iter()
                .filter(|&&k| k != prev && k != cur && k != next)
                .any(|&k| inside_triangle(outline[k], a, b, c))
        })?;

        let prev = remaining[(ear + m - 1) % m];
        let next = remaining[(ear + 1) % m];
        indices.push([prev as u32, remaining[ear] as u32, next as u32]);
        remaining.remove(ear);
    }

    indices.push([
        remaining[0] as u32,
        remaining[1] as u32,
        remaining[2] as u32,
    ]);
    Some(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn circle(n: usize, radius: f32, height: f32) -> Vec<Vec3> {
        (0..n)
            .map(|i| {
                let t = TAU * i as f32 / n as f32;
                Vec3::new(radius * t.cos(), height, radius * t.sin())
            })
            .collect()
    }

    fn shoelace(ring: &[Vec3]) -> f32 {
        let n = ring.len();
        (0..n)
            .map(|i| {
                let a = Vec2::new(ring[i].x, -ring[i].z);
                let b = Vec2::new(ring[(i + 1) % n].x, -ring[(i + 1) % n].z);
                cross2(a, b)
            })
            .sum::<f32>()
            * 0.5
    }

    #[test]
    fn test_picks_closest_bucket_and_flattens() {
        let mut vertices = circle(16, 1.0, 0.0);
        vertices.extend(circle(16, 1.2, 4.8));
        vertices.extend(circle(16, 0.8, 6.0));

        let cap = build_cap(&vertices, 5.0, &CapConfig::default()).unwrap();
        assert_eq!(cap.ring().len(), 16);
        for v in cap.ring() {
            assert_eq!(v.y, 5.0);
            assert!((Vec2::new(v.x, v.z).length() - 1.2).abs() < 1e-5);
        }
    }

    #[test]
    fn test_ring_is_counter_clockwise_from_above() {
        let cap = build_cap(&circle(32, 1.0, 2.0), 2.0, &CapConfig::default()).unwrap();
        let angles: Vec<f32> = cap.ring().iter().map(|v| ring_angle(cap.center(), *v)).collect();
        assert!(angles.windows(2).all(|w| w[1] > w[0]));
        assert!(shoelace(cap.ring()) > 0.0);
        for t in cap.triangles() {
            assert!(t.normal.y > 0.99);
        }
    }

    #[test]
    fn test_fewer_than_three_vertices_is_degenerate() {
        let vertices = vec![Vec3::new(1.0, 5.0, 0.0), Vec3::new(-1.0, 5.0, 0.0)];
        let err = build_cap(&vertices, 5.0, &CapConfig::default()).unwrap_err();
        assert!(matches!(err, FillError::DegenerateCap { vertex_count: 2 }));
    }

    #[test]
    fn test_duplicate_seam_vertices_are_merged() {
        let mut vertices = circle(12, 1.0, 3.0);
        vertices.push(vertices[0]);
        vertices.push(vertices[5]);
        let cap = build_cap(&vertices, 3.0, &CapConfig::default()).unwrap();
        assert_eq!(cap.ring().len(), 12);
    }

    #[test]
    fn test_cap_sits_below_target() {
        let config = CapConfig::default();
        let cap = build_cap(&circle(8, 1.0, 1.0), 1.0, &config).unwrap();
        for p in cap.positions() {
            assert!((p.y - (1.0 - config.offset)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_fan_and_polygon_cover_same_area() {
        let ring = circle(24, 1.0, 0.0);
        let polygon = build_cap(&ring, 0.0, &CapConfig::default()).unwrap();
        let fan_config = CapConfig {
            triangulation: CapTriangulation::Fan,
            ..CapConfig::default()
        };
        let fan = build_cap(&ring, 0.0, &fan_config).unwrap();

        assert_eq!(polygon.indices().len(), 22);
        assert_eq!(fan.indices().len(), 24);
        assert_eq!(fan.positions().len(), 25);
        assert!((polygon.area() - fan.area()).abs() < 1e-4);
        assert!((polygon.area() - shoelace(polygon.ring())).abs() < 1e-4);
    }

    #[test]
    fn test_ear_clipping_handles_concave_ring() {
        // Ten-pointed star, alternating radii
        let ring: Vec<Vec3> = (0..10)
            .map(|i| {
                let t = TAU * i as f32 / 10.0;
                let r = if i % 2 == 0 { 1.0 } else { 0.4 };
                Vec3::new(r * t.cos(), 0.0, r * t.sin())
            })
            .collect();
        let cap = build_cap(&ring, 0.0, &CapConfig::default()).unwrap();
        assert_eq!(cap.triangulation(), CapTriangulation::Polygon);
        assert_eq!(cap.indices().len(), 8);
        assert!((cap.area() - shoelace(cap.ring())).abs() < 1e-4);
    }

    #[test]
    fn test_merge_into_adds_cap_triangles() {
        let surface = ContainerSurface::cylinder(1.0, 0.0, 10.0, 4, 16);
        let cap = TopSurfacePolygon::from_surface(&surface, 5.0, &CapConfig::default()).unwrap();
        let merged = cap.merge_into(&surface);
        assert_eq!(
            merged.triangles().len(),
            surface.triangles().len() + cap.indices().len()
        );
        assert!(merged.total_area() > surface.total_area());
    }

    #[test]
    fn test_cap_as_standalone_surface() {
        let surface = ContainerSurface::cylinder(1.0, 0.0, 10.0, 4, 16);
        let cap = TopSurfacePolygon::from_surface(&surface, 5.0, &CapConfig::default()).unwrap();
        let flat = cap.to_surface();
        assert!((flat.total_area() - cap.area()).abs() < 1e-5);
        assert!(flat.extent().height() < 1e-6);
    }
}
