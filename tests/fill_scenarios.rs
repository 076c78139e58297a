//! End-to-end fill scenarios.
//!
//! These run the full pipeline (band mapping, allocation, cap building,
//! sampling, placement) against simple analytic containers whose expected
//! numbers can be worked out by hand.

use glam::Vec3;
use jarfill::allocator::{allocate, budget, mark_topmost};
use jarfill::cap::build_cap;
use jarfill::prelude::*;
use jarfill::{to_height_range, CapConfig, PlacementConfig, PlacementEngine, SurfaceSampler};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn cylinder() -> ContainerSurface {
    ContainerSurface::cylinder(1.0, 0.0, 10.0, 20, 64)
}

// ============================================================================
// Allocation
// ============================================================================

#[test]
fn test_half_jar_budget_and_containment() {
    let surface = cylinder();
    let heights = to_height_range(surface.extent(), 0.0, 50.0);
    assert_eq!(heights.start, 0.0);
    assert_eq!(heights.end, 5.0);

    let count = budget(100.0, 100.0, 50.0);
    assert_eq!(count, 5000);

    let config = PlacementConfig::default();
    let engine = PlacementEngine::new(&surface, &config);
    let substance = Substance::new("salt", 100.0).with_band(0.0, 50.0);
    let mut rng = SmallRng::seed_from_u64(100);
    let placement = engine.place(&substance, heights, false, count, &mut rng);

    assert_eq!(placement.instances.len(), 5000);
    for p in &placement.instances {
        assert!(p.position.y > 0.0 && p.position.y <= 5.0);
    }
}

#[test]
fn test_two_layer_allocation() {
    let mut substances = vec![
        Substance::new("bottom", 50.0).with_band(0.0, 30.0),
        Substance::new("top", 50.0).with_band(30.0, 60.0),
    ];
    mark_topmost(&mut substances);

    let alloc = allocate(&substances);
    assert_eq!(alloc.percentage_missing, 40.0);
    assert_eq!(alloc.count(0), 600);
    assert_eq!(alloc.count(1), 600);
    assert_eq!(alloc.total, 1200);
}

// ============================================================================
// Cap reconstruction
// ============================================================================

#[test]
fn test_cap_from_noisy_ring() {
    // Rings at 0 and 10 plus one at ~5 with sub-bucket height noise
    let segments = 64;
    let mut positions = Vec::new();
    for (row, height) in [0.0f32, 5.0, 10.0].into_iter().enumerate() {
        for i in 0..segments {
            let theta = std::f32::consts::TAU * i as f32 / segments as f32;
            let noise = if row == 1 { ((i % 5) as f32 - 2.0) * 0.001 } else { 0.0 };
            positions.push(Vec3::new(theta.cos(), height + noise, -theta.sin()));
        }
    }

    let cap = build_cap(&positions, 5.0, &CapConfig::default()).unwrap();
    assert_eq!(cap.ring().len(), 64);
    for v in cap.ring() {
        assert!((v.x.hypot(v.z) - 1.0).abs() < 1e-4);
        assert_eq!(v.y, 5.0);
    }
    // Close to the area of the unit disc
    assert!((cap.area() - std::f32::consts::PI).abs() < 0.01);
}

// ============================================================================
// Sampling and placement
// ============================================================================

#[test]
fn test_narrow_band_terminates_with_shortfall() {
    let surface = cylinder();
    let config = PlacementConfig::default();
    let engine = PlacementEngine::new(&surface, &config);
    let heights = to_height_range(surface.extent(), 50.0, 51.0);

    let mut rng = SmallRng::seed_from_u64(1);
    let placement = engine.place(&Substance::new("saffron", 1.0), heights, false, 1000, &mut rng);

    assert!(placement.attempts <= 10_000);
    assert!(placement.shortfall() > 0);
    assert_eq!(placement.instances.len() + placement.shortfall(), 1000);
}

#[test]
fn test_sphere_density_is_uniform() {
    // Equal-height slabs of a sphere have equal area
    let sphere = ContainerSurface::uv_sphere(1.0, 48, 96);
    let sampler = SurfaceSampler::new(&sphere).unwrap();
    let mut rng = SmallRng::seed_from_u64(42);

    let n = 100_000;
    let mut slabs = [0usize; 4];
    for _ in 0..n {
        let y = sampler.sample(&mut rng).position.y;
        let slab = (((y + 1.0) * 2.0) as usize).min(3);
        slabs[slab] += 1;
    }

    for count in slabs {
        let fraction = count as f32 / n as f32;
        assert!((fraction - 0.25).abs() < 0.015, "slab fraction {}", fraction);
    }
}

// ============================================================================
// Sessions
// ============================================================================

#[test]
fn test_layered_jar() {
    let config = SessionConfig {
        fill: FillConfig {
            seed: Some(9),
            ..FillConfig::default()
        },
        substances: vec![
            Substance::new("salt", 20.0).with_band(0.0, 30.0),
            Substance::new("paprika", 20.0).with_band(30.0, 50.0),
            Substance::new("clove", 5.0)
                .with_band(50.0, 70.0)
                .with_visual(VisualKind::InstancedMesh)
                .with_size(0.2, 0.5),
        ],
    };
    let mut session = FillSession::from_config(cylinder(), config);
    session.recompute_all();

    let ids = session.ids().to_vec();
    let apex_jitter = session.config().placement.apex_jitter;
    assert_eq!(session.topmost(), Some(ids[2]));

    for &id in &ids {
        let substance = session.substance(id).unwrap();
        let heights = substance.band.height_range(session.surface().extent());
        let set = session.particles(id).unwrap();
        assert_eq!(set.state(), ParticleState::Placed);
        assert!(!set.instances().is_empty());

        let top = if substance.is_topmost { heights.end + apex_jitter } else { heights.end };
        for p in set.instances() {
            assert!(p.position.y > heights.start - 1e-5);
            assert!(p.position.y <= top + 1e-5);
        }
    }

    let sprites = session.emit(ids[0]).unwrap();
    assert_eq!(sprites.len(), session.particles(ids[0]).unwrap().instances().len());
    let meshes = session.emit(ids[2]).unwrap();
    assert_eq!(meshes.as_bytes().len(), meshes.len() * 64);
}

#[test]
fn test_slider_drag_keeps_only_last_result() {
    let mut session = FillSession::new(
        cylinder(),
        FillConfig {
            seed: Some(5),
            ..FillConfig::default()
        },
    );
    let id = session.add_substance(Substance::new("sugar", 10.0).with_band(0.0, 10.0)).unwrap();

    for end in [20.0, 30.0, 40.0, 50.0] {
        session.set_band(id, 0.0, end).unwrap();
        session.request_recompute(id).unwrap();
    }
    assert_eq!(session.wait_idle(), 1);

    let set = session.particles(id).unwrap();
    // 10 * 50 * 50 / 100
    assert_eq!(set.requested(), 2500);
    for p in set.instances() {
        assert!(p.position.y <= 5.0 + 0.02 + 1e-5);
    }
}

#[test]
fn test_config_file_round_trip() {
    let path = std::env::temp_dir().join(format!("jarfill-{}.json", std::process::id()));
    let config = SessionConfig {
        fill: FillConfig {
            seed: Some(77),
            ..FillConfig::default()
        },
        substances: vec![Substance::new("anise", 12.0).with_band(0.0, 40.0)],
    };
    std::fs::write(&path, config.to_json().unwrap()).unwrap();

    let loaded = SessionConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(loaded, config);

    let missing = SessionConfig::load(path.with_extension("missing"));
    assert!(matches!(missing, Err(FillError::Io(_))));
}
