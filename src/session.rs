//! Fill sessions: one container, its substances and their particle sets.
//!
//! All mutation goes through the session. Editing any substance changes the
//! allocation of every other one (the headroom is taken from the topmost
//! band), so each edit marks every particle set [`Stale`](ParticleState::Stale)
//! and bumps its generation. Particle sets are rebuilt by an explicit
//! [`recompute`](FillSession::recompute), by [`recompute_all`](FillSession::recompute_all)
//! in parallel, or in the background with [`request_recompute`](FillSession::request_recompute).
//!
//! Background results carry the generation they were started with. When they
//! are collected by [`apply_completed`](FillSession::apply_completed) anything
//! older than the set's current generation is dropped, so for rapid slider
//! edits only the last request ever lands.
//!
//! ```ignore
//! let mut session = FillSession::new(ContainerSurface::cylinder(1.0, 0.0, 10.0, 20, 64), FillConfig::default());
//! let salt = session.add_substance(Substance::new("salt", 40.0).with_band(0.0, 30.0))?;
//! let basil = session.add_substance(Substance::new("basil", 40.0).with_band(30.0, 60.0))?;
//! session.recompute_all();
//!
//! session.set_band(basil, 30.0, 70.0)?;
//! session.request_recompute(basil)?;
//! // later, on the render thread
//! session.apply_completed();
//! ```

use crate::allocator::{self, Allocation};
use crate::band::{to_height_range, HeightRange};
use crate::cap::TopSurfacePolygon;
use crate::config::{FillConfig, PlacementConfig, SessionConfig};
use crate::emitter::{emitter_for, Renderable};
use crate::error::FillError;
use crate::placement::{ParticleInstance, Placement, PlacementEngine};
use crate::substance::{Substance, SubstanceId};
use crate::surface::ContainerSurface;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

/// Lifecycle of one substance's particles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParticleState {
    /// Never computed.
    #[default]
    Empty,
    /// A pass is running; previous buffers have been released.
    Sampling,
    /// Instances match the current parameters.
    Placed,
    /// Parameters changed since the instances were placed.
    Stale,
}

/// Particles of one substance.
#[derive(Clone, Debug, Default)]
pub struct ParticleSet {
    state: ParticleState,
    placement: Placement,
    generation: u64,
}

impl ParticleSet {
    /// Current lifecycle state.
    pub fn state(&self) -> ParticleState {
        self.state
    }

    /// Placed particles; empty while `Sampling`.
    pub fn instances(&self) -> &[ParticleInstance] {
        &self.placement.instances
    }

    /// Particles the last pass asked for.
    pub fn requested(&self) -> usize {
        self.placement.requested
    }

    /// Particles the last pass failed to place.
    pub fn shortfall(&self) -> usize {
        self.placement.shortfall()
    }

    /// Surface draws spent by the last pass.
    pub fn attempts(&self) -> usize {
        self.placement.attempts
    }

    /// Incremented on every invalidation and every new pass.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        if self.state != ParticleState::Empty {
            self.state = ParticleState::Stale;
        }
    }

    /// Release the old buffers and enter `Sampling`. Returns the new generation.
    fn begin_pass(&mut self) -> u64 {
        self.placement = Placement::default();
        self.state = ParticleState::Sampling;
        self.generation += 1;
        self.generation
    }

    fn finish_pass(&mut self, placement: Placement) {
        self.placement = placement;
        self.state = ParticleState::Placed;
    }
}

/// Everything one placement pass needs, owned so it can run on another thread.
#[derive(Clone, Debug)]
struct PassJob {
    target: Arc<ContainerSurface>,
    placement: PlacementConfig,
    substance: Substance,
    heights: HeightRange,
    cap_aware: bool,
    count: usize,
    seed: u64,
}

impl PassJob {
    fn run(&self) -> Placement {
        let engine = PlacementEngine::new(&self.target, &self.placement);
        let mut rng = SmallRng::seed_from_u64(self.seed);
        engine.place(&self.substance, self.heights, self.cap_aware, self.count, &mut rng)
    }
}

/// Result of a background pass.
#[derive(Debug)]
struct Completed {
    id: SubstanceId,
    generation: u64,
    placement: Placement,
}

/// A cap and the container merged with it.
#[derive(Debug)]
struct CapSurface {
    cap: TopSurfacePolygon,
    merged: Arc<ContainerSurface>,
}

/// One container being filled with up to `max_substances` substances.
pub struct FillSession {
    surface: Arc<ContainerSurface>,
    config: FillConfig,
    seed: u64,
    next_id: u32,
    ids: Vec<SubstanceId>,
    substances: Vec<Substance>,
    particles: Vec<ParticleSet>,
    allocation: Allocation,
    cap: Option<CapSurface>,
    sender: Sender<Completed>,
    receiver: Receiver<Completed>,
    pending: usize,
}

impl FillSession {
    /// Create an empty session. The seed is resolved once here.
    pub fn new(surface: ContainerSurface, config: FillConfig) -> Self {
        let seed = config.resolve_seed();
        let (sender, receiver) = channel();

        info!(
            "Fill session: {} triangles, height {:.3}..{:.3}, seed {}",
            surface.triangles().len(),
            surface.extent().min,
            surface.extent().max,
            seed
        );

        Self {
            surface: Arc::new(surface),
            config,
            seed,
            next_id: 0,
            ids: Vec::new(),
            substances: Vec::new(),
            particles: Vec::new(),
            allocation: Allocation::default(),
            cap: None,
            sender,
            receiver,
            pending: 0,
        }
    }

    /// Create a session and add every substance of `config`.
    ///
    /// Malformed substances are logged and skipped; the rest are kept.
    pub fn from_config(surface: ContainerSurface, config: SessionConfig) -> Self {
        let mut session = Self::new(surface, config.fill);
        for substance in config.substances {
            let name = substance.name.clone();
            if let Err(e) = session.add_substance(substance) {
                warn!("Rejected substance '{}': {}", name, e);
            }
        }
        session
    }

    /// The container, without cap.
    pub fn surface(&self) -> &ContainerSurface {
        &self.surface
    }

    /// Engine settings the session was created with.
    pub fn config(&self) -> &FillConfig {
        &self.config
    }

    /// Session seed. Substance `id` is placed with `seed + id`.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of substances.
    pub fn len(&self) -> usize {
        self.substances.len()
    }

    /// Whether the session holds no substances.
    pub fn is_empty(&self) -> bool {
        self.substances.is_empty()
    }

    /// Substance ids in insertion order.
    pub fn ids(&self) -> &[SubstanceId] {
        &self.ids
    }

    /// Normalised parameters of a substance.
    pub fn substance(&self, id: SubstanceId) -> Option<&Substance> {
        self.index_of(id).ok().map(|i| &self.substances[i])
    }

    /// Particle set of a substance.
    pub fn particles(&self, id: SubstanceId) -> Option<&ParticleSet> {
        self.index_of(id).ok().map(|i| &self.particles[i])
    }

    /// Current topmost substance.
    pub fn topmost(&self) -> Option<SubstanceId> {
        self.allocation.topmost.map(|i| self.ids[i])
    }

    /// Latest allocation, refreshed on every edit.
    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    /// Cap closing the topmost band, if one could be built.
    pub fn cap(&self) -> Option<&TopSurfacePolygon> {
        self.cap.as_ref().map(|c| &c.cap)
    }

    /// Background passes not yet collected.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Validate and add a substance.
    pub fn add_substance(&mut self, substance: Substance) -> Result<SubstanceId, FillError> {
        if self.substances.len() >= self.config.max_substances {
            return Err(FillError::TooManySubstances {
                max: self.config.max_substances,
            });
        }
        let substance = substance.normalized()?;

        let id = SubstanceId(self.next_id);
        self.next_id += 1;

        debug!("Added substance '{}' as {}", substance.name, id);
        self.ids.push(id);
        self.substances.push(substance);
        self.particles.push(ParticleSet::default());
        self.invalidate_all();

        Ok(id)
    }

    /// Remove a substance and release its particles.
    pub fn remove_substance(&mut self, id: SubstanceId) -> Result<Substance, FillError> {
        let index = self.index_of(id)?;
        self.ids.remove(index);
        self.particles.remove(index);
        let mut substance = self.substances.remove(index);
        substance.is_topmost = false;

        debug!("Removed substance '{}' ({})", substance.name, id);
        self.invalidate_all();

        Ok(substance)
    }

    /// Edit a substance in place.
    ///
    /// The edit is validated as a whole; a rejected edit leaves the substance
    /// and its particles untouched.
    pub fn update_substance<F>(&mut self, id: SubstanceId, edit: F) -> Result<(), FillError>
    where
        F: FnOnce(&mut Substance),
    {
        let index = self.index_of(id)?;
        let mut updated = self.substances[index].clone();
        edit(&mut updated);
        self.substances[index] = updated.normalized()?;
        self.invalidate_all();
        Ok(())
    }

    /// Move a substance's band.
    pub fn set_band(&mut self, id: SubstanceId, start_percent: f32, end_percent: f32) -> Result<(), FillError> {
        self.update_substance(id, |s| {
            s.band.start_percent = start_percent;
            s.band.end_percent = end_percent;
        })
    }

    /// Change a substance's density.
    pub fn set_density(&mut self, id: SubstanceId, density_per_percent: f32) -> Result<(), FillError> {
        self.update_substance(id, |s| s.density_per_percent = density_per_percent)
    }

    /// Rebuild one substance's particles on the calling thread.
    pub fn recompute(&mut self, id: SubstanceId) -> Result<&ParticleSet, FillError> {
        let index = self.index_of(id)?;
        let job = self.job(index);

        self.particles[index].begin_pass();
        let placement = job.run();
        self.particles[index].finish_pass(placement);

        Ok(&self.particles[index])
    }

    /// Rebuild every substance's particles, in parallel.
    ///
    /// The allocation is shared and computed before any pass starts.
    pub fn recompute_all(&mut self) {
        let jobs: Vec<PassJob> = (0..self.substances.len()).map(|i| self.job(i)).collect();
        for set in &mut self.particles {
            set.begin_pass();
        }

        let placements: Vec<Placement> = jobs.par_iter().map(PassJob::run).collect();

        for (set, placement) in self.particles.iter_mut().zip(placements) {
            set.finish_pass(placement);
        }

        info!(
            "Recomputed {} substances, {} particles",
            self.substances.len(),
            self.particles.iter().map(|p| p.instances().len()).sum::<usize>()
        );
    }

    /// Start a background rebuild of one substance.
    ///
    /// The old particles are released immediately. Returns the generation the
    /// result will be accepted for.
    pub fn request_recompute(&mut self, id: SubstanceId) -> Result<u64, FillError> {
        let index = self.index_of(id)?;
        let job = self.job(index);
        let generation = self.particles[index].begin_pass();
        let sender = self.sender.clone();

        self.pending += 1;
        rayon::spawn(move || {
            let placement = job.run();
            // The session may be gone; nothing to hand back to then
            let _ = sender.send(Completed {
                id,
                generation,
                placement,
            });
        });

        Ok(generation)
    }

    /// Install finished background results without blocking.
    ///
    /// Returns the number of results installed; outdated ones are dropped.
    pub fn apply_completed(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(done) = self.receiver.try_recv() {
            if self.install(done) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until every background pass has reported, then install.
    ///
    /// Returns the number of results installed.
    pub fn wait_idle(&mut self) -> usize {
        let mut applied = 0;
        while self.pending > 0 {
            match self.receiver.recv() {
                Ok(done) => {
                    if self.install(done) {
                        applied += 1;
                    }
                }
                Err(_) => break,
            }
        }
        applied
    }

    /// Fill every substance from one shared pool of samples.
    ///
    /// The pool covers the union of all bands and is cut into per-substance
    /// slices by the allocation offsets, so the substances end up mixed rather
    /// than layered. Returns the number of particles placed.
    pub fn fill_mixed(&mut self) -> usize {
        let Some(heights) = self.union_heights() else {
            return 0;
        };

        let (target, cap_aware) = match &self.cap {
            Some(cap) => (Arc::clone(&cap.merged), true),
            None => (Arc::clone(&self.surface), false),
        };
        let engine = PlacementEngine::new(&target, &self.config.placement);
        let mut rng = SmallRng::seed_from_u64(self.seed);

        let (pool, attempts) = engine.sample_band(heights, cap_aware, self.allocation.total, &mut rng);
        let slices = self.allocation.partition(&pool);

        let mut placed = 0;
        for (index, slice) in slices.into_iter().enumerate() {
            let requested = self.allocation.count(index);
            let instances = engine.finish_all(&self.substances[index], heights, slice, &mut rng);
            placed += instances.len();

            if instances.len() < requested {
                warn!(
                    "Substance '{}': {} of {} particles from the shared pool",
                    self.substances[index].name,
                    instances.len(),
                    requested
                );
            }

            let set = &mut self.particles[index];
            set.begin_pass();
            set.finish_pass(Placement {
                instances,
                requested,
                attempts,
            });
        }

        info!(
            "Mixed fill: {} of {} particles after {} attempts",
            placed, self.allocation.total, attempts
        );
        placed
    }

    /// Render buffers for one substance's current particles.
    pub fn emit(&self, id: SubstanceId) -> Result<Renderable, FillError> {
        let index = self.index_of(id)?;
        let emitter = emitter_for(&self.substances[index], self.substance_seed(id));
        Ok(emitter.emit(self.particles[index].instances()))
    }

    fn index_of(&self, id: SubstanceId) -> Result<usize, FillError> {
        self.ids
            .iter()
            .position(|&i| i == id)
            .ok_or(FillError::UnknownSubstance(id))
    }

    fn substance_seed(&self, id: SubstanceId) -> u64 {
        self.seed.wrapping_add(u64::from(id.0))
    }

    /// Recompute topmost flags, allocation and cap, and mark every set stale.
    fn invalidate_all(&mut self) {
        allocator::mark_topmost(&mut self.substances);
        self.allocation = allocator::allocate_limited(&self.substances, self.config.max_particles);
        self.refresh_cap();

        for set in &mut self.particles {
            set.invalidate();
        }
    }

    fn refresh_cap(&mut self) {
        let Some(top) = self.allocation.topmost else {
            self.cap = None;
            return;
        };

        let end = self.substances[top].band.height_range(self.surface.extent()).end;
        if self.cap.as_ref().is_some_and(|c| c.cap.height() == end) {
            return;
        }

        self.cap = match TopSurfacePolygon::from_surface(&self.surface, end, &self.config.cap) {
            Ok(cap) => {
                debug!("Cap at height {:.3} with {} ring vertices", end, cap.ring().len());
                let merged = Arc::new(cap.merge_into(&self.surface));
                Some(CapSurface { cap, merged })
            }
            Err(e) => {
                warn!("{}, filling without a cap", e);
                None
            }
        };
    }

    fn job(&self, index: usize) -> PassJob {
        let substance = &self.substances[index];
        let topmost = self.allocation.topmost == Some(index);

        let (target, cap_aware) = match (&self.cap, topmost) {
            (Some(cap), true) => (Arc::clone(&cap.merged), true),
            _ => (Arc::clone(&self.surface), false),
        };

        PassJob {
            target,
            placement: self.config.placement.clone(),
            substance: substance.clone(),
            heights: substance.band.height_range(self.surface.extent()),
            cap_aware,
            count: self.allocation.count(index),
            seed: self.substance_seed(self.ids[index]),
        }
    }

    fn union_heights(&self) -> Option<HeightRange> {
        let start = self
            .substances
            .iter()
            .map(|s| s.band.start_percent)
            .reduce(f32::min)?;
        let end = self
            .substances
            .iter()
            .map(|s| s.band.end_percent)
            .reduce(f32::max)?;
        Some(to_height_range(self.surface.extent(), start, end))
    }

    fn install(&mut self, done: Completed) -> bool {
        self.pending = self.pending.saturating_sub(1);

        let Ok(index) = self.index_of(done.id) else {
            debug!("Dropped result for removed substance {}", done.id);
            return false;
        };
        let set = &mut self.particles[index];
        if set.generation != done.generation {
            debug!(
                "Dropped outdated result for {} (generation {}, current {})",
                done.id, done.generation, set.generation
            );
            return false;
        }

        set.finish_pass(done.placement);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substance::VisualKind;

    fn jar() -> ContainerSurface {
        ContainerSurface::cylinder(1.0, 0.0, 10.0, 20, 64)
    }

    fn seeded() -> FillConfig {
        FillConfig {
            seed: Some(1234),
            ..FillConfig::default()
        }
    }

    #[test]
    fn test_topmost_and_cap_follow_edits() {
        let mut session = FillSession::new(jar(), seeded());
        let salt = session.add_substance(Substance::new("salt", 10.0).with_band(0.0, 30.0)).unwrap();
        assert_eq!(session.topmost(), Some(salt));
        assert!((session.cap().unwrap().height() - 3.0).abs() < 1e-5);

        let basil = session.add_substance(Substance::new("basil", 10.0).with_band(30.0, 60.0)).unwrap();
        assert_eq!(session.topmost(), Some(basil));
        assert!(session.substance(basil).unwrap().is_topmost);
        assert!(!session.substance(salt).unwrap().is_topmost);
        assert!((session.cap().unwrap().height() - 6.0).abs() < 1e-5);

        session.remove_substance(basil).unwrap();
        assert_eq!(session.topmost(), Some(salt));
        assert!((session.cap().unwrap().height() - 3.0).abs() < 1e-5);

        session.remove_substance(salt).unwrap();
        assert!(session.cap().is_none());
        assert!(session.is_empty());
    }

    #[test]
    fn test_substance_limit() {
        let mut session = FillSession::new(jar(), seeded());
        for i in 0..7 {
            session.add_substance(Substance::new(format!("s{i}"), 1.0)).unwrap();
        }
        let err = session.add_substance(Substance::new("extra", 1.0)).unwrap_err();
        assert!(matches!(err, FillError::TooManySubstances { max: 7 }));
    }

    #[test]
    fn test_malformed_substance_rejected_alone() {
        let config = SessionConfig {
            fill: seeded(),
            substances: vec![
                Substance::new("good", 10.0).with_band(0.0, 20.0),
                Substance::new("bad", 0.0).with_band(20.0, 40.0),
                Substance::new("upside-down", 10.0).with_band(60.0, 40.0),
            ],
        };
        let session = FillSession::from_config(jar(), config);
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_rejected_edit_keeps_substance() {
        let mut session = FillSession::new(jar(), seeded());
        let id = session.add_substance(Substance::new("salt", 10.0).with_band(0.0, 30.0)).unwrap();
        assert!(session.set_density(id, -1.0).is_err());
        assert_eq!(session.substance(id).unwrap().density_per_percent, 10.0);
    }

    #[test]
    fn test_state_machine() {
        let mut session = FillSession::new(jar(), seeded());
        let id = session.add_substance(Substance::new("salt", 10.0).with_band(0.0, 30.0)).unwrap();
        assert_eq!(session.particles(id).unwrap().state(), ParticleState::Empty);

        let set = session.recompute(id).unwrap();
        assert_eq!(set.state(), ParticleState::Placed);
        assert_eq!(set.requested(), 2100);
        let placed = set.instances().len();

        session.set_band(id, 0.0, 40.0).unwrap();
        let set = session.particles(id).unwrap();
        assert_eq!(set.state(), ParticleState::Stale);
        // Old buffers stay visible until the next pass starts
        assert_eq!(set.instances().len(), placed);

        session.request_recompute(id).unwrap();
        let set = session.particles(id).unwrap();
        assert!(set.instances().is_empty());

        session.wait_idle();
        assert_eq!(session.particles(id).unwrap().state(), ParticleState::Placed);
    }

    #[test]
    fn test_recompute_is_reproducible() {
        let mut session = FillSession::new(jar(), seeded());
        let id = session.add_substance(Substance::new("pepper", 20.0).with_band(10.0, 50.0)).unwrap();
        let first = session.recompute(id).unwrap().instances().to_vec();
        let second = session.recompute(id).unwrap().instances().to_vec();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut session = FillSession::new(jar(), seeded());
        let a = session.add_substance(Substance::new("salt", 10.0).with_band(0.0, 30.0)).unwrap();
        let b = session.add_substance(Substance::new("basil", 10.0).with_band(30.0, 60.0)).unwrap();

        session.recompute_all();
        let all_a = session.particles(a).unwrap().instances().to_vec();
        let all_b = session.particles(b).unwrap().instances().to_vec();

        assert_eq!(session.recompute(a).unwrap().instances(), &all_a[..]);
        assert_eq!(session.recompute(b).unwrap().instances(), &all_b[..]);
    }

    #[test]
    fn test_last_request_wins() {
        let mut session = FillSession::new(jar(), seeded());
        let id = session.add_substance(Substance::new("salt", 10.0).with_band(0.0, 30.0)).unwrap();

        session.request_recompute(id).unwrap();
        session.set_band(id, 0.0, 20.0).unwrap();
        session.request_recompute(id).unwrap();
        session.set_band(id, 0.0, 10.0).unwrap();
        let last = session.request_recompute(id).unwrap();

        assert_eq!(session.wait_idle(), 1);
        assert_eq!(session.pending(), 0);
        let set = session.particles(id).unwrap();
        assert_eq!(set.generation(), last);
        assert_eq!(set.requested(), 900);

        let background = set.instances().to_vec();
        assert_eq!(session.recompute(id).unwrap().instances(), &background[..]);
    }

    #[test]
    fn test_result_for_removed_substance_dropped() {
        let mut session = FillSession::new(jar(), seeded());
        let id = session.add_substance(Substance::new("salt", 10.0).with_band(0.0, 30.0)).unwrap();
        session.request_recompute(id).unwrap();
        session.remove_substance(id).unwrap();
        assert_eq!(session.wait_idle(), 0);
    }

    #[test]
    fn test_mixed_fill_partitions_pool() {
        let mut session = FillSession::new(jar(), seeded());
        let a = session.add_substance(Substance::new("salt", 10.0).with_band(0.0, 30.0)).unwrap();
        let b = session.add_substance(Substance::new("basil", 10.0).with_band(30.0, 60.0)).unwrap();

        let placed = session.fill_mixed();
        assert_eq!(placed, session.allocation().total);
        assert_eq!(session.particles(a).unwrap().instances().len(), 120);
        assert_eq!(session.particles(b).unwrap().instances().len(), 120);

        for id in [a, b] {
            for p in session.particles(id).unwrap().instances() {
                assert!(p.position.y > 0.0 && p.position.y <= 6.0 + 0.02 + 1e-5);
            }
        }
    }

    #[test]
    fn test_degenerate_cap_falls_back_to_walls() {
        // A single quad has only two vertices at its top height
        let quad = ContainerSurface::from_indexed(
            vec![
                glam::Vec3::new(0.0, 0.0, 0.0),
                glam::Vec3::new(1.0, 0.0, 0.0),
                glam::Vec3::new(1.0, 1.0, 0.0),
                glam::Vec3::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2], [0, 2, 3]],
        );
        let mut session = FillSession::new(quad, seeded());
        let id = session.add_substance(Substance::new("salt", 10.0).with_band(0.0, 50.0)).unwrap();
        assert!(session.cap().is_none());
        let set = session.recompute(id).unwrap();
        assert_eq!(set.instances().len(), set.requested());
    }

    #[test]
    fn test_emit_uses_visual_kind() {
        let mut session = FillSession::new(jar(), seeded());
        let id = session
            .add_substance(
                Substance::new("clove", 5.0)
                    .with_band(0.0, 20.0)
                    .with_visual(VisualKind::InstancedMesh),
            )
            .unwrap();
        session.recompute(id).unwrap();
        let renderable = session.emit(id).unwrap();
        assert_eq!(renderable.kind(), VisualKind::InstancedMesh);
        assert_eq!(renderable.len(), session.particles(id).unwrap().instances().len());
    }

    #[test]
    fn test_huge_density_is_capped_not_fatal() {
        let config = FillConfig {
            max_particles: 500,
            ..seeded()
        };
        let mut session = FillSession::new(jar(), config);
        let id = session.add_substance(Substance::new("salt", 1.0e30).with_band(0.0, 10.0)).unwrap();
        assert_eq!(session.allocation().count(0), 500);

        let set = session.recompute(id).unwrap();
        assert_eq!(set.requested(), 500);
        assert!(set.instances().len() <= 500);

        session.request_recompute(id).unwrap();
        assert_eq!(session.wait_idle(), 1);
        assert_eq!(session.particles(id).unwrap().requested(), 500);
    }

    #[test]
    fn test_unknown_substance() {
        let mut session = FillSession::new(jar(), seeded());
        assert!(matches!(
            session.recompute(SubstanceId(3)),
            Err(FillError::UnknownSubstance(SubstanceId(3)))
        ));
    }
}
