//! Particle budgets for several substances sharing one jar.
//!
//! Each substance gets `floor(density * missing * band / 100)` particles,
//! where `missing` is the percentage of the jar left above the topmost
//! substance and `band` is the substance's own band width in percent. Budgets
//! are laid out back to back so a single shared pool of samples can be cut
//! into per-substance slices.

use crate::substance::Substance;
use std::ops::Range;

/// Budget of one substance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocationEntry {
    /// Particles for this substance.
    pub count: usize,
    /// Running total of all substances before this one.
    pub offset: usize,
}

impl AllocationEntry {
    /// Index range of this substance in a shared pool.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.count
    }
}

/// Result of [`allocate`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Allocation {
    /// Percent of the jar above the topmost substance.
    pub percentage_missing: f32,
    /// Index of the topmost substance, `None` when there are no substances.
    pub topmost: Option<usize>,
    /// One entry per substance, same order as the input.
    pub entries: Vec<AllocationEntry>,
    /// Sum of all counts.
    pub total: usize,
}

impl Allocation {
    /// Count for the substance at `index`.
    pub fn count(&self, index: usize) -> usize {
        self.entries.get(index).map_or(0, |e| e.count)
    }

    /// Cut a shared pool into per-substance slices.
    ///
    /// A pool shorter than [`total`](Self::total) yields truncated (possibly
    /// empty) slices for the substances at the end.
    pub fn partition<'a, T>(&self, pool: &'a [T]) -> Vec<&'a [T]> {
        self.entries
            .iter()
            .map(|entry| {
                let start = entry.offset.min(pool.len());
                let end = (entry.offset + entry.count).min(pool.len());
                &pool[start..end]
            })
            .collect()
    }
}

/// Budget of one substance: `floor(density * (missing * band / 100))`, never negative.
pub fn budget(density_per_percent: f32, percentage_missing: f32, band_percent: f32) -> usize {
    let density = f64::from(density_per_percent.max(0.0));
    let missing = f64::from(percentage_missing.max(0.0));
    let band = f64::from(band_percent.max(0.0));
    let raw = density * (missing * band / 100.0);
    if raw.is_finite() {
        raw.floor() as usize
    } else {
        0
    }
}

/// Index of the substance with the greatest band end. The first one wins ties.
pub fn topmost_index(substances: &[Substance]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, s) in substances.iter().enumerate() {
        if best.map_or(true, |(_, end)| s.band.end_percent > end) {
            best = Some((i, s.band.end_percent));
        }
    }
    best.map(|(i, _)| i)
}

/// Recompute the `is_topmost` flags. Returns the topmost index.
pub fn mark_topmost(substances: &mut [Substance]) -> Option<usize> {
    let top = topmost_index(substances);
    for (i, s) in substances.iter_mut().enumerate() {
        s.is_topmost = Some(i) == top;
    }
    top
}

/// Compute every substance's budget.
///
/// The topmost substance is taken from the `is_topmost` flags when one is
/// set, otherwise it is derived from the bands.
pub fn allocate(substances: &[Substance]) -> Allocation {
    allocate_limited(substances, usize::MAX)
}

/// [`allocate`] with every count capped at `max_per_substance`.
pub fn allocate_limited(substances: &[Substance], max_per_substance: usize) -> Allocation {
    let topmost = substances
        .iter()
        .position(|s| s.is_topmost)
        .or_else(|| topmost_index(substances));

    let percentage_missing = topmost
        .map(|i| (100.0 - substances[i].band.end_percent).max(0.0))
        .unwrap_or(0.0);

    let mut entries = Vec::with_capacity(substances.len());
    let mut total = 0usize;

    for s in substances {
        let mut count = budget(s.density_per_percent, percentage_missing, s.band.percent());
        if count > max_per_substance {
            warn!(
                "Substance '{}' asks for {} particles, capping at {}",
                s.name, count, max_per_substance
            );
            count = max_per_substance;
        }

        entries.push(AllocationEntry {
            count,
            offset: total,
        });
        total = total.saturating_add(count);
    }

    debug!(
        "Allocated {} particles over {} substances ({}% headroom)",
        total,
        substances.len(),
        percentage_missing
    );

    Allocation {
        percentage_missing,
        topmost,
        entries,
        total,
    }
}
