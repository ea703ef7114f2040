//! Lock-free accumulators shared by every worker for the lifetime of a run.
//!
//! Every mutation is a single relaxed `fetch_add` on one cell. Addition is
//! commutative, so the order in which packs are processed never shows up in
//! the totals.

use super::stats::Histogram;
use super::types::ExclusionCategory;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct AtomicHistogram {
    bins: Box<[AtomicU64]>,
}

impl AtomicHistogram {
    /// Creates a histogram with bins `0..len`.
    pub fn new(len: usize) -> Self {
        Self {
            bins: (0..len).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Panics if `bin` is out of range; callers clamp or validate first.
    pub fn increment(&self, bin: usize) {
        self.bins[bin].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, bin: usize) -> u64 {
        self.bins[bin].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Histogram {
        Histogram::from_counts(self.bins.iter().map(|b| b.load(Ordering::Relaxed)).collect())
    }
}

#[derive(Default)]
pub struct ExclusionCounters {
    counts: [AtomicU64; 6],
}

impl ExclusionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, category: ExclusionCategory, bases: u64) {
        if bases > 0 {
            self.counts[category as usize].fetch_add(bases, Ordering::Relaxed);
        }
    }

    pub fn get(&self, category: ExclusionCategory) -> u64 {
        self.counts[category as usize].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ExclusionTotals {
        let mut counts = [0u64; 6];
        for category in ExclusionCategory::ALL {
            counts[category as usize] = self.get(category);
        }
        ExclusionTotals { counts }
    }
}

/// Frozen copy of [`ExclusionCounters`], in bases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExclusionTotals {
    counts: [u64; 6],
}

impl ExclusionTotals {
    pub fn get(&self, category: ExclusionCategory) -> u64 {
        self.counts[category as usize]
    }

    pub fn set(&mut self, category: ExclusionCategory, bases: u64) {
        self.counts[category as usize] = bases;
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// The three aggregators a run mutates.
pub struct Aggregates {
    pub depth: AtomicHistogram,
    pub base_quality: AtomicHistogram,
    pub exclusions: ExclusionCounters,
}

impl Aggregates {
    pub fn new(coverage_cap: usize, max_base_quality: u8) -> Self {
        Self {
            depth: AtomicHistogram::new(coverage_cap + 1),
            base_quality: AtomicHistogram::new(max_base_quality as usize + 1),
            exclusions: ExclusionCounters::new(),
        }
    }
}
