//! Summary statistics derived once all packs have drained.

use super::aggregators::ExclusionTotals;
use super::types::ExclusionCategory;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Depth thresholds reported as `PCT_<N>X`.
pub const COVERAGE_THRESHOLDS: [usize; 13] = [5, 10, 15, 20, 25, 30, 40, 50, 60, 70, 80, 90, 100];

/// Dense integer-keyed histogram: `counts[v]` is the number of items with value `v`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Histogram {
    counts: Vec<u64>,
}

impl Histogram {
    pub fn from_counts(counts: Vec<u64>) -> Self {
        Self { counts }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn get(&self, value: usize) -> u64 {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// Number of items recorded.
    pub fn count(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Sum of `value * count` over all bins.
    pub fn sum(&self) -> f64 {
        self.counts
            .iter()
            .enumerate()
            .map(|(v, &c)| v as f64 * c as f64)
            .sum()
    }

    /// Number of items with value `>= min_value`.
    pub fn count_at_or_above(&self, min_value: usize) -> u64 {
        self.counts.iter().skip(min_value).sum()
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        self.sum() / count as f64
    }

    /// Sample standard deviation of the implied distribution.
    pub fn standard_deviation(&self) -> f64 {
        let count = self.count();
        if count < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let squares: f64 = self
            .counts
            .iter()
            .enumerate()
            .map(|(v, &c)| c as f64 * (v as f64 - mean).powi(2))
            .sum();
        (squares / (count - 1) as f64).sqrt()
    }

    pub fn median(&self) -> f64 {
        let bins: Vec<(f64, u64)> = self
            .counts
            .iter()
            .enumerate()
            .map(|(v, &c)| (v as f64, c))
            .collect();
        weighted_median(&bins)
    }

    pub fn median_absolute_deviation(&self) -> f64 {
        let median = self.median();
        let mut deviations: Vec<(f64, u64)> = self
            .counts
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(v, &c)| ((v as f64 - median).abs(), c))
            .collect();
        deviations.sort_by(|a, b| a.0.total_cmp(&b.0));
        weighted_median(&deviations)
    }
}

/// Median of a distribution given as `(value, count)` pairs sorted by value.
/// An even total whose midpoint straddles two values averages them.
fn weighted_median(bins: &[(f64, u64)]) -> f64 {
    let count: u64 = bins.iter().map(|&(_, c)| c).sum();
    if count == 0 {
        return 0.0;
    }
    let (mid_low, mid_high) = if count % 2 == 0 {
        (count / 2, count / 2 + 1)
    } else {
        (count / 2 + 1, count / 2 + 1)
    };

    let mut total = 0u64;
    let mut low = None;
    let mut high = None;
    for &(value, c) in bins {
        total += c;
        if low.is_none() && total >= mid_low {
            low = Some(value);
        }
        if high.is_none() && total >= mid_high {
            high = Some(value);
            break;
        }
    }
    match (low, high) {
        (Some(low), Some(high)) => (low + high) / 2.0,
        _ => 0.0,
    }
}

/// Whole-genome coverage metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct WgsMetrics {
    /// Non-N reference bases over which coverage was evaluated.
    pub genome_territory: u64,
    pub mean_coverage: f64,
    pub sd_coverage: f64,
    pub median_coverage: f64,
    pub mad_coverage: f64,
    pub pct_exc_mapq: f64,
    pub pct_exc_dupe: f64,
    pub pct_exc_unpaired: f64,
    pub pct_exc_baseq: f64,
    pub pct_exc_overlap: f64,
    pub pct_exc_capped: f64,
    pub pct_exc_total: f64,
    /// Fraction of the territory with depth `>= N`, in [`COVERAGE_THRESHOLDS`] order.
    pub pct_at_least: [f64; 13],
}

impl WgsMetrics {
    /// Looks up `PCT_<threshold>X`; `None` for thresholds that are not reported.
    pub fn pct_at_least(&self, threshold: usize) -> Option<f64> {
        COVERAGE_THRESHOLDS
            .iter()
            .position(|&t| t == threshold)
            .map(|i| self.pct_at_least[i])
    }

    /// Column names and formatted values, in output order.
    pub fn columns(&self) -> Vec<(String, String)> {
        let mut columns = vec![
            ("GENOME_TERRITORY".to_string(), self.genome_territory.to_string()),
            ("MEAN_COVERAGE".to_string(), format_fraction(self.mean_coverage)),
            ("SD_COVERAGE".to_string(), format_fraction(self.sd_coverage)),
            ("MEDIAN_COVERAGE".to_string(), format_fraction(self.median_coverage)),
            ("MAD_COVERAGE".to_string(), format_fraction(self.mad_coverage)),
            ("PCT_EXC_MAPQ".to_string(), format_fraction(self.pct_exc_mapq)),
            ("PCT_EXC_DUPE".to_string(), format_fraction(self.pct_exc_dupe)),
            ("PCT_EXC_UNPAIRED".to_string(), format_fraction(self.pct_exc_unpaired)),
            ("PCT_EXC_BASEQ".to_string(), format_fraction(self.pct_exc_baseq)),
            ("PCT_EXC_OVERLAP".to_string(), format_fraction(self.pct_exc_overlap)),
            ("PCT_EXC_CAPPED".to_string(), format_fraction(self.pct_exc_capped)),
            ("PCT_EXC_TOTAL".to_string(), format_fraction(self.pct_exc_total)),
        ];
        for (threshold, pct) in COVERAGE_THRESHOLDS.iter().zip(self.pct_at_least.iter()) {
            columns.push((format!("PCT_{threshold}X"), format_fraction(*pct)));
        }
        columns
    }
}

impl Serialize for WgsMetrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(12 + COVERAGE_THRESHOLDS.len()))?;
        map.serialize_entry("GENOME_TERRITORY", &self.genome_territory)?;
        map.serialize_entry("MEAN_COVERAGE", &self.mean_coverage)?;
        map.serialize_entry("SD_COVERAGE", &self.sd_coverage)?;
        map.serialize_entry("MEDIAN_COVERAGE", &self.median_coverage)?;
        map.serialize_entry("MAD_COVERAGE", &self.mad_coverage)?;
        map.serialize_entry("PCT_EXC_MAPQ", &self.pct_exc_mapq)?;
        map.serialize_entry("PCT_EXC_DUPE", &self.pct_exc_dupe)?;
        map.serialize_entry("PCT_EXC_UNPAIRED", &self.pct_exc_unpaired)?;
        map.serialize_entry("PCT_EXC_BASEQ", &self.pct_exc_baseq)?;
        map.serialize_entry("PCT_EXC_OVERLAP", &self.pct_exc_overlap)?;
        map.serialize_entry("PCT_EXC_CAPPED", &self.pct_exc_capped)?;
        map.serialize_entry("PCT_EXC_TOTAL", &self.pct_exc_total)?;
        for (threshold, pct) in COVERAGE_THRESHOLDS.iter().zip(self.pct_at_least.iter()) {
            map.serialize_entry(&format!("PCT_{threshold}X"), pct)?;
        }
        map.end()
    }
}

fn format_fraction(value: f64) -> String {
    format!("{:.6}", value)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Derives [`WgsMetrics`] from a drained depth histogram and the exclusion
/// totals (worker-side counters plus the record filters' base tallies).
pub fn finalize(depth: &Histogram, exclusions: &ExclusionTotals) -> WgsMetrics {
    let genome_territory = depth.count();
    let total = depth.sum();
    let total_with_excludes = total + exclusions.total() as f64;
    let pct_exc = |category: ExclusionCategory| {
        ratio(exclusions.get(category) as f64, total_with_excludes)
    };

    let mut pct_at_least = [0.0; 13];
    for (slot, &threshold) in pct_at_least.iter_mut().zip(COVERAGE_THRESHOLDS.iter()) {
        *slot = ratio(
            depth.count_at_or_above(threshold) as f64,
            genome_territory as f64,
        );
    }

    WgsMetrics {
        genome_territory,
        mean_coverage: depth.mean(),
        sd_coverage: depth.standard_deviation(),
        median_coverage: depth.median(),
        mad_coverage: depth.median_absolute_deviation(),
        pct_exc_mapq: pct_exc(ExclusionCategory::MAPPING_QUALITY),
        pct_exc_dupe: pct_exc(ExclusionCategory::DUPLICATE),
        pct_exc_unpaired: pct_exc(ExclusionCategory::UNPAIRED),
        pct_exc_baseq: pct_exc(ExclusionCategory::BASE_QUALITY),
        pct_exc_overlap: pct_exc(ExclusionCategory::OVERLAP),
        pct_exc_capped: pct_exc(ExclusionCategory::CAPPED),
        pct_exc_total: ratio(total_with_excludes - total, total_with_excludes),
        pct_at_least,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram(pairs: &[(usize, u64)], len: usize) -> Histogram {
        let mut counts = vec![0; len];
        for &(v, c) in pairs {
            counts[v] = c;
        }
        Histogram::from_counts(counts)
    }

    #[test]
    fn test_empty_histogram_is_all_zero() {
        let h = Histogram::from_counts(vec![0; 11]);
        assert_eq!(h.mean(), 0.0);
        assert_eq!(h.median(), 0.0);
        assert_eq!(h.standard_deviation(), 0.0);
        assert_eq!(h.median_absolute_deviation(), 0.0);

        let metrics = finalize(&h, &ExclusionTotals::default());
        assert_eq!(metrics.genome_territory, 0);
        assert_eq!(metrics.pct_exc_total, 0.0);
        assert!(metrics.pct_at_least.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_mean_sd_median_mad() {
        // values 0, 5, 5, 10
        let h = histogram(&[(0, 1), (5, 2), (10, 1)], 11);
        assert_eq!(h.count(), 4);
        assert_eq!(h.sum(), 20.0);
        assert_eq!(h.mean(), 5.0);
        // squares: 25 + 0 + 0 + 25 = 50; / 3
        assert!((h.standard_deviation() - (50.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(h.median(), 5.0);
        // deviations 5, 0, 0, 5 -> median 2.5
        assert_eq!(h.median_absolute_deviation(), 2.5);
    }

    #[test]
    fn test_median_averages_straddling_bins() {
        let h = histogram(&[(2, 1), (4, 1)], 5);
        assert_eq!(h.median(), 3.0);
        let odd = histogram(&[(1, 1), (2, 1), (9, 1)], 10);
        assert_eq!(odd.median(), 2.0);
    }

    #[test]
    fn test_exclusion_percentages_close() {
        let h = histogram(&[(0, 1), (5, 2), (10, 1)], 11);
        let mut totals = ExclusionTotals::default();
        totals.set(ExclusionCategory::DUPLICATE, 7);
        totals.set(ExclusionCategory::MAPPING_QUALITY, 3);
        totals.set(ExclusionCategory::UNPAIRED, 1);
        totals.set(ExclusionCategory::BASE_QUALITY, 4);
        totals.set(ExclusionCategory::OVERLAP, 3);
        totals.set(ExclusionCategory::CAPPED, 2);
        let m = finalize(&h, &totals);

        assert_eq!(m.pct_exc_dupe, 7.0 / 40.0);
        let sum = m.pct_exc_dupe
            + m.pct_exc_mapq
            + m.pct_exc_unpaired
            + m.pct_exc_baseq
            + m.pct_exc_overlap
            + m.pct_exc_capped;
        assert!((m.pct_exc_total - sum).abs() < 1e-9);
        assert_eq!(m.pct_exc_total, 0.5);
    }

    #[test]
    fn test_pct_at_least() {
        let h = histogram(&[(0, 1), (5, 2), (10, 1)], 11);
        let m = finalize(&h, &ExclusionTotals::default());
        assert_eq!(m.pct_at_least(5), Some(0.75));
        assert_eq!(m.pct_at_least(10), Some(0.25));
        assert_eq!(m.pct_at_least(15), Some(0.0));
        assert_eq!(m.pct_at_least(100), Some(0.0));
        assert_eq!(m.pct_at_least(7), None);
    }

    #[test]
    fn test_columns_order() {
        let h = histogram(&[(3, 2)], 4);
        let m = finalize(&h, &ExclusionTotals::default());
        let names: Vec<String> = m.columns().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names.first().map(String::as_str), Some("GENOME_TERRITORY"));
        assert_eq!(names.last().map(String::as_str), Some("PCT_100X"));
        assert_eq!(names.len(), 12 + COVERAGE_THRESHOLDS.len());
    }
}
