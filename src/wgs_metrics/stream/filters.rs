//! Record filters that remember how much they threw away.
//!
//! Each filter counts rejected records and the aligned bases in them, so
//! exclusions can be reported as a fraction of all aligned bases.

use super::record::AlignmentRecord;

pub trait RecordPredicate {
    fn rejects<R: AlignmentRecord>(&self, record: &R) -> bool;
}

pub struct DuplicatePredicate;

impl RecordPredicate for DuplicatePredicate {
    fn rejects<R: AlignmentRecord>(&self, record: &R) -> bool {
        record.is_duplicate()
    }
}

pub struct MapQPredicate {
    pub min_mapq: u8,
}

impl RecordPredicate for MapQPredicate {
    fn rejects<R: AlignmentRecord>(&self, record: &R) -> bool {
        record.mapping_quality() < self.min_mapq
    }
}

/// Rejects reads sequenced unpaired and paired reads whose mate did not map.
pub struct PairingPredicate;

impl RecordPredicate for PairingPredicate {
    fn rejects<R: AlignmentRecord>(&self, record: &R) -> bool {
        !record.is_paired() || record.is_mate_unmapped()
    }
}

pub struct CountingFilter<P> {
    predicate: P,
    filtered_records: u64,
    filtered_bases: u64,
}

impl<P: RecordPredicate> CountingFilter<P> {
    pub fn new(predicate: P) -> Self {
        Self {
            predicate,
            filtered_records: 0,
            filtered_bases: 0,
        }
    }

    /// Returns true when the record should be dropped.
    pub fn filter_out<R: AlignmentRecord>(&mut self, record: &R) -> bool {
        let rejected = self.predicate.rejects(record);
        if rejected {
            self.filtered_records += 1;
            self.filtered_bases += record.aligned_length();
        }
        rejected
    }

    pub fn filtered_records(&self) -> u64 {
        self.filtered_records
    }

    pub fn filtered_bases(&self) -> u64 {
        self.filtered_bases
    }
}

/// Bases removed by each record-level filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterTallies {
    pub duplicate: u64,
    pub mapq: u64,
    pub unpaired: u64,
}

/// The mapping-quality, duplicate and pairing filters, applied in that order.
/// A record is charged to the first filter that rejects it.
pub struct RecordFilters {
    mapq: CountingFilter<MapQPredicate>,
    duplicate: CountingFilter<DuplicatePredicate>,
    pairing: CountingFilter<PairingPredicate>,
}

impl RecordFilters {
    pub fn new(min_mapping_quality: u8) -> Self {
        Self {
            mapq: CountingFilter::new(MapQPredicate {
                min_mapq: min_mapping_quality,
            }),
            duplicate: CountingFilter::new(DuplicatePredicate),
            pairing: CountingFilter::new(PairingPredicate),
        }
    }

    pub fn filter_out<R: AlignmentRecord>(&mut self, record: &R) -> bool {
        self.mapq.filter_out(record)
            || self.duplicate.filter_out(record)
            || self.pairing.filter_out(record)
    }

    pub fn tallies(&self) -> FilterTallies {
        FilterTallies {
            duplicate: self.duplicate.filtered_bases(),
            mapq: self.mapq.filtered_bases(),
            unpaired: self.pairing.filtered_bases(),
        }
    }

    pub fn filtered_records(&self) -> u64 {
        self.mapq.filtered_records()
            + self.duplicate.filtered_records()
            + self.pairing.filtered_records()
    }
}
