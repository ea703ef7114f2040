use super::filters::{FilterTallies, RecordFilters};
use super::record::AlignmentRecord;
use super::reference::{is_no_call, ReferenceBases};
use crate::error::{Result, WgsError};
use crate::wgs_metrics::types::{Observation, Pileup};
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contig {
    pub name: String,
    pub length: u64,
}

impl Contig {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }
}

struct ContigCursor {
    tid: usize,
    length: u64,
    bases: Vec<u8>,
    /// 0-based position of the next locus to emit
    next_pos: u64,
    /// Observations waiting for their locus, keyed by 0-based position
    pending: BTreeMap<u64, Vec<Observation>>,
}

/// Turns a coordinate-sorted record stream into one pileup per reference
/// position, uncovered positions included and `N` positions skipped.
///
/// Records rejected by the counting filters are tallied and dropped;
/// secondary, QC-failed and unmapped records are dropped without counting.
pub struct LocusIterator<R, I, F>
where
    I: Iterator<Item = Result<R>>,
{
    records: Peekable<I>,
    contigs: Vec<Contig>,
    reference: F,
    filters: RecordFilters,
    cursor: Option<ContigCursor>,
    next_tid: usize,
    finished: bool,
    records_used: u64,
    /// `(tid, start)` of the last record read; unplaced reads sort last
    last_sort_key: Option<(i64, i64)>,
}

impl<R, I, F> LocusIterator<R, I, F>
where
    R: AlignmentRecord,
    I: Iterator<Item = Result<R>>,
    F: ReferenceBases,
{
    pub fn new(records: I, contigs: Vec<Contig>, reference: F, filters: RecordFilters) -> Self {
        Self {
            records: records.peekable(),
            contigs,
            reference,
            filters,
            cursor: None,
            next_tid: 0,
            finished: false,
            records_used: 0,
            last_sort_key: None,
        }
    }

    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    /// Filtered-base counts so far; final once the iterator is exhausted.
    pub fn filter_tallies(&self) -> FilterTallies {
        self.filters.tallies()
    }

    pub fn filters(&self) -> &RecordFilters {
        &self.filters
    }

    pub fn records_used(&self) -> u64 {
        self.records_used
    }

    fn open_next_contig(&mut self) -> Result<bool> {
        let Some(contig) = self.contigs.get(self.next_tid) else {
            return Ok(false);
        };
        let bases = self.reference.contig_bases(&contig.name)?;
        self.cursor = Some(ContigCursor {
            tid: self.next_tid,
            length: contig.length,
            bases,
            next_pos: 0,
            pending: BTreeMap::new(),
        });
        self.next_tid += 1;
        Ok(true)
    }

    /// Consumes every record starting at or before the cursor's next locus.
    fn pull_records(&mut self) -> Result<()> {
        loop {
            let (tid, pos) = match self.cursor.as_ref() {
                Some(c) => (c.tid as i64, c.next_pos as i64),
                None => return Ok(()),
            };
            let take = match self.records.peek() {
                None => return Ok(()),
                Some(Err(_)) => true,
                Some(Ok(record)) => {
                    let record_tid = record.tid() as i64;
                    record.is_unmapped()
                        || record_tid < tid
                        || (record_tid == tid && record.start() <= pos)
                }
            };
            if !take {
                return Ok(());
            }
            match self.records.next() {
                Some(Ok(record)) => {
                    self.check_sorted(&record)?;
                    self.add_record(&record)?
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            }
        }
    }

    /// Fails on a record that sorts before its predecessor. Such a record
    /// would land behind the cursor and its bases would be lost.
    fn check_sorted(&mut self, record: &R) -> Result<()> {
        let tid = if record.tid() < 0 {
            i64::MAX
        } else {
            record.tid() as i64
        };
        let key = (tid, record.start());
        if let Some(last) = self.last_sort_key {
            if key < last {
                return Err(WgsError::UnsortedInput(format!(
                    "read '{}' at {} follows a read at {}",
                    String::from_utf8_lossy(record.read_name()),
                    self.describe(key),
                    self.describe(last)
                )));
            }
        }
        self.last_sort_key = Some(key);
        Ok(())
    }

    fn describe(&self, (tid, start): (i64, i64)) -> String {
        let contig = usize::try_from(tid)
            .ok()
            .and_then(|tid| self.contigs.get(tid))
            .map_or("*", |c| c.name.as_str());
        format!("{}:{}", contig, start + 1)
    }

    fn add_record(&mut self, record: &R) -> Result<()> {
        if self.filters.filter_out(record)
            || record.is_secondary()
            || record.is_qc_fail()
            || record.is_unmapped()
        {
            return Ok(());
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(());
        };
        if record.tid() as i64 != cursor.tid as i64 {
            return Ok(());
        }

        let read_name: Arc<str> = String::from_utf8_lossy(record.read_name()).into();
        let qualities = record.base_qualities();
        for block in record.aligned_blocks() {
            for i in 0..block.length {
                let offset = block.read_start + i;
                let ref_pos = block.reference_start + i as u64;
                if ref_pos < cursor.next_pos || ref_pos >= cursor.length {
                    continue;
                }
                let Some(&quality) = qualities.get(offset) else {
                    let contig = self.contigs.get(cursor.tid).map_or("*", |c| c.name.as_str());
                    return Err(WgsError::MalformedObservation {
                        position: format!("{}:{}", contig, ref_pos + 1),
                        reason: format!(
                            "read '{}' has no base quality at offset {}",
                            read_name, offset
                        ),
                    });
                };
                cursor
                    .pending
                    .entry(ref_pos)
                    .or_default()
                    .push(Observation::new(Arc::clone(&read_name), quality, offset));
            }
        }
        self.records_used += 1;
        Ok(())
    }

    fn advance(&mut self) -> Result<Option<Pileup>> {
        loop {
            if self.cursor.is_none() && !self.open_next_contig()? {
                return Ok(None);
            }
            let at_end = self
                .cursor
                .as_ref()
                .map_or(true, |c| c.next_pos >= c.length);
            if at_end {
                self.cursor = None;
                continue;
            }

            self.pull_records()?;

            let Some(cursor) = self.cursor.as_mut() else {
                continue;
            };
            let pos = cursor.next_pos;
            cursor.next_pos += 1;
            let observations = cursor.pending.remove(&pos).unwrap_or_default();
            let base = cursor.bases.get(pos as usize).copied().unwrap_or(b'N');
            if is_no_call(base) {
                continue;
            }
            return Ok(Some(Pileup::new(cursor.tid, pos + 1, observations)));
        }
    }
}

impl<R, I, F> Iterator for LocusIterator<R, I, F>
where
    R: AlignmentRecord,
    I: Iterator<Item = Result<R>>,
    F: ReferenceBases,
{
    type Item = Result<Pileup>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.advance() {
            Ok(Some(pileup)) => Some(Ok(pileup)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
