use rust_htslib::bam;
use rust_htslib::bam::record::Cigar;

/// A gapless stretch where read bases line up with reference bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedBlock {
    /// 0-based offset into the read
    pub read_start: usize,
    /// 0-based reference position
    pub reference_start: u64,
    pub length: usize,
}

/// The parts of an alignment record the locus iterator and filters need.
pub trait AlignmentRecord {
    fn read_name(&self) -> &[u8];
    fn tid(&self) -> i32;
    /// 0-based leftmost aligned position
    fn start(&self) -> i64;
    fn mapping_quality(&self) -> u8;
    fn base_qualities(&self) -> &[u8];
    fn aligned_blocks(&self) -> Vec<AlignedBlock>;

    fn is_unmapped(&self) -> bool;
    fn is_duplicate(&self) -> bool;
    fn is_secondary(&self) -> bool;
    fn is_qc_fail(&self) -> bool;
    fn is_paired(&self) -> bool;
    fn is_mate_unmapped(&self) -> bool;

    fn aligned_length(&self) -> u64 {
        self.aligned_blocks().iter().map(|b| b.length as u64).sum()
    }
}

/// Splits a CIGAR into aligned blocks: `M`, `=` and `X` produce blocks,
/// `I`/`S` consume read bases only, `D`/`N` consume reference bases only.
pub fn blocks_from_cigar<'a>(
    start: i64,
    cigar: impl IntoIterator<Item = &'a Cigar>,
) -> Vec<AlignedBlock> {
    let mut blocks = Vec::new();
    let mut read_pos = 0usize;
    let mut ref_pos = start.max(0) as u64;
    for op in cigar {
        match *op {
            Cigar::Match(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
                blocks.push(AlignedBlock {
                    read_start: read_pos,
                    reference_start: ref_pos,
                    length: len as usize,
                });
                read_pos += len as usize;
                ref_pos += len as u64;
            }
            Cigar::Ins(len) | Cigar::SoftClip(len) => read_pos += len as usize,
            Cigar::Del(len) | Cigar::RefSkip(len) => ref_pos += len as u64,
            Cigar::HardClip(_) | Cigar::Pad(_) => {}
        }
    }
    blocks
}

impl AlignmentRecord for bam::Record {
    fn read_name(&self) -> &[u8] {
        self.qname()
    }

    fn tid(&self) -> i32 {
        bam::Record::tid(self)
    }

    fn start(&self) -> i64 {
        self.pos()
    }

    fn mapping_quality(&self) -> u8 {
        self.mapq()
    }

    fn base_qualities(&self) -> &[u8] {
        self.qual()
    }

    fn aligned_blocks(&self) -> Vec<AlignedBlock> {
        if bam::Record::is_unmapped(self) {
            return Vec::new();
        }
        blocks_from_cigar(self.pos(), self.cigar().iter())
    }

    fn is_unmapped(&self) -> bool {
        bam::Record::is_unmapped(self)
    }

    fn is_duplicate(&self) -> bool {
        bam::Record::is_duplicate(self)
    }

    fn is_secondary(&self) -> bool {
        bam::Record::is_secondary(self)
    }

    fn is_qc_fail(&self) -> bool {
        self.is_quality_check_failed()
    }

    fn is_paired(&self) -> bool {
        bam::Record::is_paired(self)
    }

    fn is_mate_unmapped(&self) -> bool {
        bam::Record::is_mate_unmapped(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_skip_deletions_and_clips() {
        // 2S3M1I2M2D4M
        let cigar = [
            Cigar::SoftClip(2),
            Cigar::Match(3),
            Cigar::Ins(1),
            Cigar::Match(2),
            Cigar::Del(2),
            Cigar::Match(4),
        ];
        let blocks = blocks_from_cigar(100, cigar.iter());
        assert_eq!(
            blocks,
            vec![
                AlignedBlock { read_start: 2, reference_start: 100, length: 3 },
                AlignedBlock { read_start: 6, reference_start: 103, length: 2 },
                AlignedBlock { read_start: 8, reference_start: 107, length: 4 },
            ]
        );
    }

    #[test]
    fn test_equal_and_diff_are_aligned() {
        let cigar = [Cigar::Equal(2), Cigar::Diff(1), Cigar::RefSkip(10), Cigar::Match(1)];
        let blocks = blocks_from_cigar(0, cigar.iter());
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2].reference_start, 13);
        assert_eq!(blocks[2].read_start, 3);
    }
}
