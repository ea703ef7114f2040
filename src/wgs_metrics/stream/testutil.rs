//! In-memory alignment records for stream tests.

use super::record::{AlignedBlock, AlignmentRecord};

#[derive(Clone, Default)]
pub(crate) struct FakeRecord {
    pub name: String,
    pub tid: i32,
    pub start: i64,
    pub mapq: u8,
    pub quals: Vec<u8>,
    pub blocks: Vec<AlignedBlock>,
    pub unmapped: bool,
    pub duplicate: bool,
    pub secondary: bool,
    pub qc_fail: bool,
    pub paired: bool,
    pub mate_unmapped: bool,
}

impl FakeRecord {
    /// A properly paired, fully matched read.
    pub(crate) fn mapped(name: &str, tid: i32, start: i64, quals: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            tid,
            start,
            mapq: 60,
            quals: quals.to_vec(),
            blocks: vec![AlignedBlock {
                read_start: 0,
                reference_start: start as u64,
                length: quals.len(),
            }],
            paired: true,
            ..Default::default()
        }
    }
}

impl AlignmentRecord for FakeRecord {
    fn read_name(&self) -> &[u8] {
        self.name.as_bytes()
    }
    fn tid(&self) -> i32 {
        self.tid
    }
    fn start(&self) -> i64 {
        self.start
    }
    fn mapping_quality(&self) -> u8 {
        self.mapq
    }
    fn base_qualities(&self) -> &[u8] {
        &self.quals
    }
    fn aligned_blocks(&self) -> Vec<AlignedBlock> {
        self.blocks.clone()
    }
    fn is_unmapped(&self) -> bool {
        self.unmapped
    }
    fn is_duplicate(&self) -> bool {
        self.duplicate
    }
    fn is_secondary(&self) -> bool {
        self.secondary
    }
    fn is_qc_fail(&self) -> bool {
        self.qc_fail
    }
    fn is_paired(&self) -> bool {
        self.paired
    }
    fn is_mate_unmapped(&self) -> bool {
        self.mate_unmapped
    }
}
