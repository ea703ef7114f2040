use std::sync::Arc;

/// One base contributed by one alignment record at a locus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub read_name: Arc<str>,
    pub base_quality: u8,
    pub offset: usize,
}

impl Observation {
    pub fn new(read_name: impl Into<Arc<str>>, base_quality: u8, offset: usize) -> Self {
        Self {
            read_name: read_name.into(),
            base_quality,
            offset,
        }
    }
}

/// A genomic position together with every observation covering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pileup {
    pub sequence_index: usize,
    /// 1-based
    pub position: u64,
    pub observations: Vec<Observation>,
}

impl Pileup {
    pub fn new(sequence_index: usize, position: u64, observations: Vec<Observation>) -> Self {
        Self {
            sequence_index,
            position,
            observations,
        }
    }

    pub fn locus(&self) -> String {
        format!("{}:{}", self.sequence_index, self.position)
    }
}

/// Consecutive pileups handed to a single worker.
#[derive(Debug, Default)]
pub struct Pack {
    pub pileups: Vec<Pileup>,
    pub observations: usize,
}

impl Pack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pileups: Vec::with_capacity(capacity),
            observations: 0,
        }
    }

    pub fn push(&mut self, pileup: Pileup) {
        self.observations += pileup.observations.len();
        self.pileups.push(pileup);
    }

    pub fn len(&self) -> usize {
        self.pileups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pileups.is_empty()
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionCategory {
    DUPLICATE,
    MAPPING_QUALITY,
    UNPAIRED,
    BASE_QUALITY,
    OVERLAP,
    CAPPED,
}

impl ExclusionCategory {
    pub const ALL: [ExclusionCategory; 6] = [
        ExclusionCategory::DUPLICATE,
        ExclusionCategory::MAPPING_QUALITY,
        ExclusionCategory::UNPAIRED,
        ExclusionCategory::BASE_QUALITY,
        ExclusionCategory::OVERLAP,
        ExclusionCategory::CAPPED,
    ];
}
