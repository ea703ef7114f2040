use crate::error::{Result, WgsError};
use bio::io::fasta::IndexedReader;
use std::collections::HashMap;
use std::fs::File;

/// Source of reference bases, looked up one contig at a time.
pub trait ReferenceBases {
    fn contig_bases(&mut self, contig: &str) -> Result<Vec<u8>>;
}

impl ReferenceBases for IndexedReader<File> {
    fn contig_bases(&mut self, contig: &str) -> Result<Vec<u8>> {
        self.fetch_all(contig)
            .map_err(|_| WgsError::ReferenceNotFound {
                contig: contig.to_string(),
            })?;
        let mut seq = Vec::new();
        self.read(&mut seq)?;
        Ok(seq)
    }
}

impl ReferenceBases for HashMap<String, Vec<u8>> {
    fn contig_bases(&mut self, contig: &str) -> Result<Vec<u8>> {
        self.get(contig)
            .cloned()
            .ok_or_else(|| WgsError::ReferenceNotFound {
                contig: contig.to_string(),
            })
    }
}

pub fn is_no_call(base: u8) -> bool {
    base == b'N' || base == b'n'
}
