// src/utils/bam_reader.rs
use crate::error::{Result, WgsError};
use crate::wgs_metrics::stream::Contig;
use rust_htslib::bam::{self, Read};
use std::path::Path;

pub struct BamReaderFactory;

impl BamReaderFactory {
    pub fn open(bam_path: &Path, reference_path: Option<&Path>) -> Result<bam::Reader> {
        let mut reader = bam::Reader::from_path(bam_path)?;
        if let Some(ref_path) = reference_path {
            if bam_path.extension().map_or(false, |ext| ext == "cram") {
                reader.set_reference(ref_path)?;
            }
        }
        Ok(reader)
    }
}

/// Sequence dictionary from the alignment header, in tid order.
pub fn header_contigs(reader: &bam::Reader) -> Vec<Contig> {
    let header = reader.header();
    (0..header.target_count())
        .map(|tid| {
            Contig::new(
                String::from_utf8_lossy(header.tid2name(tid)).into_owned(),
                header.target_len(tid).unwrap_or(0),
            )
        })
        .collect()
}

/// `SO` value of the `@HD` header line, if one is declared.
pub fn sort_order(header_text: &str) -> Option<&str> {
    header_text
        .lines()
        .find(|line| line.starts_with("@HD"))?
        .split('\t')
        .find_map(|field| field.strip_prefix("SO:"))
}

/// Rejects headers that declare any order other than coordinate. Undeclared,
/// `unknown` and `unsorted` inputs are let through; the locus stream still
/// fails on the first out-of-order record.
pub fn check_sort_order(header_text: &str) -> Result<()> {
    match sort_order(header_text) {
        None | Some("coordinate") | Some("unknown") | Some("unsorted") => Ok(()),
        Some(other) => Err(WgsError::UnsortedInput(format!(
            "header declares SO:{}",
            other
        ))),
    }
}

pub fn ensure_coordinate_sorted(reader: &bam::Reader) -> Result<()> {
    check_sort_order(&String::from_utf8_lossy(reader.header().as_bytes()))
}

/// Owning record iterator over a BAM/CRAM reader.
pub struct BamRecords {
    reader: bam::Reader,
}

impl BamRecords {
    pub fn new(reader: bam::Reader) -> Self {
        Self { reader }
    }
}

impl Iterator for BamRecords {
    type Item = Result<bam::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = bam::Record::new();
        match self.reader.read(&mut record) {
            None => None,
            Some(Ok(())) => Some(Ok(record)),
            Some(Err(e)) => Some(Err(e.into())),
        }
    }
}
