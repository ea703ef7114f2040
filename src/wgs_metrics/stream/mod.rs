//! The alignment-side collaborators: record filters, reference access and the
//! locus iterator that turns sorted records into an ordered pileup stream.

pub mod filters;
pub mod locus_iterator;
pub mod record;
pub mod reference;
#[cfg(test)]
pub(crate) mod testutil;

pub use filters::{CountingFilter, FilterTallies, RecordFilters};
pub use locus_iterator::{Contig, LocusIterator};
pub use record::{AlignedBlock, AlignmentRecord};
pub use reference::ReferenceBases;
