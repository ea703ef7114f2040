use crate::error::{Result, WgsError};
use crate::wgs_metrics::aggregators::Aggregates;
use crate::wgs_metrics::options::MAX_BASE_QUALITY;
use crate::wgs_metrics::types::{ExclusionCategory, Pack, Pileup};
use std::collections::HashSet;

#[derive(Clone, Copy, Debug)]
pub struct DepthParams {
    pub min_base_quality: u8,
    pub coverage_cap: usize,
}

pub fn process_pack(pack: &Pack, params: DepthParams, aggregates: &Aggregates) -> Result<()> {
    for pileup in &pack.pileups {
        process_pileup(pileup, params, aggregates)?;
    }
    Ok(())
}

/// Records the post-filter depth of one locus.
///
/// Base-quality filtering happens before an observation's read is registered
/// for overlap detection, so a low-quality first copy of a read does not turn
/// its mate's copy into an overlap.
pub fn process_pileup(pileup: &Pileup, params: DepthParams, aggregates: &Aggregates) -> Result<()> {
    if pileup.observations.is_empty() {
        aggregates.depth.increment(0);
        return Ok(());
    }

    let cap = params.coverage_cap;
    let mut read_names: HashSet<&str> = HashSet::with_capacity(pileup.observations.len());
    let mut low_quality = 0u64;
    let mut overlapping = 0u64;

    for observation in &pileup.observations {
        if observation.base_quality > MAX_BASE_QUALITY {
            return Err(WgsError::MalformedObservation {
                position: pileup.locus(),
                reason: format!(
                    "base quality {} of read '{}' exceeds {}",
                    observation.base_quality, observation.read_name, MAX_BASE_QUALITY
                ),
            });
        }
        if observation.base_quality < params.min_base_quality {
            low_quality += 1;
            continue;
        }
        if !read_names.insert(&*observation.read_name) {
            overlapping += 1;
            continue;
        }
        if read_names.len() <= cap {
            aggregates
                .base_quality
                .increment(observation.base_quality as usize);
        }
    }

    let unique = read_names.len();
    let depth = unique.min(cap);
    aggregates
        .exclusions
        .add(ExclusionCategory::BASE_QUALITY, low_quality);
    aggregates
        .exclusions
        .add(ExclusionCategory::OVERLAP, overlapping);
    aggregates
        .exclusions
        .add(ExclusionCategory::CAPPED, (unique - depth) as u64);
    aggregates.depth.increment(depth);
    Ok(())
}
