pub mod aggregators;
pub mod cancel;
mod options;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod stream;
pub mod types;

pub use cancel::CancellationToken;
pub use options::{PipelineSettings, WgsOptions, MAX_BASE_QUALITY};
pub use pipeline::{collect_coverage, collect_coverage_with_names, CoverageRun};
pub use report::{write_json, write_metrics_file, MetricsReport};
pub use stats::{finalize, Histogram, WgsMetrics, COVERAGE_THRESHOLDS};
pub use types::{ExclusionCategory, Observation, Pack, Pileup};

use crate::error::Result;
use indicatif::ProgressBar;
use log::info;
use std::time::Instant;
use stream::{AlignmentRecord, FilterTallies, LocusIterator, ReferenceBases};

/// Runs the whole collection over a locus stream and builds the report.
///
/// The record filters' tallies are read only after the stream has been
/// consumed, so they cover every record the iterator saw.
pub fn collect_wgs_metrics<R, I, F>(
    loci: &mut LocusIterator<R, I, F>,
    options: &WgsOptions,
    cancel: &CancellationToken,
    progress: &ProgressBar,
) -> Result<MetricsReport>
where
    R: AlignmentRecord,
    I: Iterator<Item = Result<R>>,
    F: ReferenceBases,
{
    info!(
        "Collecting WGS metrics: MQ>={} Q>={} cap={} stop_after={:?}",
        options.min_mapping_quality,
        options.min_base_quality,
        options.coverage_cap,
        options.stop_after
    );
    info!(
        "Pipeline: {} worker threads, {} packs in flight, queue {}, packs of <= {} loci / {} observations",
        options.pipeline.worker_threads,
        options.pipeline.max_in_flight_packs,
        options.pipeline.queue_capacity,
        options.pipeline.pack_max_loci,
        options.pipeline.pack_max_observations
    );

    let contig_names: Vec<String> = loci.contigs().iter().map(|c| c.name.clone()).collect();
    let started = Instant::now();
    let run = collect_coverage_with_names(loci.by_ref(), &contig_names, options, cancel, progress)?;
    info!(
        "Processed {} loci in {} packs ({:.1}s); {} records used, {} filtered",
        run.loci_processed,
        run.packs_dispatched,
        started.elapsed().as_secs_f64(),
        loci.records_used(),
        loci.filters().filtered_records()
    );

    let started = Instant::now();
    let report = build_report(&run, loci.filter_tallies(), options.include_bq_histogram);
    info!(
        "Derived summary statistics in {:.3}s",
        started.elapsed().as_secs_f64()
    );
    Ok(report)
}

/// Combines drained aggregates with the record-filter tallies.
pub fn build_report(
    run: &CoverageRun,
    tallies: FilterTallies,
    include_bq_histogram: bool,
) -> MetricsReport {
    let mut exclusions = run.exclusions;
    exclusions.set(ExclusionCategory::DUPLICATE, tallies.duplicate);
    exclusions.set(ExclusionCategory::MAPPING_QUALITY, tallies.mapq);
    exclusions.set(ExclusionCategory::UNPAIRED, tallies.unpaired);

    MetricsReport {
        metrics: finalize(&run.depth_histogram, &exclusions),
        depth_histogram: run.depth_histogram.clone(),
        base_quality_histogram: include_bq_histogram.then(|| run.base_quality_histogram.clone()),
    }
}
