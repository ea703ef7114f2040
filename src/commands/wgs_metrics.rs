use crate::config::Config;
use crate::utils::bam_reader::{
    ensure_coordinate_sorted, header_contigs, BamReaderFactory, BamRecords,
};
use crate::utils::progress_bar_builder::ProgressBarBuilder;
use crate::wgs_metrics::stream::{LocusIterator, RecordFilters};
use crate::wgs_metrics::{
    collect_wgs_metrics, write_json, write_metrics_file, CancellationToken, MetricsReport,
    WgsOptions,
};
use anyhow::{Context, Result};
use bio::io::fasta::IndexedReader;
use log::info;
use std::path::{Path, PathBuf};

/// Command-line values that override the configured defaults when present.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub min_mapping_quality: Option<u8>,
    pub min_base_quality: Option<u8>,
    pub coverage_cap: Option<usize>,
    pub stop_after: Option<u64>,
    pub include_bq_histogram: bool,
    pub threads: Option<usize>,
    pub max_in_flight: Option<usize>,
}

pub fn resolve_options(config: &Config, overrides: &Overrides) -> WgsOptions {
    let mut pipeline = config.pipeline_settings();
    if let Some(threads) = overrides.threads {
        pipeline.worker_threads = threads;
    }
    if let Some(max_in_flight) = overrides.max_in_flight {
        pipeline.max_in_flight_packs = max_in_flight;
    }

    WgsOptions::new(
        overrides.min_mapping_quality.unwrap_or(config.min_mapping_quality),
        overrides.min_base_quality.unwrap_or(config.min_base_quality),
        overrides.coverage_cap.unwrap_or(config.coverage_cap),
        pipeline,
    )
    .with_stop_after(overrides.stop_after)
    .with_bq_histogram(overrides.include_bq_histogram)
}

pub struct Paths {
    pub input: PathBuf,
    pub output: PathBuf,
    pub reference: PathBuf,
    pub json: Option<PathBuf>,
}

pub fn run(
    paths: Paths,
    options: WgsOptions,
    quiet: bool,
    command_line: &str,
) -> Result<MetricsReport> {
    options.validate()?;

    let reader = BamReaderFactory::open(&paths.input, Some(&paths.reference))
        .with_context(|| format!("Failed to open alignments {}", paths.input.display()))?;
    ensure_coordinate_sorted(&reader)
        .with_context(|| format!("Cannot collect metrics from {}", paths.input.display()))?;
    let contigs = header_contigs(&reader);
    info!(
        "Read {} contigs from the header of {}",
        contigs.len(),
        paths.input.display()
    );

    let fasta = IndexedReader::from_file(&paths.reference)
        .with_context(|| format!("Failed to open reference {}", paths.reference.display()))?;

    let mut loci = LocusIterator::new(
        BamRecords::new(reader),
        contigs,
        fasta,
        RecordFilters::new(options.min_mapping_quality),
    );

    let progress = ProgressBarBuilder::new("Collecting WGS metrics...")
        .with_template("{spinner:.green} [{elapsed_precise}] {pos} loci {msg}")
        .with_tick()
        .hidden(quiet)
        .build()?;

    let cancel = CancellationToken::new();
    let report = collect_wgs_metrics(&mut loci, &options, &cancel, &progress)
        .context("Coverage collection failed")?;
    progress.finish_with_message("Coverage collection complete");

    write_outputs(&paths.output, paths.json.as_deref(), &report, command_line)?;
    info!(
        "Genome territory {}, mean coverage {:.2}",
        report.metrics.genome_territory, report.metrics.mean_coverage
    );
    Ok(report)
}

fn write_outputs(
    output: &Path,
    json: Option<&Path>,
    report: &MetricsReport,
    command_line: &str,
) -> Result<()> {
    write_metrics_file(output, report, command_line)
        .with_context(|| format!("Failed to write metrics to {}", output.display()))?;
    info!("Metrics written to {}", output.display());

    if let Some(json) = json {
        write_json(json, report)
            .with_context(|| format!("Failed to write JSON to {}", json.display()))?;
        info!("JSON metrics written to {}", json.display());
    }
    Ok(())
}
