//! Concurrent aggregation of a pileup stream.
//!
//! The calling thread runs the [`Batcher`], which feeds packs into a bounded
//! work queue. A dedicated dispatcher thread admits packs to a fixed worker
//! pool under an in-flight permit that is sized independently of the pool.
//! Workers update the shared [`Aggregates`] with atomic increments only.

pub mod batcher;
pub mod depth;
pub mod dispatcher;
pub mod queue;

use crate::error::{Result, WgsError};
use crate::wgs_metrics::aggregators::{Aggregates, ExclusionTotals};
use crate::wgs_metrics::cancel::CancellationToken;
use crate::wgs_metrics::options::{WgsOptions, MAX_BASE_QUALITY};
use crate::wgs_metrics::stats::Histogram;
use crate::wgs_metrics::types::{Pack, Pileup};
pub use batcher::{Batcher, BatcherSummary};
use depth::{process_pack, DepthParams};
use dispatcher::{job_channel, Dispatcher, WorkerPool};
use indicatif::ProgressBar;
use log::debug;
use queue::{work_queue, InFlightPermits};
use std::thread;

/// Everything the workers accumulated, captured after the pool has quiesced.
#[derive(Debug, Clone)]
pub struct CoverageRun {
    pub depth_histogram: Histogram,
    pub base_quality_histogram: Histogram,
    /// Worker-side exclusions only; record-filter tallies are added later.
    pub exclusions: ExclusionTotals,
    pub batcher: BatcherSummary,
    pub packs_dispatched: u64,
    pub loci_processed: u64,
}

/// Streams `pileups` through the batcher, dispatcher and worker pool and
/// returns the drained aggregates.
///
/// Any failure aborts the whole run; partial aggregates are never returned.
pub fn collect_coverage<I>(
    pileups: I,
    options: &WgsOptions,
    cancel: &CancellationToken,
    progress: &ProgressBar,
) -> Result<CoverageRun>
where
    I: IntoIterator<Item = Result<Pileup>>,
{
    collect_coverage_with_names(pileups, &[], options, cancel, progress)
}

/// As [`collect_coverage`], reporting progress by contig name.
pub fn collect_coverage_with_names<I>(
    pileups: I,
    contig_names: &[String],
    options: &WgsOptions,
    cancel: &CancellationToken,
    progress: &ProgressBar,
) -> Result<CoverageRun>
where
    I: IntoIterator<Item = Result<Pileup>>,
{
    options.validate()?;
    let settings = &options.pipeline;
    let abort = cancel.child_token();
    let aggregates = Aggregates::new(options.coverage_cap, MAX_BASE_QUALITY);
    let permits = InFlightPermits::new(settings.max_in_flight_packs);
    let (queue_tx, queue_rx) = work_queue(settings.queue_capacity);
    let (jobs_tx, jobs_rx) = job_channel();
    let params = DepthParams {
        min_base_quality: options.min_base_quality,
        coverage_cap: options.coverage_cap,
    };

    let work = |pack: &Pack| process_pack(pack, params, &aggregates);

    let (batched, dispatched, processed) = thread::scope(|scope| {
        let pool = WorkerPool::spawn(
            scope,
            settings.worker_threads,
            jobs_rx,
            &permits,
            &abort,
            &work,
        );
        let dispatcher = Dispatcher::new(queue_rx, jobs_tx, &permits, &abort);
        let abort_ref = &abort;
        let dispatcher = scope.spawn(move || {
            let result = dispatcher.run();
            if result.is_err() {
                abort_ref.cancel();
            }
            result
        });

        let batched = Batcher::new(
            settings.pack_max_loci,
            settings.pack_max_observations,
            options.stop_after,
            queue_tx,
            &abort,
            progress,
        )
        .with_contig_names(contig_names)
        .run(pileups);
        if batched.is_err() {
            abort.cancel();
        }

        let dispatched = dispatcher
            .join()
            .unwrap_or(Err(WgsError::WorkerPanicked));
        let processed = pool.join();
        (batched, dispatched, processed)
    });

    let (batcher, packs_dispatched, loci_processed) = match (batched, dispatched, processed) {
        (Ok(b), Ok(d), Ok(p)) => (b, d, p),
        (b, d, p) => return Err(pick_error(cancel, [b.err(), p.err(), d.err()])),
    };
    debug_assert_eq!(batcher.loci, loci_processed);
    debug!(
        "Drained {} packs covering {} loci",
        packs_dispatched, loci_processed
    );

    Ok(CoverageRun {
        depth_histogram: aggregates.depth.snapshot(),
        base_quality_histogram: aggregates.base_quality.snapshot(),
        exclusions: aggregates.exclusions.snapshot(),
        batcher,
        packs_dispatched,
        loci_processed,
    })
}

/// Chooses the error that caused the abort over the follow-on cancellations
/// it triggered in the other stages.
fn pick_error<const N: usize>(cancel: &CancellationToken, errors: [Option<WgsError>; N]) -> WgsError {
    let mut fallback = None;
    for error in errors.into_iter().flatten() {
        match error {
            WgsError::Cancelled | WgsError::ChannelClosed(_) => {
                fallback.get_or_insert(error);
            }
            root_cause => return root_cause,
        }
    }
    if cancel.is_cancelled() {
        return WgsError::Cancelled;
    }
    fallback.unwrap_or(WgsError::Cancelled)
}
