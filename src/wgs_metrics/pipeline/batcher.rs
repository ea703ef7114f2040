use super::queue::{send_cancellable, Batch};
use crate::error::{Result, WgsError};
use crate::wgs_metrics::cancel::CancellationToken;
use crate::wgs_metrics::types::{Pack, Pileup};
use crossbeam_channel::Sender;
use indicatif::ProgressBar;
use log::debug;

/// Progress is reported every this many loci.
const PROGRESS_INTERVAL: u64 = 10_000_000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatcherSummary {
    pub loci: u64,
    pub packs: u64,
    pub stopped_early: bool,
}

/// Groups consecutive pileups into packs and feeds them to the work queue.
pub struct Batcher<'a> {
    pack_max_loci: usize,
    pack_max_observations: usize,
    stop_after: Option<u64>,
    queue: Sender<Batch>,
    cancel: &'a CancellationToken,
    progress: &'a ProgressBar,
    contig_names: &'a [String],
}

impl<'a> Batcher<'a> {
    pub fn new(
        pack_max_loci: usize,
        pack_max_observations: usize,
        stop_after: Option<u64>,
        queue: Sender<Batch>,
        cancel: &'a CancellationToken,
        progress: &'a ProgressBar,
    ) -> Self {
        Self {
            pack_max_loci,
            pack_max_observations,
            stop_after,
            queue,
            cancel,
            progress,
            contig_names: &[],
        }
    }

    /// Names used for the last locus in progress messages, indexed by sequence index.
    pub fn with_contig_names(mut self, contig_names: &'a [String]) -> Self {
        self.contig_names = contig_names;
        self
    }

    fn locus_label(&self, pileup: &Pileup) -> String {
        match self.contig_names.get(pileup.sequence_index) {
            Some(name) => format!("{}:{}", name, pileup.position),
            None => pileup.locus(),
        }
    }

    /// Drains `pileups` into the queue and finishes with an end-of-stream marker.
    ///
    /// On error or cancellation the queue is dropped without the marker so the
    /// dispatcher can tell an abandoned stream from a finished one.
    pub fn run<I>(self, pileups: I) -> Result<BatcherSummary>
    where
        I: IntoIterator<Item = Result<Pileup>>,
    {
        let mut summary = BatcherSummary::default();
        let mut pack = Pack::with_capacity(self.pack_max_loci);

        for pileup in pileups {
            if self.cancel.is_cancelled() {
                return Err(WgsError::Cancelled);
            }
            let pileup = pileup?;
            summary.loci += 1;
            if summary.loci % PROGRESS_INTERVAL == 0 {
                self.progress.set_position(summary.loci);
                self.progress.set_message(format!(
                    "Processed {} loci, last {}",
                    summary.loci,
                    self.locus_label(&pileup)
                ));
            }
            pack.push(pileup);

            let limit_reached = self.stop_after.map_or(false, |n| summary.loci >= n);
            if pack.len() >= self.pack_max_loci
                || pack.observations >= self.pack_max_observations
                || limit_reached
            {
                self.flush(&mut pack, &mut summary)?;
            }
            if limit_reached {
                summary.stopped_early = true;
                break;
            }
        }

        if !pack.is_empty() {
            self.flush(&mut pack, &mut summary)?;
        }
        send_cancellable(&self.queue, Batch::EndOfStream, self.cancel, "work queue")?;
        self.progress.set_position(summary.loci);
        debug!(
            "Batcher finished: {} loci in {} packs",
            summary.loci, summary.packs
        );
        Ok(summary)
    }

    fn flush(&self, pack: &mut Pack, summary: &mut BatcherSummary) -> Result<()> {
        let full = std::mem::replace(pack, Pack::with_capacity(self.pack_max_loci));
        send_cancellable(&self.queue, Batch::Pack(full), self.cancel, "work queue")?;
        summary.packs += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wgs_metrics::types::Observation;
    use crossbeam_channel::unbounded;

    fn pileups(sizes: &[usize]) -> Vec<Result<Pileup>> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let observations = (0..n).map(|r| Observation::new(format!("r{r}"), 30, 0)).collect();
                Ok(Pileup::new(0, i as u64 + 1, observations))
            })
            .collect()
    }

    fn drain(rx: &crossbeam_channel::Receiver<Batch>) -> (Vec<usize>, bool) {
        let mut sizes = Vec::new();
        let mut terminated = false;
        for batch in rx.try_iter() {
            match batch {
                Batch::Pack(pack) => sizes.push(pack.len()),
                Batch::EndOfStream => terminated = true,
            }
        }
        (sizes, terminated)
    }

    #[test]
    fn test_flushes_on_loci_cap() {
        let (tx, rx) = unbounded();
        let cancel = CancellationToken::new();
        let progress = ProgressBar::hidden();
        let summary = Batcher::new(2, 1000, None, tx, &cancel, &progress)
            .run(pileups(&[1, 1, 1, 1, 1]))
            .unwrap();
        assert_eq!(summary.loci, 5);
        assert_eq!(summary.packs, 3);
        assert_eq!(drain(&rx), (vec![2, 2, 1], true));
    }

    #[test]
    fn test_flushes_on_observation_cap() {
        let (tx, rx) = unbounded();
        let cancel = CancellationToken::new();
        let progress = ProgressBar::hidden();
        Batcher::new(100, 5, None, tx, &cancel, &progress)
            .run(pileups(&[3, 3, 1, 0, 6]))
            .unwrap();
        assert_eq!(drain(&rx), (vec![2, 3], true));
    }

    #[test]
    fn test_stop_after_flushes_short_pack() {
        let (tx, rx) = unbounded();
        let cancel = CancellationToken::new();
        let progress = ProgressBar::hidden();
        let summary = Batcher::new(4, 1000, Some(6), tx, &cancel, &progress)
            .run(pileups(&[1; 10]))
            .unwrap();
        assert!(summary.stopped_early);
        assert_eq!(summary.loci, 6);
        assert_eq!(drain(&rx), (vec![4, 2], true));
    }

    #[test]
    fn test_empty_stream_only_terminates() {
        let (tx, rx) = unbounded();
        let cancel = CancellationToken::new();
        let progress = ProgressBar::hidden();
        let summary = Batcher::new(4, 1000, None, tx, &cancel, &progress)
            .run(Vec::new())
            .unwrap();
        assert_eq!(summary.packs, 0);
        assert_eq!(drain(&rx), (vec![], true));
    }

    #[test]
    fn test_stream_error_skips_end_marker() {
        let (tx, rx) = unbounded();
        let cancel = CancellationToken::new();
        let progress = ProgressBar::hidden();
        let mut input = pileups(&[1, 1]);
        input.push(Err(WgsError::ReferenceNotFound {
            contig: "chr1".to_string(),
        }));
        let result = Batcher::new(1, 1000, None, tx, &cancel, &progress).run(input);
        assert!(matches!(result, Err(WgsError::ReferenceNotFound { .. })));
        assert_eq!(drain(&rx), (vec![1, 1], false));
    }

    #[test]
    fn test_cancelled_before_start() {
        let (tx, rx) = unbounded();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let progress = ProgressBar::hidden();
        let result = Batcher::new(1, 1000, None, tx, &cancel, &progress).run(pileups(&[1]));
        assert!(matches!(result, Err(WgsError::Cancelled)));
        assert_eq!(drain(&rx), (vec![], false));
    }

    #[test]
    fn test_progress_label_uses_contig_names() {
        let (tx, _rx) = unbounded();
        let cancel = CancellationToken::new();
        let progress = ProgressBar::hidden();
        let names = vec!["chr1".to_string(), "chr2".to_string()];
        let batcher = Batcher::new(1, 1000, None, tx, &cancel, &progress).with_contig_names(&names);
        assert_eq!(batcher.locus_label(&Pileup::new(1, 42, Vec::new())), "chr2:42");
        assert_eq!(batcher.locus_label(&Pileup::new(5, 7, Vec::new())), "5:7");
    }
}
