use super::queue::{recv_cancellable, Batch, InFlightPermits};
use crate::error::{Result, WgsError};
use crate::wgs_metrics::cancel::CancellationToken;
use crate::wgs_metrics::types::Pack;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{Scope, ScopedJoinHandle};

/// Pulls packs off the work queue and admits them to the worker pool while
/// holding an in-flight permit for each one.
///
/// Stops only on the batcher's `EndOfStream` marker; an empty queue on its own
/// never ends the run.
pub struct Dispatcher<'a> {
    queue: Receiver<Batch>,
    jobs: Sender<Pack>,
    permits: &'a InFlightPermits,
    cancel: &'a CancellationToken,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        queue: Receiver<Batch>,
        jobs: Sender<Pack>,
        permits: &'a InFlightPermits,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            queue,
            jobs,
            permits,
            cancel,
        }
    }

    /// Returns the number of packs admitted. Dropping `self` closes the job
    /// channel, which lets the workers drain and exit.
    pub fn run(self) -> Result<u64> {
        let mut admitted = 0u64;
        loop {
            let pack = match recv_cancellable(&self.queue, self.cancel, "work queue")? {
                Batch::Pack(pack) => pack,
                Batch::EndOfStream => break,
            };
            self.permits.acquire(self.cancel)?;
            if self.jobs.send(pack).is_err() {
                self.permits.release();
                return Err(WgsError::ChannelClosed("worker jobs".to_string()));
            }
            admitted += 1;
        }
        debug!("Dispatcher reached end of stream after {} packs", admitted);
        Ok(admitted)
    }
}

/// Fixed-size set of worker threads sharing one job channel.
pub struct WorkerPool<'scope> {
    handles: Vec<ScopedJoinHandle<'scope, Result<u64>>>,
}

impl<'scope> WorkerPool<'scope> {
    /// Spawns `threads` workers inside `scope`, each running `work` on the
    /// packs it receives. A worker whose pack fails or panics releases the
    /// pack's permit, cancels `abort` and exits, so the rest of the pipeline
    /// stops admitting work.
    pub fn spawn<'env, W>(
        scope: &'scope Scope<'scope, 'env>,
        threads: usize,
        jobs: Receiver<Pack>,
        permits: &'scope InFlightPermits,
        abort: &'scope CancellationToken,
        work: &'scope W,
    ) -> Self
    where
        W: Fn(&Pack) -> Result<()> + Sync,
    {
        let handles = (0..threads)
            .map(|_| {
                let jobs = jobs.clone();
                scope.spawn(move || {
                    let mut processed = 0u64;
                    while let Ok(pack) = jobs.recv() {
                        if abort.is_cancelled() {
                            permits.release();
                            continue;
                        }
                        let result = panic::catch_unwind(AssertUnwindSafe(|| work(&pack)))
                            .unwrap_or(Err(WgsError::WorkerPanicked));
                        if result.is_err() {
                            abort.cancel();
                        }
                        permits.release();
                        result?;
                        processed += pack.len() as u64;
                    }
                    Ok(processed)
                })
            })
            .collect();
        Self { handles }
    }

    /// Blocks until every worker has exited; returns the loci processed.
    pub fn join(self) -> Result<u64> {
        let mut processed = 0u64;
        let mut first_error = None;
        for handle in self.handles {
            match handle.join() {
                Ok(Ok(n)) => processed += n,
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(_) => {
                    first_error.get_or_insert(WgsError::WorkerPanicked);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(processed),
        }
    }
}

pub fn job_channel() -> (Sender<Pack>, Receiver<Pack>) {
    unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wgs_metrics::aggregators::Aggregates;
    use crate::wgs_metrics::options::MAX_BASE_QUALITY;
    use crate::wgs_metrics::pipeline::depth::{process_pack, DepthParams};
    use crate::wgs_metrics::pipeline::queue::work_queue;
    use crate::wgs_metrics::types::{Observation, Pileup};
    use std::thread;

    fn pack(depths: &[usize]) -> Pack {
        let mut pack = Pack::default();
        for (i, &d) in depths.iter().enumerate() {
            let observations = (0..d).map(|r| Observation::new(format!("r{r}"), 30, 0)).collect();
            pack.push(Pileup::new(0, i as u64 + 1, observations));
        }
        pack
    }

    const PARAMS: DepthParams = DepthParams {
        min_base_quality: 20,
        coverage_cap: 10,
    };

    #[test]
    fn test_dispatch_until_end_of_stream() {
        let (queue_tx, queue_rx) = work_queue(4);
        let (jobs_tx, jobs_rx) = job_channel();
        let permits = InFlightPermits::new(2);
        let cancel = CancellationToken::new();
        let aggregates = Aggregates::new(10, MAX_BASE_QUALITY);
        let work = |pack: &Pack| process_pack(pack, PARAMS, &aggregates);

        let (admitted, processed) = thread::scope(|scope| {
            let pool = WorkerPool::spawn(scope, 3, jobs_rx, &permits, &cancel, &work);
            let dispatcher = Dispatcher::new(queue_rx, jobs_tx, &permits, &cancel);
            let dispatcher = scope.spawn(move || dispatcher.run());
            for depths in [[0usize, 1, 2], [3, 4, 5], [12, 1, 1]] {
                queue_tx.send(Batch::Pack(pack(&depths))).unwrap();
            }
            queue_tx.send(Batch::EndOfStream).unwrap();
            let admitted = dispatcher.join().unwrap().unwrap();
            (admitted, pool.join().unwrap())
        });

        assert_eq!(admitted, 3);
        assert_eq!(processed, 9);
        let depth = aggregates.depth.snapshot();
        assert_eq!(depth.count(), 9);
        assert_eq!(depth.get(1), 3);
        assert_eq!(depth.get(10), 1);
        assert_eq!(permits.in_flight(), 0);
    }

    #[test]
    fn test_disconnect_without_marker_is_an_error() {
        let (queue_tx, queue_rx) = work_queue(4);
        let (jobs_tx, _jobs_rx) = job_channel();
        let permits = InFlightPermits::new(2);
        let cancel = CancellationToken::new();
        queue_tx.send(Batch::Pack(pack(&[1]))).unwrap();
        drop(queue_tx);
        let result = Dispatcher::new(queue_rx, jobs_tx, &permits, &cancel).run();
        assert!(matches!(result, Err(WgsError::ChannelClosed(_))));
    }

    #[test]
    fn test_worker_failure_cancels_abort_token() {
        let (jobs_tx, jobs_rx) = job_channel();
        let permits = InFlightPermits::new(4);
        let abort = CancellationToken::new();
        let aggregates = Aggregates::new(10, MAX_BASE_QUALITY);

        let mut bad = Pack::default();
        bad.push(Pileup::new(0, 1, vec![Observation::new("r", 200, 0)]));

        let work = |pack: &Pack| process_pack(pack, PARAMS, &aggregates);

        let result = thread::scope(|scope| {
            let pool = WorkerPool::spawn(scope, 2, jobs_rx, &permits, &abort, &work);
            permits.acquire(&CancellationToken::new()).unwrap();
            jobs_tx.send(bad).unwrap();
            drop(jobs_tx);
            pool.join()
        });

        assert!(matches!(result, Err(WgsError::MalformedObservation { .. })));
        assert!(abort.is_cancelled());
        assert_eq!(permits.in_flight(), 0);
    }

    #[test]
    fn test_worker_panic_releases_permit_and_aborts() {
        let (jobs_tx, jobs_rx) = job_channel();
        let permits = InFlightPermits::new(4);
        let abort = CancellationToken::new();
        let work = |pack: &Pack| -> Result<()> {
            if pack.len() == 2 {
                panic!("pack handler failed");
            }
            Ok(())
        };

        let result = thread::scope(|scope| {
            let pool = WorkerPool::spawn(scope, 1, jobs_rx, &permits, &abort, &work);
            permits.acquire(&CancellationToken::new()).unwrap();
            jobs_tx.send(pack(&[1, 1])).unwrap();
            drop(jobs_tx);
            pool.join()
        });

        assert!(matches!(result, Err(WgsError::WorkerPanicked)));
        assert!(abort.is_cancelled());
        assert_eq!(permits.in_flight(), 0);
    }

    #[test]
    fn test_dispatcher_stops_after_worker_panic() {
        let (queue_tx, queue_rx) = work_queue(8);
        let (jobs_tx, jobs_rx) = job_channel();
        let permits = InFlightPermits::new(1);
        let abort = CancellationToken::new();
        let work = |_: &Pack| -> Result<()> { panic!("pack handler failed") };

        for _ in 0..5 {
            queue_tx.send(Batch::Pack(pack(&[1]))).unwrap();
        }
        queue_tx.send(Batch::EndOfStream).unwrap();

        let (dispatched, processed) = thread::scope(|scope| {
            let pool = WorkerPool::spawn(scope, 1, jobs_rx, &permits, &abort, &work);
            let dispatcher = Dispatcher::new(queue_rx, jobs_tx, &permits, &abort);
            let dispatched = scope.spawn(move || dispatcher.run()).join().unwrap();
            (dispatched, pool.join())
        });

        assert!(matches!(
            dispatched,
            Err(WgsError::Cancelled) | Err(WgsError::ChannelClosed(_))
        ));
        assert!(matches!(processed, Err(WgsError::WorkerPanicked)));
    }
}
