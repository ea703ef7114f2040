use crate::error::{Result, WgsError};
use crate::wgs_metrics::cancel::CancellationToken;
use crate::wgs_metrics::types::Pack;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use std::time::Duration;

/// How long a blocked send/recv waits before re-checking for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Item carried by the work queue. The batcher always finishes with
/// `EndOfStream`; a queue that disconnects without one was abandoned.
#[derive(Debug)]
pub enum Batch {
    Pack(Pack),
    EndOfStream,
}

pub fn work_queue(capacity: usize) -> (Sender<Batch>, Receiver<Batch>) {
    bounded(capacity)
}

/// Blocking send that gives up once `cancel` fires.
pub fn send_cancellable<T>(
    tx: &Sender<T>,
    mut item: T,
    cancel: &CancellationToken,
    channel: &str,
) -> Result<()> {
    loop {
        if cancel.is_cancelled() {
            return Err(WgsError::Cancelled);
        }
        match tx.send_timeout(item, CANCEL_POLL) {
            Ok(()) => return Ok(()),
            Err(SendTimeoutError::Timeout(back)) => item = back,
            Err(SendTimeoutError::Disconnected(_)) => {
                return Err(WgsError::ChannelClosed(channel.to_string()))
            }
        }
    }
}

/// Blocking receive that gives up once `cancel` fires.
pub fn recv_cancellable<T>(
    rx: &Receiver<T>,
    cancel: &CancellationToken,
    channel: &str,
) -> Result<T> {
    loop {
        if cancel.is_cancelled() {
            return Err(WgsError::Cancelled);
        }
        match rx.recv_timeout(CANCEL_POLL) {
            Ok(item) => return Ok(item),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(WgsError::ChannelClosed(channel.to_string()))
            }
        }
    }
}

/// Counting permit bounding the number of packs admitted but not yet finished.
///
/// Backed by a bounded channel: acquiring sends a token, releasing takes one back.
pub struct InFlightPermits {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl InFlightPermits {
    pub fn new(limit: usize) -> Self {
        let (tx, rx) = bounded(limit);
        Self { tx, rx }
    }

    pub fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        send_cancellable(&self.tx, (), cancel, "in-flight permits")
    }

    pub fn release(&self) {
        let released = self.rx.try_recv().is_ok();
        debug_assert!(released, "in-flight permit released without a matching acquire");
    }

    pub fn in_flight(&self) -> usize {
        self.tx.len()
    }
}
