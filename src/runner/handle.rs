// handle.rs
use super::cancel::CancellationToken;
use super::events::{ConversionEvent, ConversionProgress, EventSink};
use super::{JobRunner, RunSummary};
use crate::error::RunnerError;
use crate::request::ConversionRequest;
use std::sync::mpsc::{channel, Receiver};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const WORKER_NAME: &str = "webp-conversion";

/// A batch running on its own thread. The shell polls it from its frame loop
/// and must join it before starting another batch.
pub struct JobHandle {
    cancel: CancellationToken,
    receiver: Receiver<ConversionEvent>,
    progress: ConversionProgress,
    worker: JoinHandle<RunSummary>,
}

impl JobHandle {
    pub fn spawn(request: ConversionRequest) -> Result<Self, RunnerError> {
        Self::spawn_inner(request, None::<Box<dyn EventSink>>)
    }

    /// Like `spawn`, additionally forwarding every event to `extra`, e.g. a
    /// `Logger` feeding a log panel.
    pub fn spawn_with_sink<S: EventSink + 'static>(
        request: ConversionRequest,
        extra: S,
    ) -> Result<Self, RunnerError> {
        Self::spawn_inner(request, Some(extra))
    }

    fn spawn_inner<S: EventSink + 'static>(
        request: ConversionRequest,
        extra: Option<S>,
    ) -> Result<Self, RunnerError> {
        let (sender, receiver) = channel();
        let cancel = CancellationToken::new();
        let progress = ConversionProgress::new(request.len());
        let worker_cancel = cancel.clone();

        let worker = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || match extra {
                Some(extra) => JobRunner::new(request, (sender, extra))
                    .with_cancellation(worker_cancel)
                    .run(),
                None => JobRunner::new(request, sender)
                    .with_cancellation(worker_cancel)
                    .run(),
            })?;

        Ok(Self {
            cancel,
            receiver,
            progress,
            worker,
        })
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drains pending events without blocking and folds them into the
    /// progress snapshot. Returns the drained events in order.
    pub fn poll(&mut self) -> Vec<ConversionEvent> {
        let events: Vec<ConversionEvent> = self.receiver.try_iter().collect();
        for event in &events {
            self.progress.apply(event);
        }
        events
    }

    pub fn progress(&self) -> &ConversionProgress {
        &self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Waits up to `timeout` for the worker to exit. Returns whether it did.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.worker.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        true
    }

    /// Blocks until the run ends. Events not yet polled are folded into the
    /// progress snapshot first, so they are still reachable via `progress`.
    pub fn join(mut self) -> Result<(RunSummary, ConversionProgress), RunnerError> {
        let summary = self.worker.join().map_err(|_| RunnerError::WorkerPanicked)?;
        for event in self.receiver.try_iter() {
            self.progress.apply(&event);
        }
        Ok((summary, self.progress))
    }
}
