// runner.rs
pub mod cancel;
pub mod events;
pub mod handle;
pub mod image_processing;

use crate::error::ConversionError;
use crate::request::ConversionRequest;
use crate::utils::log_memory_usage;
use cancel::CancellationToken;
use events::{ConversionEvent, ConversionOutcome, EventSink, FileReport};
use image_processing::ConvertedImage;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;

pub const NO_IMAGES_MESSAGE: &str = "no images selected";
pub const CANCELLED_MESSAGE: &str = "cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    Completed,
    Cancelled,
}

/// Final tally of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    succeeded: usize,
    failed: usize,
    reason: TerminationReason,
}

impl RunSummary {
    fn new(succeeded: usize, failed: usize, reason: TerminationReason) -> Self {
        Self { succeeded, failed, reason }
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn reason(&self) -> TerminationReason {
        self.reason
    }

    pub fn was_cancelled(&self) -> bool {
        self.reason == TerminationReason::Cancelled
    }
}

/// Executes one `ConversionRequest`. `run` consumes the runner, so a batch
/// can only be started once per instance.
pub struct JobRunner<S: EventSink> {
    request: ConversionRequest,
    sink: S,
    cancel: CancellationToken,
}

impl<S: EventSink> JobRunner<S> {
    pub fn new(request: ConversionRequest, sink: S) -> Self {
        Self {
            request,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn run(self) -> RunSummary {
        let JobRunner { request, sink, cancel } = self;
        let total_files = request.len();
        let start_time = Instant::now();
        log::info!("Starting conversion of {} file(s)", total_files);
        log_memory_usage("Before conversion");

        if request.is_empty() {
            log::warn!("No input files selected");
            sink.emit(ConversionEvent::Error(NO_IMAGES_MESSAGE.to_string()));
            return finish(&sink, RunSummary::new(0, 0, TerminationReason::Completed));
        }

        let output_directory = request.options().output_directory();
        if let Err(e) = std::fs::create_dir_all(output_directory) {
            let message = format!(
                "failed to create output directory {}: {}",
                output_directory.display(),
                e
            );
            log::error!("{}", message);
            sink.emit(ConversionEvent::Error(message));
            return finish(&sink, RunSummary::new(0, total_files, TerminationReason::Completed));
        }

        let mut succeeded = 0;
        let mut failed = 0;
        let mut reason = TerminationReason::Completed;

        for (index, input_path) in request.input_files().iter().enumerate() {
            if cancel.is_cancelled() {
                log::info!("Conversion cancelled after {} of {} file(s)", index, total_files);
                sink.emit(ConversionEvent::Status(CANCELLED_MESSAGE.to_string()));
                reason = TerminationReason::Cancelled;
                break;
            }

            let name = display_name(input_path);
            sink.emit(ConversionEvent::Progress(percent_started(index, total_files)));
            let started = format!("Processing {} ({}/{})", name, index + 1, total_files);
            sink.emit(ConversionEvent::Status(started));

            let original_size = std::fs::metadata(input_path).map(|m| m.len()).ok();
            let report = match convert_guarded(input_path, &request) {
                Ok(converted) => {
                    succeeded += 1;
                    log::info!(
                        "Converted {} to {}",
                        input_path.display(),
                        converted.output.display()
                    );
                    FileReport {
                        index,
                        source: input_path.clone(),
                        outcome: ConversionOutcome::Succeeded,
                        output: Some(converted.output),
                        original_size,
                        output_size: Some(converted.output_size),
                    }
                }
                Err(e) => {
                    failed += 1;
                    let kind = e.kind();
                    log::warn!("Failed to convert {}: {}", input_path.display(), e);
                    let status = format!("Failed to convert {}: {}", name, kind);
                    sink.emit(ConversionEvent::Status(status));
                    FileReport {
                        index,
                        source: input_path.clone(),
                        outcome: ConversionOutcome::Failed(kind),
                        output: None,
                        original_size,
                        output_size: None,
                    }
                }
            };
            sink.emit(ConversionEvent::FileFinished(report));
            log_memory_usage("After file");
        }

        if reason == TerminationReason::Completed {
            sink.emit(ConversionEvent::Progress(100));
        }

        log::info!(
            "Conversion finished in {:?}: {} succeeded, {} failed",
            start_time.elapsed(),
            succeeded,
            failed
        );
        finish(&sink, RunSummary::new(succeeded, failed, reason))
    }
}

fn finish<S: EventSink>(sink: &S, summary: RunSummary) -> RunSummary {
    sink.emit(ConversionEvent::Completed {
        succeeded: summary.succeeded(),
        failed: summary.failed(),
    });
    summary
}

/// `floor(index / total * 100)`.
pub fn percent_started(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (index.saturating_mul(100) / total).min(100) as u8
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// A codec panic only fails the file it happened on.
fn convert_guarded(
    input: &Path,
    request: &ConversionRequest,
) -> Result<ConvertedImage, ConversionError> {
    let options = request.options();
    panic::catch_unwind(AssertUnwindSafe(|| image_processing::convert_image(input, options)))
        .unwrap_or_else(|payload| Err(ConversionError::Panicked(panic_message(payload))))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
