// events.rs
use crate::error::FailureKind;
use std::path::PathBuf;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOutcome {
    Succeeded,
    Failed(FailureKind),
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Succeeded)
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ConversionOutcome::Succeeded => None,
            ConversionOutcome::Failed(kind) => Some(*kind),
        }
    }
}

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub index: usize,
    pub source: PathBuf,
    pub outcome: ConversionOutcome,
    pub output: Option<PathBuf>,
    pub original_size: Option<u64>,
    pub output_size: Option<u64>,
}

impl FileReport {
    /// Fraction of the original size saved, negative when the output grew.
    pub fn compression_rate(&self) -> Option<f32> {
        match (self.original_size, self.output_size) {
            (Some(original), Some(output)) if original > 0 => {
                Some(1.0 - (output as f32 / original as f32))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionEvent {
    /// Percentage of files started, 0..=100.
    Progress(u8),
    Status(String),
    /// Fatal, emitted before any file is attempted.
    Error(String),
    FileFinished(FileReport),
    /// Always the last event of a run.
    Completed { succeeded: usize, failed: usize },
}

/// Receives runner events in emission order, on the runner's thread.
pub trait EventSink: Send {
    fn emit(&self, event: ConversionEvent);
}

impl EventSink for Sender<ConversionEvent> {
    fn emit(&self, event: ConversionEvent) {
        // A shell that hung up no longer cares.
        let _ = self.send(event);
    }
}

impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&self, event: ConversionEvent) {
        self.0.emit(event.clone());
        self.1.emit(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&self, event: ConversionEvent) {
        (**self).emit(event)
    }
}

/// Snapshot a shell renders, folded from the event stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionProgress {
    pub total: usize,
    pub percent: u8,
    pub status: String,
    pub error: Option<String>,
    pub succeeded: usize,
    pub failed: usize,
    pub reports: Vec<FileReport>,
    pub finished: bool,
}

impl ConversionProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn apply(&mut self, event: &ConversionEvent) {
        match event {
            ConversionEvent::Progress(percent) => self.percent = *percent,
            ConversionEvent::Status(message) => self.status = message.clone(),
            ConversionEvent::Error(message) => self.error = Some(message.clone()),
            ConversionEvent::FileFinished(report) => {
                match report.outcome {
                    ConversionOutcome::Succeeded => self.succeeded += 1,
                    ConversionOutcome::Failed(_) => self.failed += 1,
                }
                self.reports.push(report.clone());
            }
            ConversionEvent::Completed { succeeded, failed } => {
                self.succeeded = *succeeded;
                self.failed = *failed;
                self.finished = true;
            }
        }
    }

    pub fn ratio(&self) -> f32 {
        self.percent as f32 / 100.0
    }
}
