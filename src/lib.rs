//! Batch conversion of raster images to WebP.
//!
//! A shell builds a [`ConversionRequest`], starts it with [`JobHandle::spawn`]
//! (or runs a [`JobRunner`] on a thread of its own) and renders the
//! [`ConversionEvent`]s it receives. Files are converted one at a time; a
//! failing file is reported and skipped, cancellation is checked between files.

pub mod error;
pub mod request;
pub mod runner;
pub mod utils;

pub use error::{ConversionError, FailureKind, RequestError, RunnerError};
pub use request::{
    is_recognized_image, ConversionOptions, ConversionRequest, QualityPreset, ResizeMode,
    RECOGNIZED_EXTENSIONS,
};
pub use runner::cancel::CancellationToken;
pub use runner::events::{
    ConversionEvent, ConversionOutcome, ConversionProgress, EventSink, FileReport,
};
pub use runner::handle::JobHandle;
pub use runner::image_processing::{normalize_for_target, scaled_dimensions, TARGET_EXTENSION};
pub use runner::{JobRunner, RunSummary, TerminationReason};
pub use utils::Logger;
