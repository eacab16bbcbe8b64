// error.rs
use image::ImageError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Per-file failure classification reported to the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NotFound,
    AccessDenied,
    UnrecognizedFormat,
    IoFailure,
    Unexpected,
}

impl FailureKind {
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FailureKind::NotFound,
            io::ErrorKind::PermissionDenied => FailureKind::AccessDenied,
            _ => FailureKind::IoFailure,
        }
    }

    pub fn from_image(err: &ImageError) -> Self {
        match err {
            ImageError::IoError(e) => FailureKind::from_io(e),
            ImageError::Unsupported(_) => FailureKind::UnrecognizedFormat,
            // Corrupt or truncated data behind a known header.
            ImageError::Decoding(_) => FailureKind::IoFailure,
            ImageError::Encoding(_) => FailureKind::IoFailure,
            _ => FailureKind::Unexpected,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::NotFound => "not found",
            FailureKind::AccessDenied => "access denied",
            FailureKind::UnrecognizedFormat => "unrecognized format",
            FailureKind::IoFailure => "I/O failure",
            FailureKind::Unexpected => "unexpected error",
        };
        f.write_str(label)
    }
}

/// Why a single file could not be converted.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to decode {}: {source}", .path.display())]
    Decode { path: PathBuf, source: ImageError },

    #[error("failed to encode WebP: {0}")]
    Encode(String),

    #[error("failed to save {}: {source}", .path.display())]
    Save { path: PathBuf, source: io::Error },

    #[error("conversion panicked: {0}")]
    Panicked(String),
}

impl ConversionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ConversionError::Open { source, .. } => FailureKind::from_io(source),
            ConversionError::Decode { source, .. } => FailureKind::from_image(source),
            ConversionError::Save { source, .. } => FailureKind::from_io(source),
            ConversionError::Encode(_) | ConversionError::Panicked(_) => FailureKind::Unexpected,
        }
    }
}

/// Invalid conversion options coming from the shell.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("quality must be between 1 and 100, got {0}")]
    QualityOutOfRange(u8),

    #[error("unknown resize mode: {0}")]
    UnknownResizeMode(String),

    #[error("unknown quality preset: {0}")]
    UnknownQualityPreset(String),
}

/// Failures of the worker thread itself, not of any file.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn conversion thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("conversion thread panicked")]
    WorkerPanicked,
}
