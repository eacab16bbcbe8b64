// request.rs
use crate::error::RequestError;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Extensions a shell should accept from dialogs and drops.
pub const RECOGNIZED_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "webp", "bmp", "gif", "tiff", "tif"];

pub fn is_recognized_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| RECOGNIZED_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    #[default]
    Original,
    Small,
    Medium,
    Large,
}

impl ResizeMode {
    pub const ALL: [ResizeMode; 4] = [
        ResizeMode::Original,
        ResizeMode::Small,
        ResizeMode::Medium,
        ResizeMode::Large,
    ];

    pub fn factor(self) -> f64 {
        match self {
            ResizeMode::Original => 1.0,
            ResizeMode::Small => 0.5,
            ResizeMode::Medium => 0.75,
            ResizeMode::Large => 1.5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResizeMode::Original => "Original",
            ResizeMode::Small => "Small",
            ResizeMode::Medium => "Medium",
            ResizeMode::Large => "Large",
        }
    }
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResizeMode {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResizeMode::ALL
            .into_iter()
            .find(|mode| mode.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RequestError::UnknownResizeMode(s.to_string()))
    }
}

/// The quality choices the converter window offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityPreset {
    #[default]
    High,
    Medium,
    Low,
}

impl QualityPreset {
    pub fn quality(self) -> u8 {
        match self {
            QualityPreset::High => 100,
            QualityPreset::Medium => 75,
            QualityPreset::Low => 50,
        }
    }
}

impl FromStr for QualityPreset {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(QualityPreset::High),
            "medium" => Ok(QualityPreset::Medium),
            "low" => Ok(QualityPreset::Low),
            _ => Err(RequestError::UnknownQualityPreset(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    resize_mode: ResizeMode,
    quality: u8,
    output_directory: PathBuf,
}

impl ConversionOptions {
    pub fn new(
        resize_mode: ResizeMode,
        quality: u8,
        output_directory: impl Into<PathBuf>,
    ) -> Result<Self, RequestError> {
        if !(1..=100).contains(&quality) {
            return Err(RequestError::QualityOutOfRange(quality));
        }
        Ok(Self {
            resize_mode,
            quality,
            output_directory: output_directory.into(),
        })
    }

    pub fn with_preset(
        resize_mode: ResizeMode,
        preset: QualityPreset,
        output_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resize_mode,
            quality: preset.quality(),
            output_directory: output_directory.into(),
        }
    }

    pub fn resize_mode(&self) -> ResizeMode {
        self.resize_mode
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Quality 100 selects the lossless encoder.
    pub fn is_lossless(&self) -> bool {
        self.quality == 100
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self::with_preset(ResizeMode::Original, QualityPreset::High, "converted")
    }
}

/// A batch handed to the runner. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    input_files: Vec<PathBuf>,
    options: ConversionOptions,
}

impl ConversionRequest {
    /// Duplicate paths keep the position of their latest submission.
    pub fn new<I, P>(input_files: I, options: ConversionOptions) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            input_files: dedup_latest(input_files.into_iter().map(Into::into).collect()),
            options,
        }
    }

    pub fn input_files(&self) -> &[PathBuf] {
        &self.input_files
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.input_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_files.is_empty()
    }
}

fn dedup_latest(files: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut kept: Vec<PathBuf> = files
        .into_iter()
        .rev()
        .filter(|path| seen.insert(path.clone()))
        .collect();
    kept.reverse();
    kept
}
