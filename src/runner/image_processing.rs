// image_processing.rs
use crate::error::ConversionError;
use crate::request::ConversionOptions;
use crate::utils::timed;
use image::imageops::FilterType;
use image::io::Reader as ImageReader;
use image::{ColorType, DynamicImage};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const TARGET_EXTENSION: &str = "webp";

/// Largest width or height a WebP bitstream can carry.
pub const WEBP_MAX_DIMENSION: u32 = 16383;

/// Pixel layouts the WebP encoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb8,
    Rgba8,
}

// Palette and CMYK sources are expanded by their decoders to the 8-bit
// RGB(A) entries below, so grey-with-alpha is the remaining alpha case.
const LAYOUT_TABLE: &[(ColorType, PixelLayout)] = &[
    (ColorType::L8, PixelLayout::Rgb8),
    (ColorType::La8, PixelLayout::Rgba8),
    (ColorType::Rgb8, PixelLayout::Rgb8),
    (ColorType::Rgba8, PixelLayout::Rgba8),
    (ColorType::L16, PixelLayout::Rgb8),
    (ColorType::La16, PixelLayout::Rgba8),
    (ColorType::Rgb16, PixelLayout::Rgb8),
    (ColorType::Rgba16, PixelLayout::Rgba8),
    (ColorType::Rgb32F, PixelLayout::Rgb8),
    (ColorType::Rgba32F, PixelLayout::Rgba8),
];

pub fn target_layout(color: ColorType) -> PixelLayout {
    LAYOUT_TABLE
        .iter()
        .find(|(source, _)| *source == color)
        .map(|(_, layout)| *layout)
        .unwrap_or(if color.has_alpha() { PixelLayout::Rgba8 } else { PixelLayout::Rgb8 })
}

pub fn normalize_for_target(img: DynamicImage) -> DynamicImage {
    match (target_layout(img.color()), img) {
        (PixelLayout::Rgb8, img @ DynamicImage::ImageRgb8(_)) => img,
        (PixelLayout::Rgba8, img @ DynamicImage::ImageRgba8(_)) => img,
        (PixelLayout::Rgb8, img) => DynamicImage::ImageRgb8(img.to_rgb8()),
        (PixelLayout::Rgba8, img) => DynamicImage::ImageRgba8(img.to_rgba8()),
    }
}

/// `round(dim * factor)`, never below one pixel.
pub fn scaled_dimensions(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let scale = |dim: u32| ((dim as f64 * factor).round() as u32).max(1);
    (scale(width), scale(height))
}

pub fn output_path_for(output_directory: &Path, input: &Path) -> PathBuf {
    let mut file_name = input.file_stem().unwrap_or_default().to_os_string();
    file_name.push(".");
    file_name.push(TARGET_EXTENSION);
    output_directory.join(file_name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedImage {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub output_size: u64,
}

/// Decode, normalize, resize, encode and write a single file.
pub fn convert_image(
    input: &Path,
    options: &ConversionOptions,
) -> Result<ConvertedImage, ConversionError> {
    let img = timed("Loading", input, || load_image(input))?;
    let img = normalize_for_target(img);
    let factor = options.resize_mode().factor();
    let img = timed("Resizing", input, || resize_image(img, factor));

    let lossless = options.is_lossless();
    let webp_data =
        timed("Encoding", input, || encode_to_webp(&img, options.quality(), lossless))?;

    let output = output_path_for(options.output_directory(), input);
    timed("Saving", &output, || save_webp(&webp_data, &output))?;

    Ok(ConvertedImage {
        output,
        width: img.width(),
        height: img.height(),
        output_size: webp_data.len() as u64,
    })
}

pub fn load_image(path: &Path) -> Result<DynamicImage, ConversionError> {
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|source| ConversionError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    reader
        .decode()
        .map_err(|source| ConversionError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

pub fn resize_image(img: DynamicImage, factor: f64) -> DynamicImage {
    if (factor - 1.0).abs() < f64::EPSILON {
        return img;
    }
    let (width, height) = scaled_dimensions(img.width(), img.height(), factor);
    img.resize_exact(width, height, FilterType::Lanczos3)
}

/// Fails with `ConversionError::Encode` instead of handing the encoder
/// dimensions it cannot store.
pub fn encode_to_webp(
    img: &DynamicImage,
    quality: u8,
    lossless: bool,
) -> Result<Vec<u8>, ConversionError> {
    if img.width() > WEBP_MAX_DIMENSION || img.height() > WEBP_MAX_DIMENSION {
        return Err(ConversionError::Encode(format!(
            "{}x{} exceeds the WebP limit of {} pixels per side",
            img.width(),
            img.height(),
            WEBP_MAX_DIMENSION
        )));
    }
    let encoder =
        webp::Encoder::from_image(img).map_err(|e| ConversionError::Encode(e.to_string()))?;
    let webp = encoder
        .encode_simple(lossless, quality as f32)
        .map_err(|e| ConversionError::Encode(format!("{:?}", e)))?;
    Ok(webp.to_vec())
}

fn save_webp(webp_data: &[u8], output_path: &Path) -> Result<(), ConversionError> {
    let write = || -> std::io::Result<()> {
        let mut file = File::create(output_path)?;
        file.write_all(webp_data)?;
        file.flush()
    };
    write().map_err(|source| ConversionError::Save {
        path: output_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use image::{GrayAlphaImage, ImageBuffer, LumaA, Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7) as u8, (y * 5) as u8, 128])
        }))
    }

    fn bitstream_chunk(data: &[u8]) -> &[u8] {
        &data[12..16]
    }

    #[test]
    fn scaled_dimensions_round_and_clamp() {
        assert_eq!(scaled_dimensions(100, 40, 0.5), (50, 20));
        assert_eq!(scaled_dimensions(3, 5, 0.5), (2, 3));
        assert_eq!(scaled_dimensions(10, 10, 0.75), (8, 8));
        assert_eq!(scaled_dimensions(7, 9, 1.5), (11, 14));
        assert_eq!(scaled_dimensions(1, 1, 0.5), (1, 1));
    }

    #[test]
    fn layout_table_covers_alpha() {
        assert_eq!(target_layout(ColorType::La8), PixelLayout::Rgba8);
        assert_eq!(target_layout(ColorType::L16), PixelLayout::Rgb8);
        assert_eq!(target_layout(ColorType::Rgba16), PixelLayout::Rgba8);
        assert_eq!(target_layout(ColorType::Rgb32F), PixelLayout::Rgb8);
    }

    #[test]
    fn normalize_converts_grey_alpha_to_rgba() {
        let grey: GrayAlphaImage = ImageBuffer::from_pixel(4, 4, LumaA([200u8, 90]));
        let img = normalize_for_target(DynamicImage::ImageLumaA8(grey));
        assert_eq!(img.color(), ColorType::Rgba8);
        assert_eq!(img.to_rgba8().get_pixel(0, 0).0, [200, 200, 200, 90]);

        let rgb = normalize_for_target(gradient(4, 4));
        assert_eq!(rgb.color(), ColorType::Rgb8);
    }

    #[test]
    fn resize_keeps_original_at_unit_factor() {
        let img = resize_image(gradient(13, 7), 1.0);
        assert_eq!((img.width(), img.height()), (13, 7));
        let img = resize_image(gradient(13, 7), 0.5);
        assert_eq!((img.width(), img.height()), (7, 4));
    }

    #[test]
    fn quality_selects_bitstream() {
        let img = gradient(16, 16);
        let lossless = encode_to_webp(&img, 100, true).unwrap();
        let lossy = encode_to_webp(&img, 80, false).unwrap();
        assert_eq!(&lossless[0..4], b"RIFF");
        assert_eq!(bitstream_chunk(&lossless), b"VP8L");
        assert_eq!(bitstream_chunk(&lossy), b"VP8 ");
    }

    #[test]
    fn oversized_output_is_an_encode_error() {
        let wide = gradient(WEBP_MAX_DIMENSION + 1, 1);
        for lossless in [false, true] {
            let err = encode_to_webp(&wide, 80, lossless).unwrap_err();
            assert!(matches!(err, ConversionError::Encode(_)));
            assert_eq!(err.kind(), FailureKind::Unexpected);
        }

        let widest = gradient(WEBP_MAX_DIMENSION, 1);
        assert!(encode_to_webp(&widest, 80, false).is_ok());
    }

    #[test]
    fn output_name_uses_stem() {
        let out = output_path_for(Path::new("/out"), Path::new("/photos/holiday.final.JPG"));
        assert_eq!(out, PathBuf::from("/out/holiday.final.webp"));
    }

    #[test]
    fn load_classifies_missing_and_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_image(&dir.path().join("missing.png")).unwrap_err();
        assert_eq!(missing.kind(), FailureKind::NotFound);

        let garbage = dir.path().join("garbage.bin");
        std::fs::write(&garbage, b"definitely not pixels").unwrap();
        let err = load_image(&garbage).unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnrecognizedFormat);
    }
}
