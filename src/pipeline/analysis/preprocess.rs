//! Image preprocessing: decoded upload -> fixed-size normalized grayscale grid.
//!
//! Every image is resampled to the same square size so the feature
//! thresholds downstream stay comparable between runs. Pure transform:
//! no I/O, no shared state, fully testable.
//!
//! Pipeline flow:
//! 1. Decode bytes (JPEG / PNG / WEBP) under a width/height limit
//! 2. `orientation.correct()`: fix EXIF rotation
//! 3. Resize to `target_size` x `target_size` in the source colour type
//!    (skipped when already there)
//! 4. BT.601 luminance reduction on the resized image
//! 5. Scale 0-255 samples to 0.0-1.0

use std::borrow::Cow;
use std::io::Cursor;

use image::imageops::FilterType;
use image::{
    DynamicImage, GenericImageView, GrayImage, ImageError, ImageReader, Limits, Luma, RgbImage,
};
use tracing::debug;

use super::AnalysisError;
use crate::config::{MAX_INPUT_DIMENSION, TARGET_SIZE};

// ═══════════════════════════════════════════════════════════
// Result types
// ═══════════════════════════════════════════════════════════

/// Square single-channel intensity grid, values in [0, 1], row-major.
///
/// Derived from one upload and dropped once features are extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    size: u32,
    pixels: Vec<f32>,
}

impl NormalizedImage {
    /// Build from raw row-major intensities.
    ///
    /// Rejects an empty grid, a length that is not `size * size`, and
    /// samples outside [0, 1] (including NaN).
    pub fn from_pixels(size: u32, pixels: Vec<f32>) -> Result<Self, AnalysisError> {
        if size == 0 {
            return Err(AnalysisError::computation("preprocess", "empty image grid"));
        }
        let expected = (size as usize) * (size as usize);
        if pixels.len() != expected {
            return Err(AnalysisError::computation(
                "preprocess",
                format!(
                    "grid shape mismatch: {} samples for {size}x{size}",
                    pixels.len()
                ),
            ));
        }
        if let Some(bad) = pixels.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(AnalysisError::computation(
                "preprocess",
                format!("intensity {bad} outside [0, 1]"),
            ));
        }
        Ok(Self { size, pixels })
    }

    /// Build by evaluating `f(x, y)` for every cell.
    pub fn from_fn(
        size: u32,
        mut f: impl FnMut(u32, u32) -> f32,
    ) -> Result<Self, AnalysisError> {
        let mut pixels = Vec::with_capacity((size as usize) * (size as usize));
        for y in 0..size {
            for x in 0..size {
                pixels.push(f(x, y));
            }
        }
        Self::from_pixels(size, pixels)
    }

    /// Scale a square 8-bit grayscale image into [0, 1].
    pub fn from_gray(gray: &GrayImage) -> Result<Self, AnalysisError> {
        let (w, h) = gray.dimensions();
        if w != h {
            return Err(AnalysisError::computation(
                "preprocess",
                format!("expected a square grid, got {w}x{h}"),
            ));
        }
        let pixels = gray.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        Self::from_pixels(w, pixels)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    pub fn row(&self, y: u32) -> &[f32] {
        let start = (y as usize) * (self.size as usize);
        &self.pixels[start..start + self.size as usize]
    }

    /// Intensity at (x, y) with coordinates clamped to the grid edge.
    pub fn get_clamped(&self, x: i64, y: i64) -> f32 {
        let max = self.size as i64 - 1;
        let cx = x.clamp(0, max) as usize;
        let cy = y.clamp(0, max) as usize;
        self.pixels[cy * self.size as usize + cx]
    }
}

// ═══════════════════════════════════════════════════════════
// Service traits
// ═══════════════════════════════════════════════════════════

/// Fixes image orientation from EXIF metadata.
///
/// Phone photos of a film or monitor embed rotation in EXIF tag 0x0112.
/// Left/right symmetry is meaningless on a sideways image.
pub trait OrientationCorrector: Send + Sync {
    /// Returns the corrected image. No-op if no EXIF or orientation=1.
    fn correct(&self, raw_bytes: &[u8], image: DynamicImage) -> DynamicImage;
}

/// Turns an upload into the fixed-size grid the feature extractor reads.
pub trait ImagePreprocessor: Send + Sync {
    /// Fails with `AnalysisError::Decode` when the bytes are not an image;
    /// no partial grid is ever returned.
    fn preprocess(&self, image_bytes: &[u8]) -> Result<NormalizedImage, AnalysisError>;
}

/// Resize filter quality levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeQuality {
    /// CatmullRom: sharper, slower.
    High,
    /// Triangle (bilinear).
    Fast,
}

impl ResizeQuality {
    fn filter(self) -> FilterType {
        match self {
            Self::High => FilterType::CatmullRom,
            Self::Fast => FilterType::Triangle,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Production implementations
// ═══════════════════════════════════════════════════════════

// ── ExifOrientationCorrector ──────────────────────────────

/// EXIF orientation values:
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
pub struct ExifOrientationCorrector;

impl OrientationCorrector for ExifOrientationCorrector {
    fn correct(&self, raw_bytes: &[u8], image: DynamicImage) -> DynamicImage {
        let orientation = read_exif_orientation(raw_bytes);
        apply_orientation(image, orientation)
    }
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Leaves the decoded image untouched.
pub struct NoOpOrientationCorrector;

impl OrientationCorrector for NoOpOrientationCorrector {
    fn correct(&self, _raw_bytes: &[u8], image: DynamicImage) -> DynamicImage {
        image
    }
}

// ── GrayscalePreprocessor ─────────────────────────────────

/// Decode -> orient -> square resize -> luminance -> [0, 1].
///
/// Non-square uploads are stretched, not padded: padding would inject a
/// flat border that skews brightness and contrast.
pub struct GrayscalePreprocessor {
    orientation: Box<dyn OrientationCorrector>,
    target_size: u32,
    resize_quality: ResizeQuality,
    max_input_dimension: u32,
}

impl GrayscalePreprocessor {
    pub fn new(
        orientation: Box<dyn OrientationCorrector>,
        target_size: u32,
        resize_quality: ResizeQuality,
    ) -> Self {
        Self {
            orientation,
            target_size,
            resize_quality,
            max_input_dimension: MAX_INPUT_DIMENSION,
        }
    }

    pub fn with_target_size(target_size: u32) -> Self {
        Self::new(
            Box::new(ExifOrientationCorrector),
            target_size,
            ResizeQuality::Fast,
        )
    }

    /// Uploads wider or taller than `max_dim` fail with `InvalidInput`
    /// before any pixel buffer is allocated.
    pub fn with_max_input_dimension(mut self, max_dim: u32) -> Self {
        self.max_input_dimension = max_dim;
        self
    }

    pub fn target_size(&self) -> u32 {
        self.target_size
    }

    fn decode(&self, image_bytes: &[u8]) -> Result<DynamicImage, AnalysisError> {
        let mut reader = ImageReader::new(Cursor::new(image_bytes))
            .with_guessed_format()
            .map_err(|e| AnalysisError::Decode(e.to_string()))?;
        reader.limits(decode_limits(self.max_input_dimension));

        reader.decode().map_err(|e| match e {
            ImageError::Limits(_) => AnalysisError::InvalidInput(format!(
                "image larger than {0}x{0} pixels",
                self.max_input_dimension
            )),
            other => AnalysisError::Decode(other.to_string()),
        })
    }
}

impl Default for GrayscalePreprocessor {
    fn default() -> Self {
        Self::with_target_size(TARGET_SIZE)
    }
}

impl ImagePreprocessor for GrayscalePreprocessor {
    fn preprocess(&self, image_bytes: &[u8]) -> Result<NormalizedImage, AnalysisError> {
        let img = self.decode(image_bytes)?;
        let (orig_w, orig_h) = img.dimensions();
        if orig_w == 0 || orig_h == 0 {
            return Err(AnalysisError::Decode("image has no pixels".into()));
        }

        let img = self.orientation.correct(image_bytes, img);
        let resized = resize_square(&img, self.target_size, self.resize_quality);
        let gray = rgb_to_gray(&resized.to_rgb8());

        debug!(
            original = format!("{orig_w}x{orig_h}"),
            output = format!("{0}x{0}", self.target_size),
            "Image normalized for feature extraction"
        );

        NormalizedImage::from_gray(&gray)
    }
}

// ═══════════════════════════════════════════════════════════
// Pure helper functions (reusable)
// ═══════════════════════════════════════════════════════════

/// Width/height cap on top of the default allocation limit.
fn decode_limits(max_dim: u32) -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(max_dim);
    limits.max_image_height = Some(max_dim);
    limits
}

/// Resize to `size` x `size` without changing colour type, so the RGB
/// expansion only ever runs on the small image. Borrows when the image
/// already matches.
fn resize_square(
    img: &DynamicImage,
    size: u32,
    quality: ResizeQuality,
) -> Cow<'_, DynamicImage> {
    if img.width() == size && img.height() == size {
        return Cow::Borrowed(img);
    }
    Cow::Owned(img.resize_exact(size, size, quality.filter()))
}

/// Convert RGB image to grayscale using ITU-R BT.601 luminance.
///
/// Rounds to nearest so gray inputs (r = g = b) map back to themselves.
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    let (w, h) = (rgb.width(), rgb.height());
    let mut gray = GrayImage::new(w, h);
    for (x, y, p) in rgb.enumerate_pixels() {
        let luma = 0.299 * p.0[0] as f32 + 0.587 * p.0[1] as f32 + 0.114 * p.0[2] as f32;
        gray.put_pixel(x, y, Luma([luma.round().clamp(0.0, 255.0) as u8]));
    }
    gray
}

// ═══════════════════════════════════════════════════════════
// Mock implementations (testing)
// ═══════════════════════════════════════════════════════════

/// Returns a fixed grid (or a decode failure) without touching the bytes.
pub struct MockImagePreprocessor {
    image: Option<NormalizedImage>,
}

impl MockImagePreprocessor {
    pub fn returning(image: NormalizedImage) -> Self {
        Self { image: Some(image) }
    }

    pub fn failing() -> Self {
        Self { image: None }
    }
}

impl ImagePreprocessor for MockImagePreprocessor {
    fn preprocess(&self, _image_bytes: &[u8]) -> Result<NormalizedImage, AnalysisError> {
        self.image
            .clone()
            .ok_or_else(|| AnalysisError::Decode("Mock preprocessing failure".into()))
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
