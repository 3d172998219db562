//! Feature extraction over a normalized grid.
//!
//! Each descriptor is a pure function of the grid; they share no state and
//! can be computed in any order. Reductions accumulate in `f64`.

use tracing::debug;

use super::preprocess::NormalizedImage;
use super::types::FeatureVector;
use super::AnalysisError;
use crate::config::HISTOGRAM_BINS;

/// Compute all five descriptors.
///
/// Fails with a computation error naming the offending field if any scalar
/// comes out non-finite.
pub fn extract_features(image: &NormalizedImage) -> Result<FeatureVector, AnalysisError> {
    let features = FeatureVector {
        brightness: compute_brightness(image),
        contrast: compute_contrast(image),
        edge_density: compute_edge_density(image),
        histogram: compute_histogram(image),
        symmetry: compute_symmetry(image),
    };

    if let Some(field) = features.first_non_finite() {
        return Err(AnalysisError::computation(
            "feature_extraction",
            format!("non-finite {field}"),
        ));
    }

    debug!(
        brightness = features.brightness,
        contrast = features.contrast,
        edge_density = features.edge_density,
        symmetry = features.symmetry,
        "Features extracted"
    );

    Ok(features)
}

/// Arithmetic mean of all intensities.
pub fn compute_brightness(image: &NormalizedImage) -> f64 {
    mean(image.pixels().iter().map(|&v| v as f64))
}

/// Population standard deviation of all intensities.
pub fn compute_contrast(image: &NormalizedImage) -> f64 {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for &v in image.pixels() {
        let v = v as f64;
        sum += v;
        sum_sq += v * v;
        count += 1;
    }

    if count == 0 {
        return 0.0;
    }

    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64) - (mean * mean);
    variance.max(0.0).sqrt()
}

/// Mean Sobel gradient magnitude over every pixel.
///
/// Kernels `[-1,0,1; -2,0,2; -1,0,1]` and its transpose, with edge
/// replication at the border so the mean covers the full grid.
/// Magnitudes are in intensity units: a hard 0 -> 1 step peaks at 4.0.
pub fn compute_edge_density(image: &NormalizedImage) -> f64 {
    let size = image.size() as i64;
    let px = |x: i64, y: i64| image.get_clamped(x, y) as f64;

    let mut total = 0.0f64;
    for y in 0..size {
        for x in 0..size {
            let gx = (px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x - 1, y) + px(x - 1, y + 1));
            let gy = (px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x, y - 1) + px(x + 1, y - 1));
            total += (gx * gx + gy * gy).sqrt();
        }
    }

    let count = image.pixel_count();
    if count == 0 {
        return 0.0;
    }
    total / count as f64
}

/// Count samples per 0.1-wide bin. An intensity of exactly 1.0 lands in
/// the last bin.
pub fn compute_histogram(image: &NormalizedImage) -> [u32; HISTOGRAM_BINS] {
    let mut bins = [0u32; HISTOGRAM_BINS];
    for &v in image.pixels() {
        bins[histogram_bin(v)] += 1;
    }
    bins
}

fn histogram_bin(v: f32) -> usize {
    let idx = (v as f64 * HISTOGRAM_BINS as f64).floor();
    if idx <= 0.0 {
        0
    } else {
        (idx as usize).min(HISTOGRAM_BINS - 1)
    }
}

/// `1 - |mean(left) - mean(right)|`.
///
/// Left is columns `[0, size/2)`, right is `[ceil(size/2), size)`; the
/// middle column of an odd-sized grid belongs to neither.
pub fn compute_symmetry(image: &NormalizedImage) -> f64 {
    let size = image.size() as usize;
    let half = size / 2;
    if half == 0 {
        return 1.0;
    }
    let right_start = size - half;

    let mut left = 0.0f64;
    let mut right = 0.0f64;
    for y in 0..image.size() {
        let row = image.row(y);
        left += row[..half].iter().map(|&v| v as f64).sum::<f64>();
        right += row[right_start..].iter().map(|&v| v as f64).sum::<f64>();
    }

    let per_half = (half * size) as f64;
    1.0 - ((left / per_half) - (right / per_half)).abs()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0f64, 0u64), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(size: u32, value: f32) -> NormalizedImage {
        NormalizedImage::from_fn(size, |_, _| value).unwrap()
    }

    /// Horizontal bands of `band` rows alternating `a` and `b`.
    fn bands(size: u32, band: u32, a: f32, b: f32) -> NormalizedImage {
        NormalizedImage::from_fn(size, |_, y| if (y / band) % 2 == 0 { a } else { b }).unwrap()
    }

    // ── brightness / contrast ──

    #[test]
    fn flat_image_has_zero_contrast() {
        let img = flat(32, 0.5);
        assert!((compute_brightness(&img) - 0.5).abs() < 1e-9);
        assert!(compute_contrast(&img).abs() < 1e-9);
    }

    #[test]
    fn half_and_half_contrast_is_half_the_gap() {
        let img = bands(32, 16, 0.2, 0.6);
        assert!((compute_brightness(&img) - 0.4).abs() < 1e-6);
        assert!((compute_contrast(&img) - 0.2).abs() < 1e-6);
    }

    // ── edge density ──

    #[test]
    fn flat_image_has_no_edges() {
        assert_eq!(compute_edge_density(&flat(16, 0.7)), 0.0);
    }

    #[test]
    fn single_step_edge_density() {
        // Columns 0..8 dark, 8..16 bright: two columns per row see the step.
        let img = NormalizedImage::from_fn(16, |x, _| if x < 8 { 0.0 } else { 1.0 }).unwrap();
        let expected = 2.0 * 4.0 / 16.0;
        assert!((compute_edge_density(&img) - expected).abs() < 1e-9);
    }

    #[test]
    fn edge_density_grows_with_band_count() {
        let coarse = compute_edge_density(&bands(64, 32, 0.2, 0.6));
        let fine = compute_edge_density(&bands(64, 4, 0.2, 0.6));
        assert!(fine > coarse, "fine {fine} should exceed coarse {coarse}");
    }

    // ── histogram ──

    #[test]
    fn histogram_counts_every_pixel() {
        let img = NormalizedImage::from_fn(20, |x, y| ((x * 7 + y * 13) % 256) as f32 / 255.0)
            .unwrap();
        let features = extract_features(&img).unwrap();
        assert_eq!(features.histogram_total(), 400);
    }

    #[test]
    fn full_intensity_lands_in_last_bin() {
        let hist = compute_histogram(&flat(4, 1.0));
        assert_eq!(hist[9], 16);
        assert_eq!(hist.iter().map(|&c| c as u64).sum::<u64>(), 16);
    }

    #[test]
    fn bin_boundaries_floor() {
        assert_eq!(histogram_bin(0.0), 0);
        assert_eq!(histogram_bin(0.0999), 0);
        assert_eq!(histogram_bin(0.1), 1);
        assert_eq!(histogram_bin(0.55), 5);
        assert_eq!(histogram_bin(0.95), 9);
        assert_eq!(histogram_bin(1.0), 9);
    }

    // ── symmetry ──

    #[test]
    fn identical_halves_are_fully_symmetric() {
        // Right half repeats the left half column for column.
        let img = NormalizedImage::from_fn(32, |x, y| ((x % 16) * 3 + y) as f32 / 200.0).unwrap();
        assert!((compute_symmetry(&img) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mirrored_halves_are_symmetric() {
        let img = NormalizedImage::from_fn(31, |x, y| {
            let d = (x as i32 - 15).unsigned_abs();
            (d * 4 + y) as f32 / 200.0
        })
        .unwrap();
        assert!((compute_symmetry(&img) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn black_left_white_right_has_zero_symmetry() {
        let img = NormalizedImage::from_fn(10, |x, _| if x < 5 { 0.0 } else { 1.0 }).unwrap();
        assert!(compute_symmetry(&img).abs() < 1e-12);
    }

    #[test]
    fn odd_size_ignores_middle_column() {
        let img = NormalizedImage::from_fn(5, |x, _| if x == 2 { 1.0 } else { 0.3 }).unwrap();
        assert!((compute_symmetry(&img) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn one_pixel_grid_is_symmetric() {
        assert_eq!(compute_symmetry(&flat(1, 0.4)), 1.0);
    }

    // ── extract_features ──

    #[test]
    fn extraction_is_deterministic() {
        let img = NormalizedImage::from_fn(48, |x, y| ((x * x + y * 3) % 97) as f32 / 96.0)
            .unwrap();
        let first = extract_features(&img).unwrap();
        let second = extract_features(&img).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.brightness.to_bits(), second.brightness.to_bits());
        assert_eq!(first.edge_density.to_bits(), second.edge_density.to_bits());
    }
}
