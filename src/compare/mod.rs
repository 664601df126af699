//! Image similarity and blur detection.
//!
//! Both checks run on a fixed-size grayscale rendition of the input:
//! similarity is the mean structural similarity (SSIM, 7x7 uniform
//! windows) of two 20x20 thumbnails, and blurriness is the variance of the
//! 4-neighbor Laplacian of a 500x500 rendition - below the threshold the
//! image counts as blurry.

use std::path::Path;

use image::GrayImage;
use image::imageops::FilterType;
use thiserror::Error;

/// Edge length used for similarity thumbnails.
const SIMILAR_EDGE: u32 = 20;

/// Edge length used for the blur check.
const BLUR_EDGE: u32 = 500;

/// Images scoring above this are considered similar.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Laplacian variance below this flags an image as blurry.
pub const DEFAULT_BLUR_THRESHOLD: f64 = 100.0;

const SSIM_WINDOW: u32 = 7;
const SSIM_K1: f64 = 0.01;
const SSIM_K2: f64 = 0.03;
const SSIM_RANGE: f64 = 255.0;

/// Errors raised by the comparison helpers.
#[derive(Debug, Error)]
pub enum CompareError {
    /// An input image could not be opened or decoded.
    #[error("cannot read image {path}: {source}")]
    Read {
        /// The image path.
        path: std::path::PathBuf,
        /// The underlying decode error.
        #[source]
        source: image::ImageError,
    },
}

fn read_grayscale(path: &Path, edge: u32) -> Result<GrayImage, CompareError> {
    let decoded = image::open(path).map_err(|source| CompareError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decoded.resize_exact(edge, edge, FilterType::Triangle).to_luma8())
}

/// Computes the structural similarity score of two images.
///
/// # Errors
///
/// Returns [`CompareError::Read`] when either image cannot be decoded.
pub fn similarity(a: &Path, b: &Path) -> Result<f64, CompareError> {
    let image_a = read_grayscale(a, SIMILAR_EDGE)?;
    let image_b = read_grayscale(b, SIMILAR_EDGE)?;
    Ok(mean_ssim(&image_a, &image_b))
}

/// Returns whether two images score above the similarity threshold.
///
/// # Errors
///
/// Returns [`CompareError::Read`] when either image cannot be decoded.
pub fn are_similar(a: &Path, b: &Path, threshold: f64) -> Result<bool, CompareError> {
    Ok(similarity(a, b)? > threshold)
}

/// Returns whether an image's Laplacian variance falls below `threshold`.
///
/// # Errors
///
/// Returns [`CompareError::Read`] when the image cannot be decoded.
pub fn is_blurry(path: &Path, threshold: f64) -> Result<bool, CompareError> {
    let gray = read_grayscale(path, BLUR_EDGE)?;
    Ok(laplacian_variance(&gray) < threshold)
}

/// Mean squared error between two images at thumbnail size.
///
/// Lower is more similar; zero means identical thumbnails.
///
/// # Errors
///
/// Returns [`CompareError::Read`] when either image cannot be decoded.
pub fn mse(a: &Path, b: &Path) -> Result<f64, CompareError> {
    let image_a = read_grayscale(a, SIMILAR_EDGE)?;
    let image_b = read_grayscale(b, SIMILAR_EDGE)?;
    let sum: f64 = image_a
        .pixels()
        .zip(image_b.pixels())
        .map(|(pa, pb)| {
            let diff = f64::from(pa.0[0]) - f64::from(pb.0[0]);
            diff * diff
        })
        .sum();
    Ok(sum / f64::from(SIMILAR_EDGE * SIMILAR_EDGE))
}

/// Mean SSIM over all fully-contained 7x7 windows.
///
/// Sample-normalized variances/covariance, K1=0.01, K2=0.03, L=255 - the
/// parameter defaults of the usual reference implementations.
fn mean_ssim(a: &GrayImage, b: &GrayImage) -> f64 {
    let (width, height) = a.dimensions();
    debug_assert_eq!((width, height), b.dimensions());
    if width < SSIM_WINDOW || height < SSIM_WINDOW {
        return 0.0;
    }
    let c1 = (SSIM_K1 * SSIM_RANGE).powi(2);
    let c2 = (SSIM_K2 * SSIM_RANGE).powi(2);
    let n = f64::from(SSIM_WINDOW * SSIM_WINDOW);
    let cov_norm = n / (n - 1.0);

    let mut total = 0.0;
    let mut windows = 0u32;
    for top in 0..=height - SSIM_WINDOW {
        for left in 0..=width - SSIM_WINDOW {
            let mut sum_a = 0.0;
            let mut sum_b = 0.0;
            let mut sum_aa = 0.0;
            let mut sum_bb = 0.0;
            let mut sum_ab = 0.0;
            for y in top..top + SSIM_WINDOW {
                for x in left..left + SSIM_WINDOW {
                    let va = f64::from(a.get_pixel(x, y).0[0]);
                    let vb = f64::from(b.get_pixel(x, y).0[0]);
                    sum_a += va;
                    sum_b += vb;
                    sum_aa += va * va;
                    sum_bb += vb * vb;
                    sum_ab += va * vb;
                }
            }
            let mean_a = sum_a / n;
            let mean_b = sum_b / n;
            let var_a = cov_norm * (sum_aa / n - mean_a * mean_a);
            let var_b = cov_norm * (sum_bb / n - mean_b * mean_b);
            let cov = cov_norm * (sum_ab / n - mean_a * mean_b);
            let score = ((2.0 * mean_a * mean_b + c1) * (2.0 * cov + c2))
                / ((mean_a * mean_a + mean_b * mean_b + c1) * (var_a + var_b + c2));
            total += score;
            windows += 1;
        }
    }
    total / f64::from(windows)
}

/// Variance of the 4-neighbor Laplacian over interior pixels.
#[allow(clippy::cast_precision_loss)]
fn laplacian_variance(image: &GrayImage) -> f64 {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }
    let value = |x: u32, y: u32| f64::from(image.get_pixel(x, y).0[0]);
    let mut responses = Vec::new();
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let lap = value(x - 1, y) + value(x + 1, y) + value(x, y - 1) + value(x, y + 1)
                - 4.0 * value(x, y);
            responses.push(lap);
        }
    }
    let count = responses.len() as f64;
    let mean = responses.iter().sum::<f64>() / count;
    responses.iter().map(|lap| (lap - mean).powi(2)).sum::<f64>() / count
}
