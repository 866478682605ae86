/// Sharpness estimation
///
/// Two estimators with separate calibration:
/// - byte difference: mean luminance step between horizontally adjacent
///   pixels over the whole image; cheap, used for file triage before cropping
/// - Laplacian variance: variance of the second-derivative response; used for
///   live frames
///
/// Both map onto 0..=100 with a linear scale factor and clamp at 100.
use crate::config::QualityConfig;
use crate::types::Frame;
use crate::vision;
use image::{GrayImage, RgbaImage};

/// Returned whenever pixel data cannot be decoded or scored.
pub const DEFAULT_SCORE: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpnessEstimator {
    /// Points per unit of mean adjacent-pixel luminance difference
    pub byte_diff_scale: f64,
    /// Points per unit of Laplacian variance
    pub laplacian_scale: f64,
}

impl Default for SharpnessEstimator {
    fn default() -> Self {
        Self {
            byte_diff_scale: 4.0,
            laplacian_scale: 0.1,
        }
    }
}

impl SharpnessEstimator {
    pub fn from_config(config: &QualityConfig) -> Self {
        Self {
            byte_diff_scale: config.byte_diff_scale,
            laplacian_scale: config.laplacian_scale,
        }
    }

    /// Live-frame score (Laplacian variance).
    pub fn score(&self, frame: &Frame) -> u8 {
        self.score_laplacian(&frame.to_luma())
    }

    pub fn score_laplacian(&self, gray: &GrayImage) -> u8 {
        match vision::laplacian_variance(gray) {
            Some(variance) => to_score(variance * self.laplacian_scale),
            None => {
                log::warn!("Laplacian sharpness on empty image, using default score");
                DEFAULT_SCORE
            }
        }
    }

    /// Whole-image triage score (byte difference).
    pub fn score_byte_difference(&self, image: &RgbaImage) -> u8 {
        match mean_adjacent_difference(image) {
            Some(mean_diff) => to_score(mean_diff * self.byte_diff_scale),
            None => {
                log::warn!(
                    "Byte-difference sharpness on {}x{} image, using default score",
                    image.width(),
                    image.height()
                );
                DEFAULT_SCORE
            }
        }
    }

    /// Decode `bytes` and score with the byte-difference estimator.
    pub fn score_encoded_bytes(&self, bytes: &[u8]) -> u8 {
        match image::load_from_memory(bytes) {
            Ok(decoded) => self.score_byte_difference(&decoded.to_rgba8()),
            Err(e) => {
                log::warn!("Could not decode image for sharpness scoring: {}", e);
                DEFAULT_SCORE
            }
        }
    }
}

fn to_score(value: f64) -> u8 {
    if !value.is_finite() {
        return DEFAULT_SCORE;
    }
    value.round().clamp(0.0, 100.0) as u8
}

fn luminance(pixel: &image::Rgba<u8>) -> f64 {
    let [r, g, b, _] = pixel.0;
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

fn mean_adjacent_difference(image: &RgbaImage) -> Option<f64> {
    let (width, height) = image.dimensions();
    if width < 2 || height == 0 {
        return None;
    }

    let mut total = 0.0;
    for row in image.rows() {
        let mut previous: Option<f64> = None;
        for pixel in row {
            let current = luminance(pixel);
            if let Some(prev) = previous {
                total += (current - prev).abs();
            }
            previous = Some(current);
        }
    }

    let pairs = (width as f64 - 1.0) * height as f64;
    Some(total / pairs)
}
