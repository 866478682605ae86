use super::candidate::{self, Candidate};
use super::DetectionProfile;
use crate::assert_invariant;
use crate::config::ScanConfig;
use crate::quality::SharpnessEstimator;
use crate::types::{Boundary, Frame};
use crate::vision;
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Result of running the detector on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSample {
    pub found: bool,
    pub boundary: Option<Boundary>,
    /// Sharpness of the detected region, 0..=100
    pub quality: u8,
}

impl DetectionSample {
    pub fn not_found() -> Self {
        Self {
            found: false,
            boundary: None,
            quality: 0,
        }
    }

    pub fn found(boundary: Boundary, quality: u8) -> Self {
        Self {
            found: true,
            boundary: Some(boundary),
            quality,
        }
    }
}

/// Finds the most card-like rectangle in a frame.
///
/// Pipeline: grayscale, Gaussian blur, inverted adaptive threshold,
/// morphological closing, Canny, external contours, then candidate scoring.
#[derive(Debug, Clone)]
pub struct CardDetector {
    live: DetectionProfile,
    still: DetectionProfile,
    sharpness: SharpnessEstimator,
}

impl Default for CardDetector {
    fn default() -> Self {
        Self::new(
            DetectionProfile::live(),
            DetectionProfile::still(),
            SharpnessEstimator::default(),
        )
    }
}

impl CardDetector {
    pub fn new(
        live: DetectionProfile,
        still: DetectionProfile,
        sharpness: SharpnessEstimator,
    ) -> Self {
        Self {
            live,
            still,
            sharpness,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            config.detection.live.clone(),
            config.detection.still.clone(),
            SharpnessEstimator::from_config(&config.quality),
        )
    }

    pub fn live_profile(&self) -> &DetectionProfile {
        &self.live
    }

    pub fn still_profile(&self) -> &DetectionProfile {
        &self.still
    }

    /// Detect on a live camera frame.
    pub fn detect(&self, frame: &Frame) -> DetectionSample {
        self.detect_with_profile(frame, &self.live)
    }

    /// One-shot detection over a captured still, trying each Canny pair of
    /// the still profile until one yields a card.
    pub fn detect_still(&self, frame: &Frame) -> DetectionSample {
        self.detect_with_profile(frame, &self.still)
    }

    pub fn detect_with_profile(&self, frame: &Frame, profile: &DetectionProfile) -> DetectionSample {
        if frame.is_empty() {
            return DetectionSample::not_found();
        }

        let gray = vision::grayscale(&frame.image);
        let Some(candidate) = find_candidate(&gray, profile) else {
            return DetectionSample::not_found();
        };

        let boundary = candidate.boundary;
        assert_invariant!(
            boundary.fits_within(frame.width(), frame.height()),
            "Detected boundary lies inside the frame",
            "detection"
        );

        let region = image::imageops::crop_imm(
            &gray,
            boundary.x,
            boundary.y,
            boundary.width,
            boundary.height,
        )
        .to_image();
        let quality = self.sharpness.score_laplacian(&region);

        log::debug!(
            "Card found at {:?} (score {:.0}, quality {})",
            boundary,
            candidate.score,
            quality
        );
        DetectionSample::found(boundary, quality)
    }
}

fn find_candidate(gray: &GrayImage, profile: &DetectionProfile) -> Option<Candidate> {
    let (width, height) = gray.dimensions();
    let blurred = vision::gaussian_blur(gray, profile.blur_sigma);
    let binary = vision::adaptive_threshold_inv(
        &blurred,
        profile.threshold_block_size,
        profile.threshold_offset,
    );
    let closed = vision::close(&binary, profile.closing_radius);

    for (attempt, [low, high]) in profile.canny_thresholds.iter().enumerate() {
        let edges = vision::dilate(&vision::canny(&closed, *low, *high), profile.edge_dilation);
        let contours = vision::external_contours(&edges);
        log::trace!(
            "Canny ({}, {}) attempt {}: {} external contours",
            low,
            high,
            attempt + 1,
            contours.len()
        );

        if let Some(best) = candidate::select_best(&contours, width, height, profile) {
            return Some(best);
        }
    }

    None
}
