use super::{CaptureOutput, CropStrategy};
use crate::assert_invariant;
use crate::config::CaptureConfig;
use crate::detection::CardDetector;
use crate::types::{Boundary, CardImage, CardSide, Frame};
use image::imageops::FilterType;
use image::RgbaImage;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Ordered crop strategies: caller boundary, still-image detection, then the
/// whole frame. [`CropCascade::capture`] cannot fail.
#[derive(Debug, Clone)]
pub struct CropCascade {
    padding_fraction: f64,
    max_output_dimension: Option<u32>,
    detector: Option<Arc<CardDetector>>,
}

impl CropCascade {
    pub fn new(config: &CaptureConfig, detector: Arc<CardDetector>) -> Self {
        Self {
            padding_fraction: config.padding_fraction,
            max_output_dimension: config.max_output_dimension,
            detector: config.fallback_detection_enabled.then_some(detector),
        }
    }

    /// A cascade with no fallback detector: boundary crop or full frame.
    pub fn without_detection(config: &CaptureConfig) -> Self {
        Self {
            padding_fraction: config.padding_fraction,
            max_output_dimension: config.max_output_dimension,
            detector: None,
        }
    }

    pub fn has_fallback_detection(&self) -> bool {
        self.detector.is_some()
    }

    /// Produce the cropped display copy and the untouched original.
    pub fn capture(
        &self,
        frame: Frame,
        last_known: Option<Boundary>,
        side: CardSide,
    ) -> CaptureOutput {
        let (width, height) = (frame.width(), frame.height());

        let (region, strategy) = match last_known.and_then(|b| self.pad(b, width, height)) {
            Some(region) => (Some(region), CropStrategy::Boundary),
            None => {
                if let Some(boundary) = last_known {
                    log::warn!(
                        "Boundary {:?} unusable in {}x{} frame, falling back to detection",
                        boundary,
                        width,
                        height
                    );
                }
                match self.fallback_region(&frame) {
                    Some(region) => (Some(region), CropStrategy::FallbackDetection),
                    None => (None, CropStrategy::FullFrame),
                }
            }
        };

        let cropped = match region {
            Some(region) => {
                assert_invariant!(
                    region.fits_within(width, height),
                    "Crop region lies inside the frame",
                    "capture"
                );
                let crop = image::imageops::crop_imm(
                    &frame.image,
                    region.x,
                    region.y,
                    region.width,
                    region.height,
                )
                .to_image();
                self.limit_size(crop)
            }
            None => {
                log::warn!(
                    "No card region found in {}x{} {} capture, using full frame",
                    width,
                    height,
                    side
                );
                self.limit_size(frame.image.clone())
            }
        };

        log::info!(
            "Captured {} side via {:?}: {}x{} crop from {}x{} frame",
            side,
            strategy,
            cropped.width(),
            cropped.height(),
            width,
            height
        );

        CaptureOutput {
            cropped: CardImage::cropped(cropped, side),
            original: CardImage::original(frame.image, side),
            strategy,
        }
    }

    fn pad(&self, boundary: Boundary, width: u32, height: u32) -> Option<Boundary> {
        let clamped = boundary.clamped_to(width, height)?;
        clamped.padded(self.padding_fraction, width, height)
    }

    fn fallback_region(&self, frame: &Frame) -> Option<Boundary> {
        let detector = self.detector.as_ref()?;
        // A panic inside the vision stack degrades to a full-frame capture
        let sample = match panic::catch_unwind(AssertUnwindSafe(|| detector.detect_still(frame))) {
            Ok(sample) => sample,
            Err(_) => {
                log::warn!("Still-image detection panicked, skipping fallback crop");
                return None;
            }
        };
        self.pad(sample.boundary?, frame.width(), frame.height())
    }

    fn limit_size(&self, image: RgbaImage) -> RgbaImage {
        let Some(max_dim) = self.max_output_dimension else {
            return image;
        };
        let (w, h) = image.dimensions();
        let longest = w.max(h);
        if longest <= max_dim || max_dim == 0 {
            return image;
        }
        let scale = max_dim as f64 / longest as f64;
        let new_w = ((w as f64 * scale).round() as u32).max(1);
        let new_h = ((h as f64 * scale).round() as u32).max(1);
        image::imageops::resize(&image, new_w, new_h, FilterType::Triangle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{card_frame, uniform_frame};

    fn cascade() -> CropCascade {
        CropCascade::new(&CaptureConfig::default(), Arc::new(CardDetector::default()))
    }

    #[test]
    fn test_boundary_crop_adds_padding() {
        let frame = uniform_frame(400, 300, 90);
        let output = cascade().capture(frame, Some(Boundary::new(100, 100, 200, 100)), CardSide::Front);

        assert_eq!(output.strategy, CropStrategy::Boundary);
        assert_eq!(output.cropped.image().dimensions(), (220, 110));
        assert_eq!(output.original.image().dimensions(), (400, 300));
        assert!(output.cropped.is_cropped());
        assert!(!output.original.is_cropped());
    }

    #[test]
    fn test_out_of_frame_boundary_falls_back_to_detection() {
        let frame = card_frame(400, 300, Boundary::new(60, 70, 260, 160));
        let output = cascade().capture(frame, Some(Boundary::new(900, 900, 50, 50)), CardSide::Back);

        assert_eq!(output.strategy, CropStrategy::FallbackDetection);
        let (w, h) = output.cropped.image().dimensions();
        assert!(w < 400 && h < 300);
        assert!(w >= 260 && h >= 160);
    }

    #[test]
    fn test_no_card_returns_full_frame() {
        let frame = uniform_frame(320, 240, 128);
        let expected = frame.image.clone();
        let output = cascade().capture(frame, None, CardSide::Front);

        assert_eq!(output.strategy, CropStrategy::FullFrame);
        assert_eq!(output.cropped.image(), &expected);
        assert_eq!(output.original.image(), &expected);
    }

    #[test]
    fn test_without_detection_never_fails() {
        let frame = card_frame(320, 240, Boundary::new(80, 60, 160, 100));
        let output = CropCascade::without_detection(&CaptureConfig::default())
            .capture(frame, None, CardSide::Front);
        assert_eq!(output.strategy, CropStrategy::FullFrame);
        assert_eq!(output.cropped.image().dimensions(), (320, 240));
    }

    #[test]
    fn test_fallback_disabled_by_config() {
        let config = CaptureConfig {
            fallback_detection_enabled: false,
            ..CaptureConfig::default()
        };
        let cascade = CropCascade::new(&config, Arc::new(CardDetector::default()));
        assert!(!cascade.has_fallback_detection());
    }

    #[test]
    fn test_output_size_limit_keeps_aspect() {
        let config = CaptureConfig {
            max_output_dimension: Some(100),
            ..CaptureConfig::default()
        };
        let cascade = CropCascade::without_detection(&config);
        let output = cascade.capture(
            uniform_frame(400, 300, 50),
            Some(Boundary::new(0, 0, 400, 200)),
            CardSide::Front,
        );
        assert_eq!(output.cropped.image().dimensions(), (100, 50));
        assert_eq!(output.original.image().dimensions(), (400, 300));
    }

    #[test]
    fn test_empty_frame_is_handled() {
        let frame = Frame::new(RgbaImage::new(0, 0), "empty");
        let output = cascade().capture(frame, Some(Boundary::new(0, 0, 10, 10)), CardSide::Front);
        assert_eq!(output.strategy, CropStrategy::FullFrame);
        assert_eq!(output.cropped.image().dimensions(), (0, 0));
    }
}
