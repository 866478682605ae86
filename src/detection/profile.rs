use crate::vision;
use serde::{Deserialize, Serialize};

/// Tuning for one detection pass.
///
/// Two profiles ship: [`DetectionProfile::live`] for camera frames and
/// [`DetectionProfile::still`] for the one-shot fallback over a captured
/// still. The still profile is deliberately more lenient; keep them separate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionProfile {
    /// Gaussian blur sigma applied to the grayscale frame
    pub blur_sigma: f32,
    /// Adaptive threshold neighbourhood (odd, in pixels)
    pub threshold_block_size: u32,
    /// How much darker than the local mean a pixel must be to count as edge.
    /// Must stay well above the blurred sensor noise or flat background
    /// turns into speckle.
    pub threshold_offset: i32,
    /// Morphological closing radius over the thresholded image
    pub closing_radius: u8,
    /// Dilation applied to Canny output before contour tracing
    pub edge_dilation: u8,
    /// Canny (low, high) pairs, tried in order until one yields a card
    pub canny_thresholds: Vec<[f32; 2]>,
    /// Polygon approximation tolerances as fractions of the perimeter
    pub approx_tolerances: Vec<f64>,
    pub min_vertices: usize,
    pub max_vertices: usize,
    /// Contour area over frame area
    pub min_area_ratio: f64,
    pub max_area_ratio: f64,
    /// Contour area over bounding rectangle area
    pub min_fill_ratio: f64,
    pub max_fill_ratio: f64,
    /// Long side over short side of the bounding rectangle
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
}

impl DetectionProfile {
    /// Camera frames: 5x5 blur, low Canny pair, strict shape checks.
    pub fn live() -> Self {
        Self {
            blur_sigma: vision::sigma_for_kernel(5),
            threshold_block_size: 15,
            threshold_offset: 8,
            closing_radius: 2,
            edge_dilation: 1,
            canny_thresholds: vec![[25.0, 75.0]],
            approx_tolerances: vec![0.01, 0.02, 0.03, 0.04],
            min_vertices: 4,
            max_vertices: 8,
            min_area_ratio: 0.08,
            max_area_ratio: 0.92,
            min_fill_ratio: 0.70,
            max_fill_ratio: 1.0,
            min_aspect_ratio: 1.3,
            max_aspect_ratio: 2.0,
        }
    }

    /// Still-image fallback: 7x7 blur, three Canny pairs from most to least
    /// sensitive, looser fill and aspect bounds.
    pub fn still() -> Self {
        Self {
            blur_sigma: vision::sigma_for_kernel(7),
            canny_thresholds: vec![[30.0, 100.0], [50.0, 150.0], [25.0, 75.0]],
            min_fill_ratio: 0.60,
            min_aspect_ratio: 1.2,
            max_aspect_ratio: 2.5,
            ..Self::live()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.canny_thresholds.is_empty() {
            return Err("at least one Canny threshold pair is required".to_string());
        }
        if self
            .canny_thresholds
            .iter()
            .any(|[low, high]| *low <= 0.0 || low > high)
        {
            return Err("Canny thresholds must satisfy 0 < low <= high".to_string());
        }
        if self.approx_tolerances.is_empty() || self.approx_tolerances.iter().any(|t| *t <= 0.0) {
            return Err("approximation tolerances must be positive".to_string());
        }
        if self.min_vertices < 3 || self.min_vertices > self.max_vertices {
            return Err("vertex bounds must satisfy 3 <= min <= max".to_string());
        }
        if self.threshold_block_size < 3 {
            return Err("threshold block size must be at least 3".to_string());
        }
        if !(0.0 < self.min_area_ratio
            && self.min_area_ratio < self.max_area_ratio
            && self.max_area_ratio <= 1.0)
        {
            return Err("area ratio bounds must satisfy 0 < min < max <= 1".to_string());
        }
        if !(0.0 < self.min_fill_ratio && self.min_fill_ratio <= self.max_fill_ratio) {
            return Err("fill ratio bounds must satisfy 0 < min <= max".to_string());
        }
        if !(1.0 <= self.min_aspect_ratio && self.min_aspect_ratio <= self.max_aspect_ratio) {
            return Err("aspect ratio bounds must satisfy 1 <= min <= max".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_and_still_stay_distinct() {
        let live = DetectionProfile::live();
        let still = DetectionProfile::still();

        assert_eq!(live.min_fill_ratio, 0.70);
        assert_eq!(still.min_fill_ratio, 0.60);
        assert_eq!((live.min_aspect_ratio, live.max_aspect_ratio), (1.3, 2.0));
        assert_eq!((still.min_aspect_ratio, still.max_aspect_ratio), (1.2, 2.5));
        assert_eq!(live.canny_thresholds, vec![[25.0, 75.0]]);
        assert_eq!(
            still.canny_thresholds,
            vec![[30.0, 100.0], [50.0, 150.0], [25.0, 75.0]]
        );
        assert!(still.blur_sigma > live.blur_sigma);
        assert_eq!(live.threshold_block_size, 15);
        assert_eq!(live.threshold_offset, 8);
        assert_eq!(still.threshold_offset, live.threshold_offset);
        assert_eq!(still.min_area_ratio, live.min_area_ratio);
    }

    #[test]
    fn test_profiles_validate() {
        assert!(DetectionProfile::live().validate().is_ok());
        assert!(DetectionProfile::still().validate().is_ok());

        let mut bad = DetectionProfile::live();
        bad.min_vertices = 9;
        assert!(bad.validate().is_err());

        let mut bad = DetectionProfile::live();
        bad.canny_thresholds = vec![[80.0, 20.0]];
        assert!(bad.validate().is_err());
    }
}
