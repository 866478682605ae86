/// Image quality scoring
///
/// Provides the two focus/sharpness estimators used by the pipeline and the
/// label that summarizes a front/back pair for the scan session.
pub mod label;
pub mod sharpness;

pub use label::{QualityLabel, QualityThresholds};
pub use sharpness::{SharpnessEstimator, DEFAULT_SCORE};
