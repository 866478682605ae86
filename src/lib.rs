//! cardscan: identity card framing, cropping and scan sessions
//!
//! This crate turns camera frames or still photos of an ID card into a
//! well-framed front/back pair and drives that pair through quality check,
//! remote field extraction and field validation.
//!
//! # Features
//! - Geometric card detection on live frames and stills
//! - Temporal stability filtering to suppress flicker
//! - A crop cascade that always yields a usable image
//! - Sharpness scoring for live frames and whole-file triage
//! - An observable scan-session state machine
//!
//! # Usage
//! ```rust,ignore
//! use cardscan::{CardDetector, CardSide, CropCascade, Frame, ScanConfig};
//! use std::sync::Arc;
//!
//! let config = ScanConfig::load_or_default();
//! let detector = Arc::new(CardDetector::from_config(&config));
//! let cascade = CropCascade::new(&config.capture, detector.clone());
//!
//! let frame = Frame::open("front.jpg")?;
//! let sample = detector.detect_still(&frame);
//! let output = cascade.capture(frame, sample.boundary, CardSide::Front);
//! output.save_to_dir("out", config.capture.image_format()?, config.capture.jpeg_quality)?;
//! ```
pub mod capture;
pub mod config;
pub mod detection;
pub mod errors;
pub mod invariant_ppt;
pub mod quality;
pub mod session;
pub mod types;
pub mod vision;

// Testing utilities - synthetic frames for offline testing
pub mod testing;

// Re-exports for convenience
pub use capture::{CaptureOutput, CropCascade, CropStrategy};
pub use config::ScanConfig;
pub use detection::{
    CardDetector, DetectionSample, DetectorSession, FrameSource, StabilityFilter,
    StableDetectionState,
};
pub use errors::{Result, ScanError};
pub use quality::{QualityLabel, SharpnessEstimator};
pub use session::{
    ExtractionService, FieldMap, RecordUpdateService, ScanSession, ScanSnapshot, ScanState,
    ValidationResult,
};
pub use types::{Boundary, CardImage, CardSide, Frame};

/// Initialize logging for the scan pipeline
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "cardscan=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        auto_capture_default: config::DetectionConfig::default().auto_capture_enabled,
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub auto_capture_default: bool,
}
