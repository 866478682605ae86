//! Configuration management for cardscan
//!
//! Provides configuration loading, saving, and validation for live detection,
//! crop behaviour, sharpness calibration and scan-session scoring.

use crate::detection::DetectionProfile;
use crate::errors::{Result, ScanError};
use crate::quality::QualityThresholds;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub detection: DetectionConfig,
    pub capture: CaptureConfig,
    pub quality: QualityConfig,
    pub session: SessionConfig,
}

/// Live detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Run the per-frame detection loop. Off by default: capture is manual
    /// and the live loop would only add flicker and contention.
    pub auto_capture_enabled: bool,
    /// Consecutive stable frames required before a boundary is trusted
    pub min_stable_streak: u32,
    /// Thresholds for camera frames
    pub live: DetectionProfile,
    /// Thresholds for the single-shot still-image fallback
    pub still: DetectionProfile,
}

/// Crop cascade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Padding around a boundary, as a fraction of its width/height
    pub padding_fraction: f64,
    /// Longest side of the cropped copy; larger crops are downscaled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_dimension: Option<u32>,
    /// Output image format (jpeg, png, bmp)
    pub output_format: String,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Run still-image detection when no usable boundary is supplied
    pub fallback_detection_enabled: bool,
}

/// Sharpness calibration and labelling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Score points per unit of mean adjacent-pixel luminance difference
    pub byte_diff_scale: f64,
    /// Score points per unit of Laplacian variance
    pub laplacian_scale: f64,
    pub thresholds: QualityThresholds,
}

/// Scan session and field validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fields that must be present and non-blank
    pub required_fields: Vec<String>,
    /// Key of the national ID number in the extracted field map
    pub national_id_field: String,
    /// Exact digit count of a national ID number
    pub national_id_length: usize,
    pub missing_field_penalty: u8,
    pub id_format_penalty: u8,
    /// Minimum share of filled fields (0.0-1.0)
    pub completeness_threshold: f64,
    pub completeness_penalty: u8,
    /// Digit count bounds for the contact number
    pub contact_min_digits: usize,
    pub contact_max_digits: usize,
    /// Delay before progress drops back to 0 after completion
    pub completion_reset_delay_ms: u64,
    /// Extraction calls running longer than this fail the session
    pub extraction_timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            auto_capture_enabled: false,
            min_stable_streak: 1,
            live: DetectionProfile::live(),
            still: DetectionProfile::still(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            padding_fraction: 0.05,
            max_output_dimension: None,
            output_format: "jpeg".to_string(),
            jpeg_quality: 92,
            fallback_detection_enabled: true,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            byte_diff_scale: 4.0,
            laplacian_scale: 0.1,
            thresholds: QualityThresholds::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            required_fields: vec![
                "name".to_string(),
                "national_id".to_string(),
                "nationality".to_string(),
            ],
            national_id_field: "national_id".to_string(),
            national_id_length: 12,
            missing_field_penalty: 20,
            id_format_penalty: 15,
            completeness_threshold: 0.7,
            completeness_penalty: 10,
            contact_min_digits: 7,
            contact_max_digits: 15,
            completion_reset_delay_ms: 2000,
            extraction_timeout_ms: 60_000,
        }
    }
}

impl CaptureConfig {
    pub fn image_format(&self) -> Result<image::ImageFormat> {
        image::ImageFormat::from_extension(&self.output_format).ok_or_else(|| {
            ScanError::Config(format!("Unsupported output format: {}", self.output_format))
        })
    }

    /// File extension matching `output_format`.
    pub fn extension(&self) -> Result<&'static str> {
        let format = self.image_format()?;
        format
            .extensions_str()
            .first()
            .copied()
            .ok_or_else(|| ScanError::Config(format!("No extension for {:?}", format)))
    }
}

impl SessionConfig {
    pub fn completion_reset_delay(&self) -> Duration {
        Duration::from_millis(self.completion_reset_delay_ms)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }
}

impl ScanConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScanError::Config(format!("Failed to read config file: {}", e)))?;

        let config: ScanConfig = toml::from_str(&contents)
            .map_err(|e| ScanError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ScanError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ScanError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| ScanError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("cardscan.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.detection
            .live
            .validate()
            .map_err(|e| ScanError::Config(format!("live profile: {}", e)))?;
        self.detection
            .still
            .validate()
            .map_err(|e| ScanError::Config(format!("still profile: {}", e)))?;

        let capture = &self.capture;
        if !(0.0..=0.5).contains(&capture.padding_fraction) {
            return Err(ScanError::Config(
                "Padding fraction must be between 0.0 and 0.5".to_string(),
            ));
        }
        if capture.max_output_dimension == Some(0) {
            return Err(ScanError::Config(
                "Max output dimension must be positive".to_string(),
            ));
        }
        if capture.jpeg_quality == 0 || capture.jpeg_quality > 100 {
            return Err(ScanError::Config(
                "JPEG quality must be between 1 and 100".to_string(),
            ));
        }
        capture.image_format()?;

        let quality = &self.quality;
        if quality.byte_diff_scale <= 0.0 || quality.laplacian_scale <= 0.0 {
            return Err(ScanError::Config(
                "Sharpness scale factors must be positive".to_string(),
            ));
        }
        let t = &quality.thresholds;
        if !(t.excellent >= t.good && t.good >= t.fair && t.excellent <= 100) {
            return Err(ScanError::Config(
                "Quality thresholds must satisfy fair <= good <= excellent <= 100".to_string(),
            ));
        }

        let session = &self.session;
        if session.national_id_length == 0 {
            return Err(ScanError::Config(
                "National ID length must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&session.completeness_threshold) {
            return Err(ScanError::Config(
                "Completeness threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if session.contact_min_digits == 0 || session.contact_min_digits > session.contact_max_digits
        {
            return Err(ScanError::Config(
                "Contact digit bounds must satisfy 0 < min <= max".to_string(),
            ));
        }
        if session.extraction_timeout_ms == 0 {
            return Err(ScanError::Config(
                "Extraction timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert!(!config.detection.auto_capture_enabled);
        assert_eq!(config.capture.padding_fraction, 0.05);
        assert_eq!(config.session.national_id_length, 12);
        assert_eq!(config.session.required_fields.len(), 3);
        assert_eq!(config.session.completion_reset_delay_ms, 2000);
    }

    #[test]
    fn test_config_validation() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());

        let mut bad_padding = config.clone();
        bad_padding.capture.padding_fraction = 0.9;
        assert!(bad_padding.validate().is_err());

        let mut bad_format = ScanConfig::default();
        bad_format.capture.output_format = "docx".to_string();
        assert!(bad_format.validate().is_err());

        let mut bad_contact = ScanConfig::default();
        bad_contact.session.contact_min_digits = 20;
        assert!(bad_contact.validate().is_err());

        let mut bad_profile = ScanConfig::default();
        bad_profile.detection.live.canny_thresholds.clear();
        assert!(bad_profile.validate().is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("cardscan.toml");

        let mut config = ScanConfig::default();
        config.detection.auto_capture_enabled = true;
        config.capture.max_output_dimension = Some(1600);
        assert!(config.save_to_file(&config_path).is_ok());

        let loaded = ScanConfig::load_from_file(&config_path).unwrap();
        assert!(loaded.detection.auto_capture_enabled);
        assert_eq!(loaded.capture.max_output_dimension, Some(1600));
        assert_eq!(
            loaded.detection.still.canny_thresholds,
            config.detection.still.canny_thresholds
        );
    }

    #[test]
    fn test_config_toml_format() {
        let config = ScanConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[detection]"));
        assert!(toml_string.contains("[capture]"));
        assert!(toml_string.contains("[quality]"));
        assert!(toml_string.contains("[session]"));
        assert!(toml_string.contains("auto_capture_enabled"));
        assert!(toml_string.contains("padding_fraction"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        fs::write(&path, "[detection]\nauto_capture_enabled = true\n").unwrap();

        let loaded = ScanConfig::load_from_file(&path).unwrap();
        assert!(loaded.detection.auto_capture_enabled);
        assert_eq!(loaded.detection.live.min_fill_ratio, 0.70);
        assert_eq!(loaded.session.id_format_penalty, 15);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ScanConfig::load_from_file("nonexistent_cardscan.toml");
        assert!(result.is_ok());
        assert_eq!(result.unwrap().capture.jpeg_quality, 92);
    }

    #[test]
    fn test_extension_for_format() {
        let config = CaptureConfig::default();
        assert_eq!(config.extension().unwrap(), "jpg");
        assert_eq!(config.image_format().unwrap(), image::ImageFormat::Jpeg);
    }
}
