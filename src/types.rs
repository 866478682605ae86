//! Core value types shared by the detection, capture and session stages.

use crate::errors::{Result, ScanError};
use chrono::{DateTime, Utc};
use image::{DynamicImage, GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One moment of video or one still photo.
///
/// Frames are moved from stage to stage and never shared mutably.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbaImage,
    pub source: String,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: RgbaImage, source: impl Into<String>) -> Self {
        Self {
            image,
            source: source.into(),
            captured_at: Utc::now(),
        }
    }

    /// Wrap a raw RGBA8 buffer. The buffer length must be `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>, source: &str) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ScanError::InvalidInput(format!(
                "RGBA buffer is {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }
        let image = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            ScanError::InvalidInput(format!("cannot build {}x{} RGBA frame", width, height))
        })?;
        Ok(Self::new(image, source))
    }

    pub fn from_dynamic(image: DynamicImage, source: impl Into<String>) -> Self {
        Self::new(image.to_rgba8(), source)
    }

    /// Decode an encoded still image (JPEG, PNG, ...).
    pub fn from_bytes(bytes: &[u8], source: impl Into<String>) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| ScanError::Acquisition(format!("failed to decode image: {}", e)))?;
        Ok(Self::from_dynamic(image, source))
    }

    /// Load a still image from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|e| {
            ScanError::Acquisition(format!("failed to open {}: {}", path.display(), e))
        })?;
        log::debug!(
            "Loaded {}x{} frame from {:?}",
            image.width(),
            image.height(),
            path
        );
        Ok(Self::from_dynamic(image, path.display().to_string()))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn to_luma(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }
}

/// Axis-aligned card region in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Boundary {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Boundary {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// `max(w, h) / min(w, h)`, or 0 for a degenerate box.
    pub fn aspect_ratio(&self) -> f64 {
        let (long, short) = if self.width >= self.height {
            (self.width, self.height)
        } else {
            (self.height, self.width)
        };
        if short == 0 {
            return 0.0;
        }
        long as f64 / short as f64
    }

    /// Non-empty and entirely inside a `frame_width` x `frame_height` frame.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.right() <= frame_width as u64
            && self.bottom() <= frame_height as u64
    }

    /// Intersect with the frame. `None` when nothing non-empty remains.
    pub fn clamped_to(&self, frame_width: u32, frame_height: u32) -> Option<Boundary> {
        let x0 = self.x.min(frame_width);
        let y0 = self.y.min(frame_height);
        let x1 = self.right().min(frame_width as u64) as u32;
        let y1 = self.bottom().min(frame_height as u64) as u32;
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Boundary::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Grow each side by `fraction` of the box's own width/height, then clamp.
    pub fn padded(&self, fraction: f64, frame_width: u32, frame_height: u32) -> Option<Boundary> {
        let pad_x = (self.width as f64 * fraction).round().max(0.0) as i64;
        let pad_y = (self.height as f64 * fraction).round().max(0.0) as i64;

        let x0 = (self.x as i64 - pad_x).max(0);
        let y0 = (self.y as i64 - pad_y).max(0);
        let x1 = (self.right() as i64 + pad_x).min(frame_width as i64);
        let y1 = (self.bottom() as i64 + pad_y).min(frame_height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Boundary::new(
            x0 as u32,
            y0 as u32,
            (x1 - x0) as u32,
            (y1 - y0) as u32,
        ))
    }

    pub fn contains_point(&self, px: u32, py: u32) -> bool {
        px >= self.x && (px as u64) < self.right() && py >= self.y && (py as u64) < self.bottom()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSide {
    Front,
    Back,
}

impl CardSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardSide::Front => "front",
            CardSide::Back => "back",
        }
    }
}

impl std::fmt::Display for CardSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CardSide {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "front" => Ok(CardSide::Front),
            "back" => Ok(CardSide::Back),
            other => Err(ScanError::InvalidInput(format!("unknown card side: {}", other))),
        }
    }
}

/// A finalized still image of one card side.
///
/// Each side produces two of these: the cropped display copy and the
/// untouched original that goes to the extraction service.
#[derive(Debug, Clone)]
pub struct CardImage {
    image: RgbaImage,
    side: CardSide,
    cropped: bool,
}

impl CardImage {
    pub fn cropped(image: RgbaImage, side: CardSide) -> Self {
        Self {
            image,
            side,
            cropped: true,
        }
    }

    pub fn original(image: RgbaImage, side: CardSide) -> Self {
        Self {
            image,
            side,
            cropped: false,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn side(&self) -> CardSide {
        self.side
    }

    pub fn is_cropped(&self) -> bool {
        self.cropped
    }

    pub fn role(&self) -> &'static str {
        if self.cropped {
            "cropped"
        } else {
            "original"
        }
    }

    /// `front_cropped.jpg`, `back_original.png`, ...
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}_{}.{}", self.side.as_str(), self.role(), extension)
    }

    /// Encode into `format` for transport or storage.
    pub fn encode(&self, format: image::ImageFormat) -> Result<Vec<u8>> {
        self.encode_with_quality(format, 92)
    }

    /// Like [`CardImage::encode`], with an explicit JPEG quality (1-100).
    pub fn encode_with_quality(&self, format: image::ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        if format == image::ImageFormat::Jpeg {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgba8(self.image.clone()).to_rgb8();
            let mut encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, jpeg_quality.clamp(1, 100));
            encoder.encode_image(&rgb)?;
        } else {
            self.image.write_to(&mut buffer, format)?;
        }
        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_clamp_inside_frame() {
        let b = Boundary::new(10, 10, 50, 30);
        assert_eq!(b.clamped_to(100, 100), Some(b));
    }

    #[test]
    fn test_boundary_clamp_overhang() {
        let b = Boundary::new(80, 90, 50, 30);
        let clamped = b.clamped_to(100, 100).unwrap();
        assert_eq!(clamped, Boundary::new(80, 90, 20, 10));
        assert!(clamped.fits_within(100, 100));
    }

    #[test]
    fn test_boundary_clamp_outside_frame() {
        assert_eq!(Boundary::new(150, 10, 20, 20).clamped_to(100, 100), None);
        assert_eq!(Boundary::new(10, 10, 0, 20).clamped_to(100, 100), None);
    }

    #[test]
    fn test_boundary_padding() {
        let b = Boundary::new(100, 100, 200, 100);
        let padded = b.padded(0.05, 1000, 1000).unwrap();
        assert_eq!(padded, Boundary::new(90, 95, 220, 110));
    }

    #[test]
    fn test_boundary_padding_clamped_at_edges() {
        let b = Boundary::new(2, 0, 200, 100);
        let padded = b.padded(0.05, 205, 100).unwrap();
        assert_eq!(padded.x, 0);
        assert_eq!(padded.y, 0);
        assert!(padded.fits_within(205, 100));
    }

    #[test]
    fn test_aspect_ratio() {
        assert!((Boundary::new(0, 0, 160, 100).aspect_ratio() - 1.6).abs() < 1e-9);
        assert!((Boundary::new(0, 0, 100, 160).aspect_ratio() - 1.6).abs() < 1e-9);
        assert_eq!(Boundary::new(0, 0, 0, 10).aspect_ratio(), 0.0);
    }

    #[test]
    fn test_frame_from_rgba_rejects_bad_length() {
        let result = Frame::from_rgba(4, 4, vec![0u8; 10], "test");
        assert!(matches!(result, Err(ScanError::InvalidInput(_))));
        assert!(Frame::from_rgba(4, 4, vec![0u8; 64], "test").is_ok());
    }

    #[test]
    fn test_frame_from_bytes_rejects_garbage() {
        let result = Frame::from_bytes(b"not an image", "upload");
        assert!(matches!(result, Err(ScanError::Acquisition(_))));
    }

    #[test]
    fn test_card_image_naming() {
        let img = RgbaImage::new(2, 2);
        let cropped = CardImage::cropped(img.clone(), CardSide::Front);
        let original = CardImage::original(img, CardSide::Back);
        assert_eq!(cropped.file_name("jpg"), "front_cropped.jpg");
        assert_eq!(original.file_name("png"), "back_original.png");
        assert!(cropped.is_cropped());
        assert!(!original.is_cropped());
    }

    #[test]
    fn test_card_side_parse() {
        assert_eq!("Front".parse::<CardSide>().unwrap(), CardSide::Front);
        assert_eq!("back".parse::<CardSide>().unwrap(), CardSide::Back);
        assert!("side".parse::<CardSide>().is_err());
    }
}
