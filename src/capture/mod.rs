/// Still capture and cropping
///
/// Turns a captured frame into two images per card side: a cropped copy for
/// display and the untouched original for the extraction service.
pub mod cascade;

pub use cascade::CropCascade;

use crate::errors::Result;
use crate::types::{CardImage, CardSide};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which cascade stage produced the cropped copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropStrategy {
    /// Padded crop around the caller's boundary
    Boundary,
    /// Padded crop around a still-image detection
    FallbackDetection,
    /// No usable region; the whole frame
    FullFrame,
}

#[derive(Debug, Clone)]
pub struct CaptureOutput {
    /// Display copy. Never send this to the extraction service.
    pub cropped: CardImage,
    /// Submission copy, pixel-identical to the captured frame.
    pub original: CardImage,
    pub strategy: CropStrategy,
}

impl CaptureOutput {
    pub fn side(&self) -> CardSide {
        self.original.side()
    }

    /// Write both copies into `dir` as `{side}_cropped.{ext}` and
    /// `{side}_original.{ext}`. Returns `(cropped_path, original_path)`.
    pub fn save_to_dir<P: AsRef<Path>>(
        &self,
        dir: P,
        format: image::ImageFormat,
        jpeg_quality: u8,
    ) -> Result<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let extension = format.extensions_str().first().copied().unwrap_or("img");
        let save = |image: &CardImage| -> Result<PathBuf> {
            let path = dir.join(image.file_name(extension));
            fs::write(&path, image.encode_with_quality(format, jpeg_quality)?)?;
            log::debug!("Saved {} copy to {:?}", image.role(), path);
            Ok(path)
        };

        let cropped_path = save(&self.cropped)?;
        let original_path = save(&self.original)?;
        Ok((cropped_path, original_path))
    }
}
