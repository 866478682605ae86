//! Synthetic frames with a known card rectangle
//!
//! The default card is a bright rectangle on a dark background, which is
//! what a light ID card on a desk looks like after grayscale conversion.

use crate::types::{Boundary, Frame};
use image::{Rgba, RgbaImage};

/// Pixel values of a synthetic card scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticCard {
    pub background: u8,
    pub card: u8,
}

impl Default for SyntheticCard {
    fn default() -> Self {
        Self {
            background: 40,
            card: 210,
        }
    }
}

impl SyntheticCard {
    /// Render `card` onto a `width` x `height` frame. Parts of the card
    /// outside the frame are dropped.
    pub fn render(&self, width: u32, height: u32, card: Boundary) -> Frame {
        let bg = Rgba([self.background, self.background, self.background, 255]);
        let fg = Rgba([self.card, self.card, self.card, 255]);
        let image = RgbaImage::from_fn(width, height, |x, y| {
            if card.contains_point(x, y) {
                fg
            } else {
                bg
            }
        });
        Frame::new(image, "synthetic_card")
    }
}

/// Card at `card` on the default dark background.
pub fn card_frame(width: u32, height: u32, card: Boundary) -> Frame {
    SyntheticCard::default().render(width, height, card)
}

/// Same scene with deterministic speckle noise, closer to a real sensor.
pub fn noisy_card_frame(width: u32, height: u32, card: Boundary, seed: u32) -> Frame {
    let mut frame = card_frame(width, height, card);
    for (x, y, pixel) in frame.image.enumerate_pixels_mut() {
        // Small LCG hash, amplitude +-6
        let h = (x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663) ^ seed)
            .wrapping_mul(1_103_515_245)
            .wrapping_add(12_345);
        let delta = ((h >> 16) % 13) as i16 - 6;
        for channel in pixel.0.iter_mut().take(3) {
            *channel = (*channel as i16 + delta).clamp(0, 255) as u8;
        }
    }
    frame.source = "synthetic_noisy_card".to_string();
    frame
}

/// Flat gray frame: no edges, no card.
pub fn uniform_frame(width: u32, height: u32, value: u8) -> Frame {
    let image = RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]));
    Frame::new(image, "synthetic_uniform")
}

/// Black/white checkerboard with `cell`-pixel squares. Maximally sharp.
pub fn checkerboard_frame(width: u32, height: u32, cell: u32) -> Frame {
    let cell = cell.max(1);
    let image = RgbaImage::from_fn(width, height, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    Frame::new(image, "synthetic_checkerboard")
}
