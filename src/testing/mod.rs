//! Testing utilities for cardscan
//!
//! Synthetic frames with known card geometry, so detection, cropping and
//! sharpness can be exercised offline without a camera.

pub mod synthetic_frames;

pub use synthetic_frames::{
    card_frame,
    checkerboard_frame,
    noisy_card_frame,
    uniform_frame,
    SyntheticCard,
};
