/// Card detection
///
/// Geometric detection of a card-shaped rectangle in camera frames and
/// stills, temporal stability filtering of the per-frame results, and the
/// session object that drives the live per-frame loop.
pub mod candidate;
pub mod detector;
pub mod profile;
pub mod session;
pub mod stability;

pub use candidate::Candidate;
pub use detector::{CardDetector, DetectionSample};
pub use profile::DetectionProfile;
pub use session::{DetectorSession, FrameSource};
pub use stability::{DetectionHistory, StabilityFilter, StableDetectionState};
