//! Runtime invariant checks with contract-test support
//!
//! Geometry that leaves the detector or the crop cascade must lie inside the
//! frame it came from. Those exits call [`assert_invariant!`], which records
//! the check per thread so a test can later prove the guard actually ran.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cardscan::invariant_ppt::*;
//!
//! assert_invariant!(
//!     region.fits_within(width, height),
//!     "Crop region lies inside the frame",
//!     "capture"
//! );
//!
//! #[test]
//! fn contract_capture() {
//!     // ... run a capture ...
//!     contract_test("capture", &["Crop region lies inside the frame"]);
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::thread_local;

thread_local! {
    static INVARIANT_LOG: RefCell<HashMap<String, u64>> = RefCell::new(HashMap::new());
}

/// Assert an invariant and record it for contract testing.
///
/// # Panics
/// Panics if the condition is false.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $message:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, None)
    };
    ($condition:expr, $message:expr, $context:expr) => {
        $crate::invariant_ppt::__assert_invariant_impl($condition, $message, Some($context))
    };
}

#[doc(hidden)]
pub fn __assert_invariant_impl(condition: bool, message: &str, context: Option<&str>) {
    INVARIANT_LOG.with(|log| {
        *log.borrow_mut().entry(message.to_string()).or_insert(0) += 1;
    });

    if !condition {
        let ctx = context.unwrap_or("unknown");
        log::error!("Invariant violated [{}]: {}", ctx, message);
        panic!("INVARIANT VIOLATION [{}]: {}", ctx, message);
    }
}

/// How many times `message` was checked on this thread since the last clear.
pub fn invariant_check_count(message: &str) -> u64 {
    INVARIANT_LOG.with(|log| log.borrow().get(message).copied().unwrap_or(0))
}

/// Check that every invariant in `required_invariants` was verified on this
/// thread.
///
/// # Panics
/// Panics listing the invariants that were never checked.
pub fn contract_test(test_name: &str, required_invariants: &[&str]) {
    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|invariant| invariant_check_count(invariant) == 0)
        .collect();

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: The following invariants were not checked:\n  - {}",
            test_name,
            missing.join("\n  - ")
        );
    }
}

pub fn clear_invariant_log() {
    INVARIANT_LOG.with(|log| log.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CropCascade;
    use crate::config::CaptureConfig;
    use crate::detection::CardDetector;
    use crate::testing::{card_frame, uniform_frame};
    use crate::types::{Boundary, CardSide};
    use std::sync::Arc;

    #[test]
    fn test_passing_invariant_is_counted() {
        clear_invariant_log();
        assert_invariant!(1 + 1 == 2, "arithmetic holds");
        assert_invariant!(true, "arithmetic holds", "tests");
        assert_eq!(invariant_check_count("arithmetic holds"), 2);
        assert_eq!(invariant_check_count("never checked"), 0);
    }

    #[test]
    #[should_panic(expected = "INVARIANT VIOLATION [tests]: box is empty")]
    fn test_failing_invariant_panics() {
        assert_invariant!(false, "box is empty", "tests");
    }

    #[test]
    #[should_panic(expected = "CONTRACT FAILURE [missing]")]
    fn test_contract_reports_unchecked_invariant() {
        clear_invariant_log();
        contract_test("missing", &["Detected boundary lies inside the frame"]);
    }

    #[test]
    fn contract_detector_boundary() {
        clear_invariant_log();
        let detector = CardDetector::default();
        let sample = detector.detect(&card_frame(320, 240, Boundary::new(80, 60, 160, 100)));
        assert!(sample.found);
        contract_test("detector", &["Detected boundary lies inside the frame"]);
    }

    #[test]
    fn contract_capture_region() {
        clear_invariant_log();
        let cascade =
            CropCascade::new(&CaptureConfig::default(), Arc::new(CardDetector::default()));
        cascade.capture(
            uniform_frame(200, 100, 90),
            Some(Boundary::new(150, 50, 100, 100)),
            CardSide::Front,
        );
        contract_test("capture", &["Crop region lies inside the frame"]);
    }
}
