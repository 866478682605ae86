use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary of the sharpness of a front/back pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLabel {
    Poor,
    Fair,
    Good,
    Excellent,
}

/// Strict lower bounds each side must exceed for a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityThresholds {
    pub excellent: u8,
    pub good: u8,
    pub fair: u8,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            excellent: 80,
            good: 60,
            fair: 40,
        }
    }
}

impl QualityLabel {
    /// Label a pair of per-side scores. The weaker side decides.
    pub fn from_scores(front: u8, back: u8, thresholds: &QualityThresholds) -> Self {
        let weakest = front.min(back);
        if weakest > thresholds.excellent {
            QualityLabel::Excellent
        } else if weakest > thresholds.good {
            QualityLabel::Good
        } else if weakest > thresholds.fair {
            QualityLabel::Fair
        } else {
            QualityLabel::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLabel::Poor => "poor",
            QualityLabel::Fair => "fair",
            QualityLabel::Good => "good",
            QualityLabel::Excellent => "excellent",
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_rule() {
        let t = QualityThresholds::default();
        assert_eq!(QualityLabel::from_scores(85, 90, &t), QualityLabel::Excellent);
        assert_eq!(QualityLabel::from_scores(45, 50, &t), QualityLabel::Fair);
        assert_eq!(QualityLabel::from_scores(61, 99, &t), QualityLabel::Good);
        assert_eq!(QualityLabel::from_scores(95, 30, &t), QualityLabel::Poor);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let t = QualityThresholds::default();
        assert_eq!(QualityLabel::from_scores(80, 100, &t), QualityLabel::Good);
        assert_eq!(QualityLabel::from_scores(60, 60, &t), QualityLabel::Fair);
        assert_eq!(QualityLabel::from_scores(40, 40, &t), QualityLabel::Poor);
    }

    #[test]
    fn test_serialized_lowercase() {
        let json = serde_json::to_string(&QualityLabel::Excellent).unwrap();
        assert_eq!(json, "\"excellent\"");
    }
}
