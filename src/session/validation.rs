//! Field-level validation of an extracted record
//!
//! Confidence starts at 100 and loses a fixed penalty per finding. Findings
//! never fail a scan; they come back as a score and a list of issues for
//! manual review.

use super::services::FieldMap;
use crate::config::SessionConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// 0..=100
    pub confidence: u8,
    pub issues: Vec<String>,
    /// Filled fields / total fields, 0.0..=1.0
    pub completeness: f64,
}

impl ValidationResult {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FieldValidator {
    required_fields: Vec<String>,
    national_id_field: String,
    national_id_length: usize,
    missing_field_penalty: u8,
    id_format_penalty: u8,
    completeness_threshold: f64,
    completeness_penalty: u8,
}

impl Default for FieldValidator {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

impl FieldValidator {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            required_fields: config.required_fields.clone(),
            national_id_field: config.national_id_field.clone(),
            national_id_length: config.national_id_length,
            missing_field_penalty: config.missing_field_penalty,
            id_format_penalty: config.id_format_penalty,
            completeness_threshold: config.completeness_threshold,
            completeness_penalty: config.completeness_penalty,
        }
    }

    /// Score `fields`. Pure: the same map always gives the same result.
    ///
    /// Issues are ordered: missing required fields (in configured order),
    /// then the national ID format, then completeness.
    pub fn validate(&self, fields: &FieldMap) -> ValidationResult {
        let mut confidence: i32 = 100;
        let mut issues = Vec::new();

        for field in &self.required_fields {
            if !fields.get(field).is_some_and(is_filled) {
                confidence -= self.missing_field_penalty as i32;
                issues.push(format!("Missing required field: {}", field));
            }
        }

        if let Some(value) = fields.get(&self.national_id_field).filter(|v| is_filled(v)) {
            let id = value_text(value);
            if !is_valid_national_id(&id, self.national_id_length) {
                confidence -= self.id_format_penalty as i32;
                issues.push(format!(
                    "Invalid national ID format: expected {} digits",
                    self.national_id_length
                ));
            }
        }

        let completeness = completeness(fields);
        if completeness < self.completeness_threshold {
            confidence -= self.completeness_penalty as i32;
            issues.push(format!(
                "Low field completeness: {:.0}% filled",
                completeness * 100.0
            ));
        }

        let confidence = confidence.clamp(0, 100) as u8;
        log::debug!(
            "Validated {} fields: confidence {}, {} issues",
            fields.len(),
            confidence,
            issues.len()
        );

        ValidationResult {
            confidence,
            issues,
            completeness,
        }
    }
}

/// Non-blank strings, numbers, booleans and non-empty containers count as
/// filled. `null` never does.
pub fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Only text with something other than whitespace counts towards
/// completeness.
pub fn is_filled_text(value: &Value) -> bool {
    matches!(value, Value::String(s) if !s.trim().is_empty())
}

/// Share of fields holding non-blank text. An empty map is 0% complete.
pub fn completeness(fields: &FieldMap) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }
    let filled = fields.values().filter(|v| is_filled_text(v)).count();
    filled as f64 / fields.len() as f64
}

/// Exactly `length` ASCII digits once whitespace is removed.
pub fn is_valid_national_id(value: &str, length: usize) -> bool {
    let digits: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    digits.len() == length && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Optional leading `+`, then digits with optional space or dash
/// separators. The digit count must fall in `min_digits..=max_digits`.
pub fn is_valid_contact_number(value: &str, min_digits: usize, max_digits: usize) -> bool {
    let trimmed = value.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if body.is_empty() || body.starts_with(['-', ' ']) {
        return false;
    }

    let mut digits = 0usize;
    for c in body.chars() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '-' => {}
            _ => return false,
        }
    }
    (min_digits..=max_digits).contains(&digits)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
