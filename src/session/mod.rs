/// Scan session orchestration
///
/// A [`ScanSession`] takes the two submission originals of a card plus an
/// identifying contact number through quality check, extraction and field
/// validation. Every transition is published as a [`ScanSnapshot`] on a
/// `watch` channel.
pub mod services;
pub mod validation;

pub use services::{
    ExtractionRequest, ExtractionResponse, ExtractionService, FieldMap, RecordUpdateService,
};
pub use validation::{FieldValidator, ValidationResult};

use crate::capture::CaptureOutput;
use crate::config::{ScanConfig, SessionConfig};
use crate::errors::{Result, ScanError};
use crate::quality::{QualityLabel, QualityThresholds, SharpnessEstimator};
use crate::types::{CardImage, CardSide};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    QualityCheck,
    Preprocessing,
    Extracting,
    Validating,
    Complete,
    Error,
}

impl ScanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::QualityCheck => "quality_check",
            ScanState::Preprocessing => "preprocessing",
            ScanState::Extracting => "extracting",
            ScanState::Validating => "validating",
            ScanState::Complete => "complete",
            ScanState::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanState::Complete | ScanState::Error)
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The structured record held once a scan completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub record_id: String,
    pub fields: FieldMap,
    pub completed_at: DateTime<Utc>,
}

/// Everything an observer of a session needs to render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSnapshot {
    pub session_id: Uuid,
    pub state: ScanState,
    /// 0..=100
    pub progress_percent: u8,
    pub step_label: Option<String>,
    pub image_quality: Option<QualityLabel>,
    pub front_sharpness: Option<u8>,
    pub back_sharpness: Option<u8>,
    pub extraction_confidence: Option<u8>,
    pub issues: Vec<String>,
    pub record: Option<ScanRecord>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl ScanSnapshot {
    fn idle(session_id: Uuid) -> Self {
        Self {
            session_id,
            state: ScanState::Idle,
            progress_percent: 0,
            step_label: None,
            image_quality: None,
            front_sharpness: None,
            back_sharpness: None,
            extraction_confidence: None,
            issues: Vec::new(),
            record: None,
            error_message: None,
            started_at: Utc::now(),
        }
    }
}

/// One front/back scan, from captured originals to a validated record.
///
/// Steps run strictly in order and are never cancelled midway: each either
/// completes or moves the session to [`ScanState::Error`]. Nothing is
/// retried; call [`ScanSession::reset`] and run again.
pub struct ScanSession {
    id: Uuid,
    config: SessionConfig,
    estimator: SharpnessEstimator,
    thresholds: QualityThresholds,
    validator: FieldValidator,
    front: Option<CardImage>,
    back: Option<CardImage>,
    identifier: Option<String>,
    snapshot_tx: Arc<watch::Sender<ScanSnapshot>>,
    reset_task: Option<JoinHandle<()>>,
}

impl ScanSession {
    pub fn new(config: &ScanConfig) -> Self {
        let id = Uuid::new_v4();
        let (snapshot_tx, _) = watch::channel(ScanSnapshot::idle(id));
        log::debug!("Created scan session {}", id);
        Self {
            id,
            config: config.session.clone(),
            estimator: SharpnessEstimator::from_config(&config.quality),
            thresholds: config.quality.thresholds,
            validator: FieldValidator::from_config(&config.session),
            front: None,
            back: None,
            identifier: None,
            snapshot_tx: Arc::new(snapshot_tx),
            reset_task: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Store a submission original for its side. Cropped display copies are
    /// rejected: only originals go to extraction.
    pub fn set_image(&mut self, image: CardImage) -> Result<()> {
        if image.is_cropped() {
            return Err(ScanError::InvalidInput(format!(
                "{} image is a cropped display copy, submit the original",
                image.side()
            )));
        }
        match image.side() {
            CardSide::Front => self.front = Some(image),
            CardSide::Back => self.back = Some(image),
        }
        Ok(())
    }

    /// Keep the original half of a capture.
    pub fn set_capture(&mut self, output: &CaptureOutput) -> Result<()> {
        self.set_image(output.original.clone())
    }

    /// Store the identifying contact number after its format check.
    pub fn set_identifier(&mut self, value: &str) -> Result<()> {
        if !validation::is_valid_contact_number(
            value,
            self.config.contact_min_digits,
            self.config.contact_max_digits,
        ) {
            return Err(ScanError::InvalidInput(format!(
                "contact number must have {}-{} digits",
                self.config.contact_min_digits, self.config.contact_max_digits
            )));
        }
        self.identifier = Some(value.trim().to_string());
        Ok(())
    }

    pub fn has_image(&self, side: CardSide) -> bool {
        match side {
            CardSide::Front => self.front.is_some(),
            CardSide::Back => self.back.is_some(),
        }
    }

    /// Both originals and a valid identifier are present.
    pub fn can_start(&self) -> bool {
        self.front.is_some() && self.back.is_some() && self.identifier.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn state(&self) -> ScanState {
        self.snapshot_tx.borrow().state
    }

    /// Drive the session from `Idle` to `Complete` or `Error`.
    ///
    /// Stays in `Idle` when inputs are incomplete or the session has already
    /// run. The returned snapshot is the final one; failures are reported in
    /// its `state` and `error_message`.
    pub async fn run<E: ExtractionService>(&mut self, service: &E) -> ScanSnapshot {
        if self.state() != ScanState::Idle {
            log::warn!(
                "Session {} is {}, reset before running again",
                self.id,
                self.state()
            );
            return self.snapshot();
        }
        let (front, back, identifier) = match (&self.front, &self.back, &self.identifier) {
            (Some(front), Some(back), Some(identifier)) => {
                (front.clone(), back.clone(), identifier.clone())
            }
            _ => {
                log::info!(
                    "Session {} not started: front={}, back={}, identifier={}",
                    self.id,
                    self.front.is_some(),
                    self.back.is_some(),
                    self.identifier.is_some()
                );
                return self.snapshot();
            }
        };
        self.snapshot_tx.send_modify(|s| s.started_at = Utc::now());

        // Quality check on the whole originals
        self.transition(ScanState::QualityCheck, 10, "Checking image quality");
        let front_score = self.estimator.score_byte_difference(front.image());
        let back_score = self.estimator.score_byte_difference(back.image());
        let label = QualityLabel::from_scores(front_score, back_score, &self.thresholds);
        log::info!(
            "Session {} image quality {} (front {}, back {})",
            self.id,
            label,
            front_score,
            back_score
        );
        self.snapshot_tx.send_modify(|s| {
            s.front_sharpness = Some(front_score);
            s.back_sharpness = Some(back_score);
            s.image_quality = Some(label);
        });

        // Pass-through: contrast and brightness changes hurt extraction
        self.transition(ScanState::Preprocessing, 25, "Preparing images");

        self.transition(ScanState::Extracting, 50, "Extracting card details");
        let request = ExtractionRequest {
            front,
            back,
            identifier,
        };
        let timeout = self.config.extraction_timeout();
        let response = match tokio::time::timeout(timeout, service.extract(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return self.fail(e),
            Err(_) => return self.fail(ScanError::Timeout(self.config.extraction_timeout_ms)),
        };
        self.set_progress(75, "Card details received");

        self.transition(ScanState::Validating, 75, "Validating fields");
        let validation = self.validator.validate(&response.fields);

        let record = ScanRecord {
            record_id: response.record_id,
            fields: response.fields,
            completed_at: Utc::now(),
        };
        log::info!(
            "Session {} complete: record {}, confidence {}, {} issues",
            self.id,
            record.record_id,
            validation.confidence,
            validation.issues.len()
        );
        self.snapshot_tx.send_modify(|s| {
            s.state = ScanState::Complete;
            s.progress_percent = 100;
            s.step_label = Some("Scan complete".to_string());
            s.extraction_confidence = Some(validation.confidence);
            s.issues = validation.issues;
            s.record = Some(record);
        });
        self.schedule_progress_reset();

        self.snapshot()
    }

    /// Push edited fields of a completed scan to the record service.
    ///
    /// The session state does not change; the local record mirrors the
    /// update once the service accepts it.
    pub async fn update_record<U: RecordUpdateService>(
        &self,
        service: &U,
        fields: FieldMap,
    ) -> Result<()> {
        let record_id = match &self.snapshot_tx.borrow().record {
            Some(record) => record.record_id.clone(),
            None => {
                return Err(ScanError::InvalidInput(
                    "no completed record to update".to_string(),
                ))
            }
        };

        service.update_record(&record_id, &fields).await?;
        log::info!("Updated record {} ({} fields)", record_id, fields.len());
        self.snapshot_tx.send_modify(|s| {
            if let Some(record) = s.record.as_mut() {
                record.fields = fields;
            }
        });
        Ok(())
    }

    /// Back to `Idle`, keeping the stored images and identifier.
    pub fn reset(&mut self) {
        if let Some(task) = self.reset_task.take() {
            task.abort();
        }
        self.snapshot_tx.send_replace(ScanSnapshot::idle(self.id));
        log::debug!("Session {} reset", self.id);
    }

    /// Back to `Idle` and forget all inputs.
    pub fn clear(&mut self) {
        self.front = None;
        self.back = None;
        self.identifier = None;
        self.reset();
    }

    fn transition(&self, state: ScanState, progress: u8, label: &str) {
        log::info!("Session {} -> {} ({}%)", self.id, state, progress);
        self.snapshot_tx.send_modify(|s| {
            s.state = state;
            s.progress_percent = progress;
            s.step_label = Some(label.to_string());
        });
    }

    fn set_progress(&self, progress: u8, label: &str) {
        self.snapshot_tx.send_modify(|s| {
            s.progress_percent = progress;
            s.step_label = Some(label.to_string());
        });
    }

    fn fail(&self, error: ScanError) -> ScanSnapshot {
        log::error!(
            "Session {} failed during {}: {}",
            self.id,
            self.state(),
            error
        );
        self.snapshot_tx.send_modify(|s| {
            s.state = ScanState::Error;
            s.progress_percent = 0;
            s.step_label = None;
            s.error_message = Some(error.to_string());
        });
        self.snapshot()
    }

    // Display-only: the state stays Complete
    fn schedule_progress_reset(&mut self) {
        let delay = self.config.completion_reset_delay();
        let snapshot_tx = Arc::clone(&self.snapshot_tx);
        self.reset_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            snapshot_tx.send_modify(|s| {
                if s.state == ScanState::Complete {
                    s.progress_percent = 0;
                }
            });
        }));
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if let Some(task) = self.reset_task.take() {
            task.abort();
        }
    }
}
