use super::{CardDetector, StabilityFilter, StableDetectionState};
use crate::config::DetectionConfig;
use crate::errors::Result;
use crate::types::{Boundary, Frame};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Supplies frames to the detection loop. `Ok(None)` ends the stream.
pub trait FrameSource: Send + 'static {
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<Frame>>> + Send;
}

impl FrameSource for mpsc::Receiver<Frame> {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.recv().await)
    }
}

struct Tracker {
    filter: StabilityFilter,
    last_boundary: Option<Boundary>,
    /// Bumped on every start and stop. A loop only publishes while the
    /// generation it was started with is current.
    generation: u64,
}

impl Tracker {
    fn reset(&mut self) {
        self.filter.reset();
        self.last_boundary = None;
    }
}

/// Owns everything live detection needs: the detector, the stability filter,
/// the last trusted boundary and the per-frame task.
///
/// Observers call [`DetectorSession::subscribe`] and receive every recomputed
/// [`StableDetectionState`].
pub struct DetectorSession {
    detector: Arc<CardDetector>,
    tracker: Arc<Mutex<Tracker>>,
    state_tx: Arc<watch::Sender<StableDetectionState>>,
    task: Option<JoinHandle<()>>,
    auto_capture_enabled: bool,
    min_stable_streak: u32,
}

impl DetectorSession {
    pub fn new(detector: Arc<CardDetector>, config: &DetectionConfig) -> Self {
        let (state_tx, _) = watch::channel(StableDetectionState::default());
        Self {
            detector,
            tracker: Arc::new(Mutex::new(Tracker {
                filter: StabilityFilter::new(),
                last_boundary: None,
                generation: 0,
            })),
            state_tx: Arc::new(state_tx),
            task: None,
            auto_capture_enabled: config.auto_capture_enabled,
            min_stable_streak: config.min_stable_streak,
        }
    }

    pub fn auto_capture_enabled(&self) -> bool {
        self.auto_capture_enabled
    }

    pub fn subscribe(&self) -> watch::Receiver<StableDetectionState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> StableDetectionState {
        *self.state_tx.borrow()
    }

    /// Most recent stable boundary, kept after stability drops so a manual
    /// capture can still use it.
    pub fn last_boundary(&self) -> Option<Boundary> {
        lock(&self.tracker).last_boundary
    }

    /// Boundary to hand to the crop cascade: only once the stable streak has
    /// reached the configured minimum.
    pub fn capture_boundary(&self) -> Option<Boundary> {
        let state = self.state();
        if state.is_stable && state.stable_streak >= self.min_stable_streak {
            state.boundary
        } else {
            None
        }
    }

    /// Run detection on one frame and publish the result.
    pub fn process_frame(&self, frame: &Frame) -> StableDetectionState {
        let sample = self.detector.detect(frame);
        let mut tracker = lock(&self.tracker);
        publish(&mut tracker, &self.state_tx, &sample)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start the per-frame loop over `source`.
    ///
    /// Returns `false` without spawning anything when auto-capture is
    /// disabled. Each iteration starts only after the previous frame has been
    /// fully processed.
    pub fn start<S: FrameSource>(&mut self, mut source: S) -> bool {
        if !self.auto_capture_enabled {
            log::info!("Auto-capture disabled, live detection loop not started");
            return false;
        }
        self.stop();

        let generation = {
            let mut tracker = lock(&self.tracker);
            tracker.generation += 1;
            tracker.generation
        };
        let detector = Arc::clone(&self.detector);
        let tracker = Arc::clone(&self.tracker);
        let state_tx = Arc::clone(&self.state_tx);

        log::info!("Starting live card detection");
        self.task = Some(tokio::spawn(async move {
            let mut frames: u64 = 0;
            loop {
                let frame = match source.next_frame().await {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        log::info!("Frame source ended after {} frames", frames);
                        break;
                    }
                    Err(e) => {
                        log::warn!("Frame source failed after {} frames: {}", frames, e);
                        break;
                    }
                };
                frames += 1;

                let worker = Arc::clone(&detector);
                let sample = match tokio::task::spawn_blocking(move || worker.detect(&frame)).await
                {
                    Ok(sample) => sample,
                    Err(e) => {
                        log::warn!("Detection worker failed: {}", e);
                        continue;
                    }
                };

                if publish_current(&tracker, generation, &state_tx, &sample).is_none() {
                    log::debug!("Detection loop {} superseded, dropping result", generation);
                    break;
                }
            }
        }));
        true
    }

    /// Cancel the scheduled loop and reset all detection state.
    pub fn stop(&mut self) {
        let mut tracker = lock(&self.tracker);
        tracker.generation += 1;
        if let Some(task) = self.task.take() {
            task.abort();
            log::info!("Stopped live card detection");
        }
        tracker.reset();
        self.state_tx.send_replace(StableDetectionState::default());
    }

    /// Reset stability state without touching the loop.
    pub fn reset(&self) {
        lock(&self.tracker).reset();
        self.state_tx.send_replace(StableDetectionState::default());
    }
}

impl Drop for DetectorSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn lock(tracker: &Mutex<Tracker>) -> MutexGuard<'_, Tracker> {
    tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn publish(
    tracker: &mut Tracker,
    state_tx: &watch::Sender<StableDetectionState>,
    sample: &super::DetectionSample,
) -> StableDetectionState {
    let state = tracker.filter.update(sample);
    if state.is_stable {
        tracker.last_boundary = state.boundary;
    }
    state_tx.send_replace(state);
    state
}

/// Publish only if `generation` is still the current loop. An aborted loop
/// can finish its last detection after a restart, and that result must not
/// reach the new loop's state.
fn publish_current(
    tracker: &Mutex<Tracker>,
    generation: u64,
    state_tx: &watch::Sender<StableDetectionState>,
    sample: &super::DetectionSample,
) -> Option<StableDetectionState> {
    let mut guard = lock(tracker);
    if guard.generation != generation {
        return None;
    }
    Some(publish(&mut guard, state_tx, sample))
}
