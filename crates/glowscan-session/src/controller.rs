//! Scan session controller.
//!
//! One tokio task owns the session and multiplexes user intents, detector
//! frame results, the progress tick, and a single pending deadline. Every
//! state change goes through [`ScanStatus::next`], and every exit from the
//! capture states releases the camera stream.

use crate::config::Config;
use crate::state::{
    progress_message, ScanEvent, ScanStatus, NO_FACE_MESSAGE, PREPARING_MESSAGE, PROGRESS_COMPLETE,
};
use crate::store::{ScanProgress, Store};
use chrono::Utc;
use glowscan_core::{recommend, FeatureClassifier, Occasion};
use glowscan_hw::{
    Camera, CameraError, DetectorError, FacingMode, FrameResult, LandmarkDetector, MediaStream,
    Subscription,
};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval};
use uuid::Uuid;

const REQUEST_QUEUE: usize = 4;
const FRAME_QUEUE: usize = 8;

/// Why a scan attempt stopped. Converted into a status, never returned to callers.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("camera access refused: {0}")]
    Permission(CameraError),
    #[error("camera error: {0}")]
    Camera(CameraError),
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("detector stopped delivering frames")]
    StreamEnded,
}

impl ScanError {
    fn event(&self) -> ScanEvent {
        match self {
            ScanError::Permission(_) => ScanEvent::PermissionRefused,
            _ => ScanEvent::CaptureFailed,
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("scan session task exited")]
    Closed,
}

#[derive(Debug, Clone, Copy)]
enum Intent {
    Start,
    RetryPermission,
    SwitchCamera,
    Reset,
}

struct Request {
    intent: Intent,
    reply: oneshot::Sender<ScanStatus>,
}

/// Clone-safe handle to a running scan session.
///
/// Dropping the last handle shuts the session down and releases the camera.
#[derive(Debug, Clone)]
pub struct ScanHandle {
    tx: mpsc::Sender<Request>,
    store: Store,
}

impl ScanHandle {
    /// Begin a scan from `idle`. Returns the status after the request was handled.
    pub async fn start_scan(&self) -> Result<ScanStatus, SessionError> {
        self.send(Intent::Start).await
    }

    /// Ask for camera permission again after it was refused.
    pub async fn retry_permission(&self) -> Result<ScanStatus, SessionError> {
        self.send(Intent::RetryPermission).await
    }

    /// Restart capture with the opposite facing mode.
    pub async fn switch_camera(&self) -> Result<ScanStatus, SessionError> {
        self.send(Intent::SwitchCamera).await
    }

    /// Abandon the current attempt and clear all results.
    pub async fn reset(&self) -> Result<ScanStatus, SessionError> {
        self.send(Intent::Reset).await
    }

    /// Record the occasion presentation should display.
    pub fn select_occasion(&self, occasion: Occasion) {
        self.store.set_selected_occasion(Some(occasion));
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    async fn send(&self, intent: Intent) -> Result<ScanStatus, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Request {
                intent,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }
}

/// Spawn the session task. Must be called from within a tokio runtime.
pub fn spawn_session(
    config: &Config,
    camera: Box<dyn Camera>,
    detector: Box<dyn LandmarkDetector>,
    store: Store,
) -> ScanHandle {
    let (tx, rx) = mpsc::channel(REQUEST_QUEUE);

    let session = ScanSession {
        attempt: Uuid::nil(),
        status: ScanStatus::Idle,
        progress: 0,
        message: PREPARING_MESSAGE.to_string(),
        face_detected: false,
        facing: config.facing_mode,
        camera,
        detector,
        classifier: FeatureClassifier::new(config.face_width),
        store: store.clone(),
        timing: Timing::from(config),
        capture: None,
        ticker: None,
        deadline: None,
    };
    session.publish();

    tracing::info!(
        facing = %session.facing,
        face_width = ?session.classifier.face_width(),
        "scan session started"
    );
    tokio::spawn(session.run(rx));

    ScanHandle { tx, store }
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    tick: Duration,
    settle: Duration,
    finalize: Duration,
    switch: Duration,
}

impl From<&Config> for Timing {
    fn from(config: &Config) -> Self {
        Self {
            tick: config.tick_interval(),
            settle: config.settle_delay(),
            finalize: config.finalize_delay(),
            switch: config.switch_delay(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeadlineKind {
    /// Progress hit 100; move on to processing.
    Settle,
    /// Processing finished; complete the scan.
    Finalize,
    /// Camera switch delay elapsed; acquire the new stream.
    Reinitialize,
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    kind: DeadlineKind,
}

impl Deadline {
    fn after(delay: Duration, kind: DeadlineKind) -> Self {
        Self {
            at: Instant::now() + delay,
            kind,
        }
    }
}

/// A live stream and the detection loop attached to it.
struct Capture {
    stream: MediaStream,
    subscription: Subscription,
    frames: mpsc::Receiver<FrameResult>,
}

struct ScanSession {
    attempt: Uuid,
    status: ScanStatus,
    progress: u8,
    message: String,
    face_detected: bool,
    facing: FacingMode,
    camera: Box<dyn Camera>,
    detector: Box<dyn LandmarkDetector>,
    classifier: FeatureClassifier,
    store: Store,
    timing: Timing,
    capture: Option<Capture>,
    ticker: Option<Interval>,
    deadline: Option<Deadline>,
}

async fn next_frame(capture: &mut Option<Capture>) -> Option<FrameResult> {
    match capture {
        Some(capture) => capture.frames.recv().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn next_deadline(deadline: Option<Deadline>) -> DeadlineKind {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(deadline.at).await;
            deadline.kind
        }
        None => std::future::pending().await,
    }
}

impl ScanSession {
    async fn run(mut self, mut requests: mpsc::Receiver<Request>) {
        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(Request { intent, reply }) => {
                        self.handle(intent);
                        let _ = reply.send(self.status);
                    }
                    None => break,
                },
                frame = next_frame(&mut self.capture) => self.on_frame(frame),
                _ = next_tick(&mut self.ticker) => self.on_tick(),
                kind = next_deadline(self.deadline) => self.on_deadline(kind),
            }
        }

        self.release_capture();
        tracing::info!(attempt = %self.attempt, "scan session closed");
    }

    fn handle(&mut self, intent: Intent) {
        tracing::debug!(?intent, status = %self.status, "intent received");
        match intent {
            Intent::Start => {
                if self.advance(ScanEvent::StartRequested) {
                    self.attempt = Uuid::new_v4();
                    self.reset_progress();
                    self.request_permission();
                }
            }
            Intent::RetryPermission => {
                if self.advance(ScanEvent::PermissionRetry) {
                    self.request_permission();
                }
            }
            Intent::SwitchCamera => self.switch_camera(),
            Intent::Reset => self.reset(),
        }
    }

    /// Apply `event` through the transition table and publish the new status.
    /// Returns false if the event was not valid.
    fn advance(&mut self, event: ScanEvent) -> bool {
        match self.transition(event) {
            Some(next) => {
                self.store.set_scan_status(next);
                true
            }
            None => false,
        }
    }

    /// Apply `event` through the transition table without publishing.
    fn transition(&mut self, event: ScanEvent) -> Option<ScanStatus> {
        let Some(next) = self.status.next(event) else {
            tracing::debug!(
                status = %self.status,
                ?event,
                "event not valid in current state; ignored"
            );
            return None;
        };
        tracing::info!(
            attempt = %self.attempt,
            from = %self.status,
            to = %next,
            ?event,
            "scan transition"
        );
        self.status = next;
        Some(next)
    }

    fn request_permission(&mut self) {
        match self.camera.request_permission() {
            Ok(()) => {
                if self.advance(ScanEvent::PermissionGranted) {
                    self.initialize();
                }
            }
            Err(err) => self.fail(ScanError::Permission(err)),
        }
    }

    /// Acquire a stream, attach the detector, and start scanning.
    fn initialize(&mut self) {
        if self.capture.is_some() {
            tracing::warn!(attempt = %self.attempt, "capture already initialized; ignoring");
            return;
        }
        self.reset_progress();
        self.publish();

        match self.begin_capture() {
            Ok(capture) => {
                self.capture = Some(capture);
                if self.advance(ScanEvent::CaptureStarted) {
                    self.ticker = Some(tokio::time::interval_at(
                        Instant::now() + self.timing.tick,
                        self.timing.tick,
                    ));
                }
            }
            Err(err) => self.fail(err),
        }
    }

    fn begin_capture(&mut self) -> Result<Capture, ScanError> {
        let stream = self.camera.acquire(self.facing).map_err(ScanError::Camera)?;
        tracing::info!(
            attempt = %self.attempt,
            stream = stream.id,
            facing = %stream.facing,
            width = stream.width,
            height = stream.height,
            "camera stream acquired"
        );

        let (tx, frames) = mpsc::channel(FRAME_QUEUE);
        match self.detector.start(&stream, tx) {
            Ok(subscription) => Ok(Capture {
                stream,
                subscription,
                frames,
            }),
            Err(err) => {
                self.camera.release(&stream);
                tracing::info!(stream = stream.id, "camera stream released");
                Err(err.into())
            }
        }
    }

    /// Stop detection and release the stream, if any.
    fn release_capture(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.subscription.cancel();
            self.camera.release(&capture.stream);
            tracing::info!(
                attempt = %self.attempt,
                stream = capture.stream.id,
                "camera stream released"
            );
        }
    }

    fn fail(&mut self, err: ScanError) {
        tracing::warn!(attempt = %self.attempt, error = %err, "scan attempt failed");
        self.release_capture();
        self.ticker = None;
        self.deadline = None;
        self.advance(err.event());
        self.publish();
    }

    fn on_frame(&mut self, frame: Option<FrameResult>) {
        let Some(frame) = frame else {
            self.fail(ScanError::StreamEnded);
            return;
        };
        if self.status != ScanStatus::Scanning {
            return;
        }
        let current = self.capture.as_ref().map(|capture| capture.stream.id);
        if current != Some(frame.stream_id) {
            tracing::debug!(stream = frame.stream_id, "dropping frame from a stale stream");
            return;
        }
        if let Err(err) = &frame.outcome {
            self.fail(err.clone().into());
            return;
        }

        match frame.primary_face() {
            Some(landmarks) => {
                let features = self.classifier.classify(landmarks);
                self.store.set_analysis(features, recommend(&features));
                self.face_detected = true;
                tracing::debug!(
                    sequence = frame.sequence,
                    face_shape = %features.face_shape,
                    eye_distance = %features.eye_distance,
                    "features updated"
                );
            }
            None => {
                self.face_detected = false;
                self.message = NO_FACE_MESSAGE.to_string();
                tracing::trace!(sequence = frame.sequence, "no face in frame");
            }
        }
        self.publish();
    }

    fn on_tick(&mut self) {
        if self.status != ScanStatus::Scanning {
            self.ticker = None;
            return;
        }

        self.progress = (self.progress + 1).min(PROGRESS_COMPLETE);
        if let Some(message) = progress_message(self.progress) {
            self.message = message.to_string();
        }
        if self.progress >= PROGRESS_COMPLETE {
            self.ticker = None;
            self.deadline = Some(Deadline::after(self.timing.settle, DeadlineKind::Settle));
        }
        self.publish();
    }

    fn on_deadline(&mut self, kind: DeadlineKind) {
        self.deadline = None;
        match kind {
            DeadlineKind::Settle => {
                if self.status == ScanStatus::Scanning {
                    self.release_capture();
                    self.advance(ScanEvent::ProgressSettled);
                    self.deadline =
                        Some(Deadline::after(self.timing.finalize, DeadlineKind::Finalize));
                }
            }
            DeadlineKind::Finalize => {
                if self.advance(ScanEvent::Finalized) {
                    self.store.set_scanned_at(Utc::now());
                    match self.store.facial_features() {
                        Some(features) => tracing::info!(
                            attempt = %self.attempt,
                            face_shape = %features.face_shape,
                            eye_shape = %features.eye_shape,
                            "scan completed"
                        ),
                        None => tracing::warn!(
                            attempt = %self.attempt,
                            "scan completed without detecting a face"
                        ),
                    }
                }
            }
            DeadlineKind::Reinitialize => {
                if self.status == ScanStatus::Preparing {
                    self.initialize();
                }
            }
        }
    }

    fn switch_camera(&mut self) {
        if !self.advance(ScanEvent::CameraSwitched) {
            return;
        }
        self.release_capture();
        self.ticker = None;
        self.facing = self.facing.toggled();
        self.reset_progress();
        self.deadline = Some(Deadline::after(self.timing.switch, DeadlineKind::Reinitialize));
        tracing::info!(attempt = %self.attempt, facing = %self.facing, "switching camera");
        self.publish();
    }

    /// Abandon everything and publish the cleared state as one update.
    /// The facing mode survives.
    fn reset(&mut self) {
        self.release_capture();
        self.ticker = None;
        self.deadline = None;
        self.transition(ScanEvent::Reset);
        self.reset_progress();
        self.store.reset_with(self.progress_snapshot());
    }

    fn reset_progress(&mut self) {
        self.progress = 0;
        self.face_detected = false;
        self.message = PREPARING_MESSAGE.to_string();
    }

    fn progress_snapshot(&self) -> ScanProgress {
        ScanProgress {
            progress: self.progress,
            message: self.message.clone(),
            face_detected: self.face_detected,
            facing_mode: self.facing,
        }
    }

    fn publish(&self) {
        self.store.set_scan_progress(self.progress_snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowscan_core::{FaceProportions, LandmarkSet};
    use glowscan_hw::sim::{
        CameraProbe, DetectorProbe, ScriptStep, ScriptedDetector, SyntheticCamera,
    };

    struct Rig {
        handle: ScanHandle,
        camera: CameraProbe,
        detector: DetectorProbe,
    }

    fn rig(script: Vec<ScriptStep>) -> Rig {
        let camera = SyntheticCamera::new();
        let detector = ScriptedDetector::new(script).with_frame_interval(Duration::from_millis(50));
        let probes = (camera.probe(), detector.probe());
        let handle = spawn_session(
            &Config::default(),
            Box::new(camera),
            Box::new(detector),
            Store::new(),
        );
        Rig {
            handle,
            camera: probes.0,
            detector: probes.1,
        }
    }

    fn oval() -> LandmarkSet {
        LandmarkSet::synthetic(&FaceProportions::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_reaches_scanning() {
        let rig = rig(vec![ScriptStep::face(oval())]);
        assert_eq!(rig.handle.start_scan().await.unwrap(), ScanStatus::Scanning);
        assert_eq!(rig.camera.live_streams(), 1);
        assert_eq!(rig.detector.active(), 1);
        assert_eq!(rig.camera.permission_requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_ignored_outside_idle() {
        let rig = rig(vec![ScriptStep::face(oval())]);
        rig.handle.start_scan().await.unwrap();
        assert_eq!(rig.handle.start_scan().await.unwrap(), ScanStatus::Scanning);
        assert_eq!(rig.camera.acquired().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_ignored_unless_denied() {
        let rig = rig(Vec::new());
        assert_eq!(rig.handle.retry_permission().await.unwrap(), ScanStatus::Idle);
        assert_eq!(rig.camera.permission_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_ignored_when_idle() {
        let rig = rig(Vec::new());
        assert_eq!(rig.handle.switch_camera().await.unwrap(), ScanStatus::Idle);
        assert_eq!(rig.handle.store().snapshot().scan.facing_mode, FacingMode::User);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_milestones() {
        let rig = rig(vec![ScriptStep::face(oval())]);
        let store = rig.handle.store().clone();
        rig.handle.start_scan().await.unwrap();

        let state = store.wait_for(|s| s.scan.progress >= 20).await;
        assert_eq!(state.scan.progress, 20);
        assert_eq!(state.scan.message, "Analyzing face shape...");

        let state = store.wait_for(|s| s.scan.progress == 100).await;
        assert_eq!(state.scan.message, "Analysis complete!");
        assert_eq!(state.scan_status, ScanStatus::Scanning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_publishes_cleared_state_once() {
        let rig = rig(vec![ScriptStep::face(oval())]);
        let store = rig.handle.store().clone();
        rig.handle.start_scan().await.unwrap();
        store.wait_for(|s| s.facial_features.is_some()).await;
        rig.handle.switch_camera().await.unwrap();
        store.wait_for_status(ScanStatus::Scanning).await;

        let mut rx = store.subscribe();
        rx.mark_unchanged();
        assert_eq!(rig.handle.reset().await.unwrap(), ScanStatus::Idle);

        let state = rx.borrow_and_update().clone();
        assert_eq!(state.scan_status, ScanStatus::Idle);
        assert!(state.facial_features.is_none());
        assert!(state.recommendations.is_none());
        assert_eq!(state.scan.progress, 0);
        assert_eq!(state.scan.facing_mode, FacingMode::Environment);
        assert_eq!(store.snapshot(), state);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_drop_releases_stream() {
        let rig = rig(vec![ScriptStep::face(oval())]);
        let store = rig.handle.store().clone();
        rig.handle.start_scan().await.unwrap();
        assert_eq!(rig.camera.live_streams(), 1);

        drop(rig.handle);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(rig.camera.live_streams(), 0);
        assert_eq!(rig.detector.active(), 0);
        assert_eq!(store.scan_status(), ScanStatus::Scanning);
    }
}
