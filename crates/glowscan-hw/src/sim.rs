//! Synthetic camera and scripted detector.
//!
//! Stand-ins for real capture hardware, used by the demo CLI and by tests.
//! Each exposes a probe that shares its internal state, so callers can flip
//! failure knobs and inspect stream bookkeeping after the device has been
//! moved into a session.

use crate::camera::{Camera, CameraError, FacingMode, MediaStream};
use crate::detector::{DetectorError, FrameResult, LandmarkDetector, Subscription};
use glowscan_core::LandmarkSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

const SYNTHETIC_WIDTH: u32 = 1280;
const SYNTHETIC_HEIGHT: u32 = 720;
const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
struct CameraState {
    permission_granted: bool,
    acquire_error: Option<CameraError>,
    next_id: u64,
    live: Vec<u64>,
    acquired: Vec<(u64, FacingMode)>,
    released: Vec<u64>,
    permission_requests: usize,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            permission_granted: true,
            acquire_error: None,
            next_id: 1,
            live: Vec::new(),
            acquired: Vec::new(),
            released: Vec::new(),
            permission_requests: 0,
        }
    }
}

/// Shared view into a [`SyntheticCamera`].
#[derive(Debug, Clone, Default)]
pub struct CameraProbe {
    state: Arc<Mutex<CameraState>>,
}

impl CameraProbe {
    pub fn set_permission(&self, granted: bool) {
        lock(&self.state).permission_granted = granted;
    }

    /// Make every subsequent `acquire` fail with `error` (or succeed again with `None`).
    pub fn set_acquire_error(&self, error: Option<CameraError>) {
        lock(&self.state).acquire_error = error;
    }

    /// Number of streams acquired and not yet released.
    pub fn live_streams(&self) -> usize {
        lock(&self.state).live.len()
    }

    /// Every acquisition, in order.
    pub fn acquired(&self) -> Vec<(u64, FacingMode)> {
        lock(&self.state).acquired.clone()
    }

    /// Every effective release, in order. Repeated releases are not recorded.
    pub fn released(&self) -> Vec<u64> {
        lock(&self.state).released.clone()
    }

    pub fn permission_requests(&self) -> usize {
        lock(&self.state).permission_requests
    }
}

/// In-memory camera that hands out numbered streams.
#[derive(Debug, Default)]
pub struct SyntheticCamera {
    probe: CameraProbe,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> CameraProbe {
        self.probe.clone()
    }
}

impl Camera for SyntheticCamera {
    fn request_permission(&mut self) -> Result<(), CameraError> {
        let mut state = lock(&self.probe.state);
        state.permission_requests += 1;
        if state.permission_granted {
            Ok(())
        } else {
            Err(CameraError::PermissionDenied)
        }
    }

    fn acquire(&mut self, facing: FacingMode) -> Result<MediaStream, CameraError> {
        let mut state = lock(&self.probe.state);
        if !state.permission_granted {
            return Err(CameraError::PermissionDenied);
        }
        if let Some(err) = state.acquire_error.clone() {
            return Err(err);
        }
        let id = state.next_id;
        state.next_id += 1;
        state.live.push(id);
        state.acquired.push((id, facing));
        tracing::debug!(stream = id, %facing, "synthetic stream acquired");

        Ok(MediaStream {
            id,
            facing,
            width: SYNTHETIC_WIDTH,
            height: SYNTHETIC_HEIGHT,
        })
    }

    fn release(&mut self, stream: &MediaStream) {
        let mut state = lock(&self.probe.state);
        if let Some(pos) = state.live.iter().position(|&id| id == stream.id) {
            state.live.remove(pos);
            state.released.push(stream.id);
            tracing::debug!(stream = stream.id, "synthetic stream released");
        }
    }
}

/// What the scripted detector reports for one frame.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Faces(Vec<LandmarkSet>),
    NoFace,
    Fail(String),
}

impl ScriptStep {
    pub fn face(landmarks: LandmarkSet) -> Self {
        ScriptStep::Faces(vec![landmarks])
    }
}

#[derive(Debug, Default)]
struct DetectorState {
    start_error: Option<String>,
    starts: usize,
    active: usize,
    frames: u64,
}

/// Shared view into a [`ScriptedDetector`].
#[derive(Debug, Clone, Default)]
pub struct DetectorProbe {
    state: Arc<Mutex<DetectorState>>,
}

impl DetectorProbe {
    /// Make every subsequent `start` fail (or succeed again with `None`).
    pub fn set_start_error(&self, error: Option<String>) {
        lock(&self.state).start_error = error;
    }

    /// Number of successful starts.
    pub fn starts(&self) -> usize {
        lock(&self.state).starts
    }

    /// Detection loops still running.
    pub fn active(&self) -> usize {
        lock(&self.state).active
    }

    /// Frame results delivered across all loops.
    pub fn frames(&self) -> u64 {
        lock(&self.state).frames
    }
}

/// Detector that replays a fixed script, one step per frame.
///
/// Steps play in order; the last step then repeats. An empty script reports
/// no face on every frame.
#[derive(Debug)]
pub struct ScriptedDetector {
    script: Arc<[ScriptStep]>,
    frame_interval: Duration,
    probe: DetectorProbe,
}

impl ScriptedDetector {
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self {
            script: script.into(),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            probe: DetectorProbe::default(),
        }
    }

    /// Detector that sees the same face on every frame.
    pub fn steady(landmarks: LandmarkSet) -> Self {
        Self::new(vec![ScriptStep::face(landmarks)])
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn probe(&self) -> DetectorProbe {
        self.probe.clone()
    }
}

fn step_result(step: Option<&ScriptStep>, stream_id: u64, sequence: u32) -> FrameResult {
    match step {
        Some(ScriptStep::Faces(faces)) => FrameResult::faces(stream_id, sequence, faces.clone()),
        Some(ScriptStep::Fail(reason)) => FrameResult::failed(
            stream_id,
            sequence,
            DetectorError::InferenceFailed(reason.clone()),
        ),
        Some(ScriptStep::NoFace) | None => FrameResult::faces(stream_id, sequence, Vec::new()),
    }
}

impl LandmarkDetector for ScriptedDetector {
    fn start(
        &mut self,
        stream: &MediaStream,
        sink: mpsc::Sender<FrameResult>,
    ) -> Result<Subscription, DetectorError> {
        {
            let mut state = lock(&self.probe.state);
            if let Some(reason) = state.start_error.clone() {
                return Err(DetectorError::InitFailed(reason));
            }
            state.starts += 1;
            state.active += 1;
        }

        let (subscription, mut stopped) = Subscription::pair();
        let script = Arc::clone(&self.script);
        let probe = self.probe.clone();
        let stream_id = stream.id;
        let period = self.frame_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            let mut sequence = 0u32;
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        let idx = (sequence as usize).min(script.len().saturating_sub(1));
                        let result = step_result(script.get(idx), stream_id, sequence);
                        if sink.send(result).await.is_err() {
                            break;
                        }
                        lock(&probe.state).frames += 1;
                        sequence = sequence.wrapping_add(1);
                    }
                }
            }
            lock(&probe.state).active -= 1;
            tracing::debug!(stream = stream_id, frames = sequence, "scripted detector stopped");
        });

        Ok(subscription)
    }
}
