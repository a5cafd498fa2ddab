//! End-to-end scan lifecycle against the synthetic camera and scripted detector.
//!
//! Runs on paused tokio time, so the full ten-second scan finishes instantly.

use glowscan_core::{
    EyeDistance, FaceProportions, FaceShape, LandmarkSet, Occasion, OCCASION_COUNT,
};
use glowscan_hw::sim::{CameraProbe, DetectorProbe, ScriptStep, ScriptedDetector, SyntheticCamera};
use glowscan_hw::{
    CameraError, DetectorError, FacingMode, FrameResult, LandmarkDetector, MediaStream,
    Subscription,
};
use glowscan_session::{spawn_session, Config, ScanHandle, ScanStatus, Store};
use std::time::Duration;
use tokio::sync::mpsc;

struct Harness {
    handle: ScanHandle,
    store: Store,
    camera: CameraProbe,
    detector: DetectorProbe,
}

fn harness(script: Vec<ScriptStep>) -> Harness {
    harness_with(Config::default(), script, |_, _| {})
}

fn harness_with(
    config: Config,
    script: Vec<ScriptStep>,
    setup: impl FnOnce(&CameraProbe, &DetectorProbe),
) -> Harness {
    let camera = SyntheticCamera::new();
    let detector = ScriptedDetector::new(script).with_frame_interval(config.frame_interval());
    let camera_probe = camera.probe();
    let detector_probe = detector.probe();
    setup(&camera_probe, &detector_probe);

    let store = Store::new();
    let handle = spawn_session(&config, Box::new(camera), Box::new(detector), store.clone());
    Harness {
        handle,
        store,
        camera: camera_probe,
        detector: detector_probe,
    }
}

fn face(width_to_height: f32, jaw_to_forehead: f32, eye_distance: f32) -> LandmarkSet {
    LandmarkSet::synthetic(&FaceProportions {
        width_to_height,
        jaw_to_forehead,
        eye_distance,
    })
}

fn oval() -> LandmarkSet {
    LandmarkSet::synthetic(&FaceProportions::default())
}

/// Detector whose result channel closes as soon as it starts.
struct HangUpDetector;

impl LandmarkDetector for HangUpDetector {
    fn start(
        &mut self,
        _stream: &MediaStream,
        sink: mpsc::Sender<FrameResult>,
    ) -> Result<Subscription, DetectorError> {
        drop(sink);
        let (subscription, _stopped) = Subscription::pair();
        Ok(subscription)
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_scan_completes() {
    let h = harness(vec![ScriptStep::face(oval())]);
    assert_eq!(h.handle.start_scan().await.unwrap(), ScanStatus::Scanning);

    let state = h.store.wait_for_status(ScanStatus::Completed).await;
    let features = state.facial_features.expect("features");
    assert_eq!(features.face_shape, FaceShape::Oval);
    assert_eq!(features.eye_distance, EyeDistance::Average);

    let recs = state.recommendations.expect("recommendations");
    assert_eq!(recs.len(), OCCASION_COUNT);
    assert_eq!(recs[0].occasion, Occasion::Everyday);
    assert!(state.scanned_at.is_some());
    assert_eq!(state.scan.progress, 100);
    assert_eq!(state.scan.message, "Analysis complete!");
    assert!(state.scan.face_detected);
}

#[tokio::test(start_paused = true)]
async fn test_stream_released_before_processing() {
    let h = harness(vec![ScriptStep::face(oval())]);
    h.handle.start_scan().await.unwrap();
    assert_eq!(h.camera.live_streams(), 1);

    h.store.wait_for_status(ScanStatus::Processing).await;
    // The session task released the stream before publishing the status.
    assert_eq!(h.camera.live_streams(), 0);

    h.store.wait_for_status(ScanStatus::Completed).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.detector.active(), 0);
    assert_eq!(h.camera.acquired().len(), 1);
    assert_eq!(h.camera.released().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_scan_timeline() {
    let h = harness(vec![ScriptStep::face(oval())]);
    let started = tokio::time::Instant::now();
    h.handle.start_scan().await.unwrap();

    h.store.wait_for_status(ScanStatus::Processing).await;
    // 100 ticks of 100ms, then the 500ms settle delay.
    assert_eq!(started.elapsed(), Duration::from_millis(10_500));

    h.store.wait_for_status(ScanStatus::Completed).await;
    assert_eq!(started.elapsed(), Duration::from_millis(11_500));
}

#[tokio::test(start_paused = true)]
async fn test_permission_denied_then_retry() {
    let h = harness_with(Config::default(), vec![ScriptStep::face(oval())], |camera, _| {
        camera.set_permission(false)
    });

    assert_eq!(h.handle.start_scan().await.unwrap(), ScanStatus::PermissionDenied);
    assert_eq!(h.camera.acquired().len(), 0);

    h.camera.set_permission(true);
    assert_eq!(h.handle.retry_permission().await.unwrap(), ScanStatus::Scanning);
    assert_eq!(h.camera.permission_requests(), 2);

    let state = h.store.wait_for_status(ScanStatus::Completed).await;
    assert_eq!(state.facial_features.unwrap().face_shape, FaceShape::Oval);
}

#[tokio::test(start_paused = true)]
async fn test_permission_denied_waits_for_retry() {
    let h = harness_with(Config::default(), vec![ScriptStep::face(oval())], |camera, _| {
        camera.set_permission(false)
    });
    assert_eq!(h.handle.start_scan().await.unwrap(), ScanStatus::PermissionDenied);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.store.scan_status(), ScanStatus::PermissionDenied);
    assert_eq!(h.camera.permission_requests(), 1);
    assert!(h.camera.acquired().is_empty());
    assert_eq!(h.detector.starts(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_acquire_failure_is_error() {
    let h = harness_with(Config::default(), Vec::new(), |camera, _| {
        camera.set_acquire_error(Some(CameraError::DeviceBusy))
    });

    assert_eq!(h.handle.start_scan().await.unwrap(), ScanStatus::Error);
    assert_eq!(h.camera.live_streams(), 0);
    assert_eq!(h.detector.starts(), 0);
    assert!(h.store.facial_features().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_detector_start_failure_releases_stream() {
    let h = harness_with(Config::default(), Vec::new(), |_, detector| {
        detector.set_start_error(Some("model missing".into()))
    });

    assert_eq!(h.handle.start_scan().await.unwrap(), ScanStatus::Error);
    assert_eq!(h.camera.acquired().len(), 1);
    assert_eq!(h.camera.live_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_inference_failure_mid_scan() {
    let h = harness(vec![
        ScriptStep::face(oval()),
        ScriptStep::face(oval()),
        ScriptStep::Fail("gpu lost".into()),
    ]);
    h.handle.start_scan().await.unwrap();

    let state = h.store.wait_for_status(ScanStatus::Error).await;
    assert!(state.scan.progress < 100);
    // Features from earlier frames remain visible.
    assert!(state.facial_features.is_some());
    assert_eq!(h.camera.live_streams(), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.detector.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_detector_hang_up_is_error() {
    let camera = SyntheticCamera::new();
    let probe = camera.probe();
    let store = Store::new();
    let handle = spawn_session(
        &Config::default(),
        Box::new(camera),
        Box::new(HangUpDetector),
        store.clone(),
    );

    handle.start_scan().await.unwrap();
    let state = store.wait_for_status(ScanStatus::Error).await;
    assert!(state.facial_features.is_none());
    assert_eq!(probe.acquired().len(), 1);
    assert_eq!(probe.live_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_last_detection_wins() {
    let h = harness(vec![
        ScriptStep::face(oval()),
        ScriptStep::face(face(0.9, 0.95, 0.25)),
        ScriptStep::NoFace,
    ]);
    h.handle.start_scan().await.unwrap();

    let state = h.store.wait_for_status(ScanStatus::Completed).await;
    assert!(h.detector.frames() >= 3);
    // Later frames without a face leave the last analysis in place.
    assert!(!state.scan.face_detected);
    let features = state.facial_features.unwrap();
    assert_eq!(features.face_shape, FaceShape::Round);
    assert_eq!(features.eye_distance, EyeDistance::Wide);
    assert!(state.recommendations.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_completes_without_face() {
    let h = harness(vec![ScriptStep::NoFace]);
    h.handle.start_scan().await.unwrap();

    let state = h.store.wait_for(|s| s.scan.progress == 10).await;
    assert!(!state.scan.face_detected);
    assert_eq!(state.scan.message, "Position your face in the frame...");

    let state = h.store.wait_for_status(ScanStatus::Completed).await;
    assert!(state.facial_features.is_none());
    assert!(state.recommendations.is_none());
    assert!(state.scanned_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_first_face_wins() {
    let round = face(0.9, 0.95, 0.25);
    let h = harness(vec![ScriptStep::Faces(vec![round, oval()])]);
    h.handle.start_scan().await.unwrap();

    let state = h.store.wait_for_status(ScanStatus::Completed).await;
    let features = state.facial_features.unwrap();
    assert_eq!(features.face_shape, FaceShape::Round);
    assert_eq!(features.eye_distance, EyeDistance::Wide);
}

#[tokio::test(start_paused = true)]
async fn test_switch_camera_reacquires() {
    let h = harness(vec![ScriptStep::face(oval())]);
    h.handle.start_scan().await.unwrap();
    h.store.wait_for(|s| s.scan.progress >= 30).await;

    assert_eq!(h.handle.switch_camera().await.unwrap(), ScanStatus::Preparing);
    assert_eq!(h.camera.live_streams(), 0);
    let state = h.store.snapshot();
    assert_eq!(state.scan.progress, 0);
    assert_eq!(state.scan.facing_mode, FacingMode::Environment);

    h.store.wait_for_status(ScanStatus::Scanning).await;
    let acquired = h.camera.acquired();
    assert_eq!(acquired.len(), 2);
    assert_eq!(acquired[1].1, FacingMode::Environment);
    assert_eq!(h.camera.released(), vec![acquired[0].0]);

    h.store.wait_for_status(ScanStatus::Completed).await;
    assert_eq!(h.camera.live_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reset_mid_scan() {
    let h = harness(vec![ScriptStep::face(oval())]);
    h.handle.start_scan().await.unwrap();
    h.handle.select_occasion(Occasion::Evening);
    h.store.wait_for(|s| s.facial_features.is_some()).await;

    assert_eq!(h.handle.reset().await.unwrap(), ScanStatus::Idle);
    let state = h.store.snapshot();
    assert!(state.facial_features.is_none());
    assert!(state.recommendations.is_none());
    assert!(state.selected_occasion.is_none());
    assert_eq!(state.scan.progress, 0);
    assert_eq!(h.camera.live_streams(), 0);

    // Nothing from the abandoned attempt lands afterwards.
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(h.store.scan_status(), ScanStatus::Idle);
    assert!(h.store.facial_features().is_none());
    assert_eq!(h.detector.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rescan_after_completion() {
    let h = harness(vec![ScriptStep::face(oval())]);
    h.handle.start_scan().await.unwrap();
    h.store.wait_for_status(ScanStatus::Completed).await;

    // A completed scan must be reset before starting again.
    assert_eq!(h.handle.start_scan().await.unwrap(), ScanStatus::Completed);
    h.handle.reset().await.unwrap();
    assert_eq!(h.handle.start_scan().await.unwrap(), ScanStatus::Scanning);
    assert_eq!(h.camera.acquired().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_selected_occasion_survives_scan() {
    let h = harness(vec![ScriptStep::face(oval())]);
    h.handle.select_occasion(Occasion::Romantic);
    h.handle.start_scan().await.unwrap();

    h.store.wait_for_status(ScanStatus::Completed).await;
    let selected = h.store.selected_recommendation().unwrap();
    assert_eq!(selected.occasion, Occasion::Romantic);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_releases_camera() {
    let h = harness(vec![ScriptStep::face(oval())]);
    h.handle.start_scan().await.unwrap();
    assert_eq!(h.camera.live_streams(), 1);

    drop(h.handle);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.camera.live_streams(), 0);
    assert_eq!(h.detector.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_legacy_width_sampling() {
    let config = Config {
        face_width: glowscan_core::FaceWidthSampling::Legacy,
        ..Config::default()
    };
    // Zero width: only the jaw ratio matters, and 0.85 is not wide enough for square.
    let h = harness_with(config, vec![ScriptStep::face(face(0.82, 0.85, 0.17))], |_, _| {});
    h.handle.start_scan().await.unwrap();

    let state = h.store.wait_for_status(ScanStatus::Completed).await;
    assert_eq!(state.facial_features.unwrap().face_shape, FaceShape::Oblong);
}
