//! Landmark detector boundary.
//!
//! A detector attaches to a live stream and emits one [`FrameResult`] per
//! processed frame, at its own cadence, until its [`Subscription`] is
//! cancelled or dropped.

use crate::camera::MediaStream;
use glowscan_core::LandmarkSet;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("detector initialization failed: {0}")]
    InitFailed(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

/// Result of running detection on one frame.
#[derive(Debug, Clone)]
pub struct FrameResult {
    /// Stream the frame came from.
    pub stream_id: u64,
    pub sequence: u32,
    /// Zero or more faces, most prominent first.
    pub outcome: Result<Vec<LandmarkSet>, DetectorError>,
}

impl FrameResult {
    pub fn faces(stream_id: u64, sequence: u32, faces: Vec<LandmarkSet>) -> Self {
        Self {
            stream_id,
            sequence,
            outcome: Ok(faces),
        }
    }

    pub fn failed(stream_id: u64, sequence: u32, error: DetectorError) -> Self {
        Self {
            stream_id,
            sequence,
            outcome: Err(error),
        }
    }

    /// The first detected face; any others are ignored.
    pub fn primary_face(&self) -> Option<&LandmarkSet> {
        self.outcome.as_ref().ok().and_then(|faces| faces.first())
    }
}

/// Cancellation handle for a running detection loop.
///
/// Dropping the handle cancels the loop.
#[derive(Debug)]
pub struct Subscription {
    stop: Option<oneshot::Sender<()>>,
}

impl Subscription {
    /// Pair a subscription with the receiver the detection loop should watch.
    pub fn pair() -> (Self, oneshot::Receiver<()>) {
        let (stop, stopped) = oneshot::channel();
        (Self { stop: Some(stop) }, stopped)
    }

    pub fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Face landmark detection engine.
pub trait LandmarkDetector: Send {
    /// Start detecting on `stream`, delivering results into `sink`.
    ///
    /// Must be called from within a tokio runtime.
    fn start(
        &mut self,
        stream: &MediaStream,
        sink: mpsc::Sender<FrameResult>,
    ) -> Result<Subscription, DetectorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowscan_core::{FaceProportions, LandmarkSet};

    #[test]
    fn test_primary_face_is_first() {
        let first = LandmarkSet::synthetic(&FaceProportions::default());
        let second = LandmarkSet::synthetic(&FaceProportions {
            width_to_height: 0.7,
            ..FaceProportions::default()
        });
        let result = FrameResult::faces(1, 0, vec![first.clone(), second]);
        assert_eq!(result.primary_face(), Some(&first));
    }

    #[test]
    fn test_no_face_and_failure_have_no_primary() {
        assert!(FrameResult::faces(1, 0, Vec::new()).primary_face().is_none());
        let failed = FrameResult::failed(1, 0, DetectorError::InferenceFailed("boom".into()));
        assert!(failed.primary_face().is_none());
    }

    #[test]
    fn test_subscription_cancel_signals_receiver() {
        let (mut sub, mut stopped) = Subscription::pair();
        sub.cancel();
        assert!(stopped.try_recv().is_ok());
        // Second cancel is a no-op.
        sub.cancel();
    }

    #[test]
    fn test_subscription_drop_signals_receiver() {
        let (sub, mut stopped) = Subscription::pair();
        drop(sub);
        assert!(stopped.try_recv().is_ok());
    }
}
