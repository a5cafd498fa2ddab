//! glowscan-hw — Capture boundaries for the scan session.
//!
//! Defines the camera (permission, stream acquisition and release) and the
//! landmark detector (cancellable per-frame result subscriptions), plus
//! synthetic implementations of both.

pub mod camera;
pub mod detector;
pub mod sim;

pub use camera::{Camera, CameraError, FacingMode, MediaStream};
pub use detector::{DetectorError, FrameResult, LandmarkDetector, Subscription};
