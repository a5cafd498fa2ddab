//! Camera boundary: permission, stream acquisition, stream release.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera facing {0}")]
    DeviceNotFound(FacingMode),
    #[error("device busy")]
    DeviceBusy,
    #[error("stream acquisition failed: {0}")]
    AcquireFailed(String),
}

/// Which way the camera points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, facing the user.
    #[default]
    User,
    /// Rear camera.
    Environment,
}

impl FacingMode {
    pub fn toggled(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(FacingMode::User),
            "environment" => Ok(FacingMode::Environment),
            other => Err(format!("unknown facing mode: {other:?} (expected user or environment)")),
        }
    }
}

/// Handle to an acquired media stream.
///
/// The stream stays live until passed to [`Camera::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub id: u64,
    pub facing: FacingMode,
    pub width: u32,
    pub height: u32,
}

/// Media-capture subsystem.
pub trait Camera: Send {
    /// Ask for camera access without keeping a stream open.
    fn request_permission(&mut self) -> Result<(), CameraError>;

    /// Open a stream for the requested facing mode.
    fn acquire(&mut self, facing: FacingMode) -> Result<MediaStream, CameraError>;

    /// Stop every track of `stream`. Releasing an already released stream is a no-op.
    fn release(&mut self, stream: &MediaStream);
}
