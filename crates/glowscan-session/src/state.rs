//! Scan lifecycle states and the transition table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a scan, as observed by presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanStatus {
    #[default]
    Idle,
    RequestingPermission,
    PermissionDenied,
    Preparing,
    Scanning,
    Processing,
    Completed,
    Error,
}

impl ScanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Idle => "idle",
            ScanStatus::RequestingPermission => "requesting-permission",
            ScanStatus::PermissionDenied => "permission-denied",
            ScanStatus::Preparing => "preparing",
            ScanStatus::Scanning => "scanning",
            ScanStatus::Processing => "processing",
            ScanStatus::Completed => "completed",
            ScanStatus::Error => "error",
        }
    }

    /// States that hold (or are about to hold) a camera stream.
    pub fn is_capturing(self) -> bool {
        matches!(self, ScanStatus::Preparing | ScanStatus::Scanning)
    }

    /// States a scan attempt can end in.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanStatus::Completed | ScanStatus::Error | ScanStatus::PermissionDenied
        )
    }

    /// Apply `event`. `None` means the event is not valid in this state.
    pub fn next(self, event: ScanEvent) -> Option<ScanStatus> {
        use ScanEvent::*;
        use ScanStatus::*;

        match (self, event) {
            (_, Reset) => Some(Idle),
            (Idle, StartRequested) => Some(RequestingPermission),
            (PermissionDenied, PermissionRetry) => Some(RequestingPermission),
            (RequestingPermission, PermissionGranted) => Some(Preparing),
            (RequestingPermission, PermissionRefused) => Some(PermissionDenied),
            (Preparing, CaptureStarted) => Some(Scanning),
            (Preparing | Scanning, CaptureFailed) => Some(Error),
            (Preparing | Scanning, CameraSwitched) => Some(Preparing),
            (Scanning, ProgressSettled) => Some(Processing),
            (Processing, Finalized) => Some(Completed),
            _ => None,
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened to a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanEvent {
    StartRequested,
    PermissionRetry,
    PermissionGranted,
    PermissionRefused,
    CaptureStarted,
    CaptureFailed,
    CameraSwitched,
    ProgressSettled,
    Finalized,
    Reset,
}

pub const PREPARING_MESSAGE: &str = "Preparing scanner...";
pub const NO_FACE_MESSAGE: &str = "Position your face in the frame...";
pub const COMPLETE_MESSAGE: &str = "Analysis complete!";

/// Upper bound of the progress counter.
pub const PROGRESS_COMPLETE: u8 = 100;

/// Status message shown when progress reaches `progress`, if it is a milestone.
pub fn progress_message(progress: u8) -> Option<&'static str> {
    match progress {
        20 => Some("Analyzing face shape..."),
        40 => Some("Detecting facial landmarks..."),
        60 => Some("Measuring facial proportions..."),
        80 => Some("Preparing recommendations..."),
        PROGRESS_COMPLETE => Some(COMPLETE_MESSAGE),
        _ => None,
    }
}
