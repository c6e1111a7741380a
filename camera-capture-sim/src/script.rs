//! Scripted outcomes for the simulated provider.

use camera_capture_core::{CameraAccessError, DeviceErrorCode};

/// How an open request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenBehavior {
    #[default]
    Succeed,
    /// Report the error code through the device callback.
    Fail(DeviceErrorCode),
    /// Refuse synchronously; no callback follows.
    Refuse(CameraAccessError),
    /// Never answer until `complete_pending_opens` is called.
    Hang,
}

/// How session negotiation is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionBehavior {
    #[default]
    Configure,
    Fail,
    /// Never answer; closing the device fails the negotiation.
    Hang,
}

/// How the repeating request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatingBehavior {
    /// Acknowledge the first capture, then write one frame.
    #[default]
    Start,
    /// Acknowledge the first capture but hold frames until `write_pending_frames`.
    StartWithoutFrames,
    Fail,
    /// Never answer; closing the device fails the request.
    Hang,
}

/// What the provider observed or delivered, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    OpenRequested(String),
    DeviceOpened(String),
    OpenFailed(String, DeviceErrorCode),
    Disconnected(String),
    DeviceError(String, DeviceErrorCode),
    SessionCreated(String),
    SessionFailed(String),
    CaptureStarted(String),
    CaptureFailed(String),
    FrameWritten(String),
    DeviceClosed(String),
}
