use std::sync::Arc;

use crate::models::camera_models::{CameraSelector, CaptureRequest, SessionConfiguration};
use crate::models::device_error::DeviceErrorCode;
use crate::models::error::CaptureError;
use crate::worker::WorkerHandle;

/// Device state notifications.
///
/// `Opened` or `Error` terminates an open request. `Disconnected` may arrive
/// at any time afterwards, possibly more than once.
#[derive(Debug)]
pub enum DeviceEvent<D> {
    Opened(D),
    Disconnected,
    Error(DeviceErrorCode),
}

/// Session negotiation outcome.
#[derive(Debug)]
pub enum SessionEvent<S> {
    Configured(S),
    ConfigureFailed,
}

/// Repeating request notifications. Fired once per frame for as long as the
/// request stays active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    Started { timestamp_ns: i64, frame_number: u64 },
    Failed { frame_number: u64 },
}

pub type DeviceCallback<D> = Arc<dyn Fn(DeviceEvent<D>) + Send + Sync + 'static>;
pub type SessionCallback<S> = Arc<dyn Fn(SessionEvent<S>) + Send + Sync + 'static>;
pub type CaptureCallback = Arc<dyn Fn(CaptureEvent) + Send + Sync + 'static>;

/// Interface for platform camera subsystems.
///
/// Every operation only starts the work and returns. Results are delivered
/// through the callback, which the provider must invoke on `worker` via
/// [`WorkerHandle::post`]. An `Err` return means the request was refused
/// outright and no callback will follow.
///
/// Closing a device invalidates its sessions and must resolve any callback
/// still pending on it (with `ConfigureFailed`/`Failed`, or by dropping it).
///
/// `post` returns `false` once the worker has quit. An `Opened` device the
/// worker refuses has no owner and must be closed by the provider.
pub trait CameraProvider: Send + Sync + 'static {
    /// Owning handle to an opened device.
    type Device: Send + 'static;
    /// Handle to a negotiated capture session.
    type Session: Send + 'static;
    /// Opaque output target frames are written into.
    type Surface: Clone + Send + Sync + 'static;

    /// Open `camera`, resolving `Auto` to the first available device.
    fn open_device(
        &self,
        camera: &CameraSelector,
        worker: &WorkerHandle,
        callback: DeviceCallback<Self::Device>,
    ) -> Result<(), CaptureError>;

    /// Negotiate a session on `device` bound to the configured outputs.
    fn create_session(
        &self,
        device: &Self::Device,
        config: SessionConfiguration<Self::Surface>,
        worker: &WorkerHandle,
        callback: SessionCallback<Self::Session>,
    ) -> Result<(), CaptureError>;

    /// Install `request` as the session's repeating request.
    fn set_repeating_request(
        &self,
        session: &Self::Session,
        request: CaptureRequest<Self::Surface>,
        worker: &WorkerHandle,
        callback: CaptureCallback,
    ) -> Result<(), CaptureError>;

    /// Close the device and every session created on it.
    fn close_device(&self, device: &Self::Device);
}
