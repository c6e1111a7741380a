//! # camera-capture-core
//!
//! Platform-agnostic camera acquisition core.
//!
//! Turns a callback-driven camera API into a blocking, three-phase startup
//! (open device, create session, start repeating request) with classified
//! errors and disconnect-triggered resets. Platform backends implement the
//! `CameraProvider` trait and plug into the generic `CameraCapture`.
//!
//! ## Architecture
//!
//! ```text
//! camera-capture-core (this crate)
//! ├── traits/   ← CameraProvider, ResetSink, SurfaceCapture
//! ├── models/   ← CaptureError, DeviceErrorCode, AcquisitionState, CameraCaptureConfig, etc.
//! ├── bridge/   ← Completion/Completer one-shot, AsyncBridge, Interrupter
//! ├── worker    ← CallbackWorker (dedicated callback thread)
//! └── session/  ← CameraCapture (acquisition state machine), DisconnectSignal
//! ```

pub mod bridge;
pub mod models;
pub mod session;
pub mod traits;
pub mod worker;

// Re-export key types at crate root for convenience.
pub use bridge::{AsyncBridge, Completer, Completion, Interrupter};
pub use models::camera_models::{
    CameraSelector, CaptureRequest, CaptureRequestBuilder, OutputConfiguration, RequestTemplate,
    SessionConfiguration, Size,
};
pub use models::config::CameraCaptureConfig;
pub use models::device_error::{classify_open_error, DeviceErrorCode};
pub use models::error::{CameraAccessError, CaptureError};
pub use models::state::AcquisitionState;
pub use session::camera_capture::CameraCapture;
pub use session::disconnect::DisconnectSignal;
pub use traits::capture_provider::{
    CameraProvider, CaptureCallback, CaptureEvent, DeviceCallback, DeviceEvent, SessionCallback,
    SessionEvent,
};
pub use traits::reset_sink::ResetSink;
pub use traits::surface_capture::SurfaceCapture;
pub use worker::{CallbackWorker, WorkerHandle};
