use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::bridge::async_bridge::{AsyncBridge, Interrupter};
use crate::bridge::completion::Completer;
use crate::models::camera_models::{
    CaptureRequest, OutputConfiguration, SessionConfiguration, Size,
};
use crate::models::config::CameraCaptureConfig;
use crate::models::device_error::classify_open_error;
use crate::models::error::{CameraAccessError, CaptureError};
use crate::models::state::AcquisitionState;
use crate::session::disconnect::DisconnectSignal;
use crate::traits::capture_provider::{
    CameraProvider, CaptureCallback, CaptureEvent, DeviceCallback, DeviceEvent, SessionCallback,
    SessionEvent,
};
use crate::traits::reset_sink::ResetSink;
use crate::traits::surface_capture::SurfaceCapture;
use crate::worker::{CallbackWorker, WorkerHandle};

/// Resources owned by the capture, protected by `parking_lot::Mutex`.
///
/// The lock is never held while blocking on the provider.
struct Inner<P: CameraProvider> {
    state: AcquisitionState,
    worker: Option<CallbackWorker>,
    device: Option<P::Device>,
    session: Option<P::Session>,
}

/// Camera capture source.
///
/// Drives the provider through three ordered, blocking phases:
/// ```text
/// init:  open device                       idle → opening → opened
/// start: create session, repeating request opened → session_creating → streaming
/// ```
/// All provider callbacks run on a dedicated worker thread started by `init`.
/// A disconnect reported by the provider flips `is_closed` and requests one
/// reset from the `ResetSink`; it is never returned from a call.
pub struct CameraCapture<P: CameraProvider> {
    id: Uuid,
    config: CameraCaptureConfig,
    provider: Arc<P>,
    bridge: AsyncBridge,
    disconnect: Arc<DisconnectSignal>,
    inner: Mutex<Inner<P>>,
}

impl<P: CameraProvider> CameraCapture<P> {
    pub fn new(
        provider: Arc<P>,
        config: CameraCaptureConfig,
        reset_sink: Arc<dyn ResetSink>,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::Configuration)?;

        let bridge = AsyncBridge::new();
        let disconnect = Arc::new(DisconnectSignal::new(reset_sink, bridge.handle()));

        Ok(Self {
            id: Uuid::new_v4(),
            config,
            provider,
            bridge,
            disconnect,
            inner: Mutex::new(Inner {
                state: AcquisitionState::Idle,
                worker: None,
                device: None,
                session: None,
            }),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &CameraCaptureConfig {
        &self.config
    }

    pub fn state(&self) -> AcquisitionState {
        self.inner.lock().state
    }

    /// Handle for cancelling a blocked `init`/`start` from another thread.
    pub fn interrupter(&self) -> Interrupter {
        self.bridge.interrupter()
    }

    /// Open the device. Transitions: idle → opening → opened.
    pub fn init(&self) -> Result<(), CaptureError> {
        let worker = self.begin_init()?;

        log::trace!("[{}] Open camera: {}", self.id, self.config.camera);
        let result = self.bridge.call(|completer| {
            let callback = self.device_callback(completer);
            self.provider.open_device(&self.config.camera, &worker, callback)
        });

        let mut inner = self.inner.lock();
        match result {
            Ok(device) if inner.state.is_closed() => {
                drop(inner);
                log::warn!("[{}] Camera opened after release, closing it", self.id);
                self.provider.close_device(&device);
                Err(CaptureError::Interrupted.into_io())
            }
            Ok(device) => {
                inner.device = Some(device);
                inner.state = AcquisitionState::Opened;
                Ok(())
            }
            Err(e) => {
                if inner.state == AcquisitionState::Opening {
                    inner.state = AcquisitionState::Idle;
                }
                drop(inner);
                log::error!("[{}] Failed to open camera {}: {}", self.id, self.config.camera, e);
                Err(e.into_io())
            }
        }
    }

    /// Negotiate a session on `surface` and start the repeating request.
    /// Transitions: opened → session_creating → streaming.
    ///
    /// Returns once the first frame has started, not after it was written.
    pub fn start(&self, surface: P::Surface) -> Result<(), CaptureError> {
        let worker = self.begin_start()?;

        match self.create_session_and_stream(surface, &worker) {
            Ok(()) => {
                let mut inner = self.inner.lock();
                if inner.state.is_closed() {
                    return Err(CaptureError::Interrupted.into_io());
                }
                inner.state = AcquisitionState::Streaming;
                drop(inner);
                log::info!("[{}] Camera capture started ({})", self.id, self.config.size);
                Ok(())
            }
            Err(e) => {
                let mut inner = self.inner.lock();
                if inner.state == AcquisitionState::SessionCreating {
                    // Any session created so far stays owned here until release.
                    inner.state = AcquisitionState::Opened;
                }
                drop(inner);
                log::error!("[{}] Failed to start camera capture: {}", self.id, e);
                Err(e.into_io())
            }
        }
    }

    /// Close the device and stop the worker.
    ///
    /// Safe from any state, from any thread, any number of times. A blocked
    /// `init`/`start` fails with `Interrupted`.
    pub fn release(&self) {
        self.bridge.shutdown();

        let (device, session, worker) = {
            let mut inner = self.inner.lock();
            if inner.state.is_closed() {
                return;
            }
            inner.state = AcquisitionState::Closed;
            (inner.device.take(), inner.session.take(), inner.worker.take())
        };

        if let Some(device) = device {
            log::debug!("[{}] Closing camera", self.id);
            self.provider.close_device(&device);
        }
        drop(session);
        if let Some(worker) = worker {
            worker.quit();
        }
    }

    pub fn size(&self) -> Size {
        self.config.size
    }

    pub fn set_max_size(&self, _max_size: u32) -> bool {
        false
    }

    /// Whether the provider reported a disconnect. Not affected by `release`.
    pub fn is_closed(&self) -> bool {
        self.disconnect.is_disconnected()
    }

    // --- Internal helpers ---

    fn begin_init(&self) -> Result<WorkerHandle, CaptureError> {
        let mut inner = self.inner.lock();
        match inner.state {
            AcquisitionState::Idle => {}
            AcquisitionState::Closed => {
                return Err(CaptureError::InvalidState("camera capture was released".into()));
            }
            other => {
                return Err(CaptureError::InvalidState(format!(
                    "init called while {}",
                    other
                )));
            }
        }

        let worker = match &inner.worker {
            Some(worker) => worker.handle(),
            None => {
                let worker = CallbackWorker::spawn(&self.config.worker_name)
                    .map_err(CaptureError::into_io)?;
                let handle = worker.handle();
                inner.worker = Some(worker);
                handle
            }
        };
        inner.state = AcquisitionState::Opening;
        Ok(worker)
    }

    fn begin_start(&self) -> Result<WorkerHandle, CaptureError> {
        let mut inner = self.inner.lock();
        match inner.state {
            AcquisitionState::Opened => {}
            AcquisitionState::Idle | AcquisitionState::Opening => {
                return Err(CaptureError::InvalidState("start called before init completed".into()));
            }
            AcquisitionState::SessionCreating | AcquisitionState::Streaming => {
                return Err(CaptureError::InvalidState("camera capture already started".into()));
            }
            AcquisitionState::Closed => {
                return Err(CaptureError::InvalidState("camera capture was released".into()));
            }
        }
        let worker = inner
            .worker
            .as_ref()
            .map(CallbackWorker::handle)
            .ok_or_else(|| CaptureError::InvalidState("camera worker not running".into()))?;
        inner.state = AcquisitionState::SessionCreating;
        Ok(worker)
    }

    fn create_session_and_stream(
        &self,
        surface: P::Surface,
        worker: &WorkerHandle,
    ) -> Result<(), CaptureError> {
        log::debug!("[{}] Create capture session", self.id);
        let session = self.bridge.call(|completer| {
            let inner = self.inner.lock();
            let device = inner
                .device
                .as_ref()
                .ok_or_else(|| CaptureError::InvalidState("camera device is closed".into()))?;
            let config = SessionConfiguration {
                outputs: vec![OutputConfiguration::new(surface.clone())],
            };
            let callback = session_callback(self.id, completer);
            self.provider.create_session(device, config, worker, callback)
        })?;
        log::debug!("[{}] Create capture session success", self.id);

        {
            let mut inner = self.inner.lock();
            if inner.state.is_closed() {
                // The device is gone, and the session with it.
                return Err(CaptureError::Interrupted);
            }
            inner.session = Some(session);
        }

        let request = CaptureRequest::builder(self.config.template)
            .add_target(surface)
            .build()?;

        self.bridge.call(|completer| {
            let inner = self.inner.lock();
            let session = inner
                .session
                .as_ref()
                .ok_or_else(|| CaptureError::InvalidState("capture session is closed".into()))?;
            let callback = capture_callback(self.id, completer);
            self.provider.set_repeating_request(session, request, worker, callback)
        })
    }

    /// Listener for the device's whole lifetime: resolves the open request and
    /// turns later disconnects and errors into signals.
    fn device_callback(&self, completer: Completer<P::Device>) -> DeviceCallback<P::Device> {
        let id = self.id;
        let disconnect = Arc::clone(&self.disconnect);
        let provider: Weak<P> = Arc::downgrade(&self.provider);

        Arc::new(move |event: DeviceEvent<P::Device>| match event {
            DeviceEvent::Opened(device) => {
                if let Err(device) = completer.complete(device) {
                    log::warn!("[{}] Camera opened after open request ended, closing it", id);
                    if let Some(provider) = provider.upgrade() {
                        provider.close_device(&device);
                    }
                } else {
                    log::trace!("[{}] Open camera success", id);
                }
            }
            DeviceEvent::Disconnected => {
                log::warn!("[{}] Camera disconnected", id);
                disconnect.notify_disconnected();
                completer.fail(CameraAccessError::DeviceError.into());
                disconnect.notify_error(CameraAccessError::DeviceError);
            }
            DeviceEvent::Error(code) => {
                let kind = classify_open_error(code);
                if !completer.fail(kind.into()) && !disconnect.notify_error(kind) {
                    log::warn!("[{}] Camera error {} ({})", id, code.as_raw(), kind);
                }
            }
        })
    }
}

fn session_callback<S: Send + 'static>(id: Uuid, completer: Completer<S>) -> SessionCallback<S> {
    Arc::new(move |event: SessionEvent<S>| match event {
        SessionEvent::Configured(session) => {
            if completer.complete(session).is_err() {
                log::warn!("[{}] Capture session configured after request ended", id);
            }
        }
        SessionEvent::ConfigureFailed => {
            completer.fail(CameraAccessError::DeviceError.into());
        }
    })
}

fn capture_callback(id: Uuid, completer: Completer<()>) -> CaptureCallback {
    Arc::new(move |event: CaptureEvent| match event {
        CaptureEvent::Started { frame_number, .. } => {
            if completer.complete(()).is_ok() {
                log::trace!("[{}] Capture started at frame {}", id, frame_number);
            }
        }
        CaptureEvent::Failed { frame_number } => {
            if !completer.fail(CameraAccessError::DeviceError.into()) {
                log::debug!("[{}] Capture failed for frame {}", id, frame_number);
            }
        }
    })
}

impl<P: CameraProvider> SurfaceCapture for CameraCapture<P> {
    type Surface = P::Surface;

    fn init(&self) -> Result<(), CaptureError> {
        CameraCapture::init(self)
    }

    fn start(&self, surface: Self::Surface) -> Result<(), CaptureError> {
        CameraCapture::start(self, surface)
    }

    fn release(&self) {
        CameraCapture::release(self)
    }

    fn size(&self) -> Size {
        CameraCapture::size(self)
    }

    fn set_max_size(&self, max_size: u32) -> bool {
        CameraCapture::set_max_size(self, max_size)
    }

    fn is_closed(&self) -> bool {
        CameraCapture::is_closed(self)
    }
}

impl<P: CameraProvider> Drop for CameraCapture<P> {
    fn drop(&mut self) {
        self.release();
    }
}
