//! In-memory camera provider.
//!
//! Answers requests according to a script and honours the provider contract:
//! every callback is posted to the worker it was registered with, closing a
//! device fails whatever is still pending on it, and a device the worker can
//! no longer take is closed on the spot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use camera_capture_core::{
    CameraAccessError, CameraProvider, CameraSelector, CaptureCallback, CaptureError, CaptureEvent,
    CaptureRequest, DeviceCallback, DeviceErrorCode, DeviceEvent, SessionCallback,
    SessionConfiguration, SessionEvent, WorkerHandle,
};

use crate::handles::{SimDevice, SimSession, SimSurface};
use crate::script::{OpenBehavior, RepeatingBehavior, SessionBehavior, SimEvent};

struct Listener {
    request: u64,
    camera_id: String,
    serial: Option<u64>,
    worker: WorkerHandle,
    callback: DeviceCallback<SimDevice>,
}

struct HangingOpen {
    request: u64,
    camera_id: String,
    worker: WorkerHandle,
    callback: DeviceCallback<SimDevice>,
}

enum Pending {
    Session {
        device_serial: u64,
        camera_id: String,
        worker: WorkerHandle,
        callback: SessionCallback<SimSession>,
    },
    Repeating {
        device_serial: u64,
        camera_id: String,
        worker: WorkerHandle,
        callback: CaptureCallback,
    },
}

impl Pending {
    fn device_serial(&self) -> u64 {
        match self {
            Self::Session { device_serial, .. } | Self::Repeating { device_serial, .. } => {
                *device_serial
            }
        }
    }
}

struct HeldFrame {
    camera_id: String,
    worker: WorkerHandle,
    targets: Vec<SimSurface>,
}

struct SimState {
    cameras: Vec<String>,
    open: OpenBehavior,
    session: SessionBehavior,
    repeating: RepeatingBehavior,
    next_request: u64,
    next_serial: u64,
    next_timestamp_ns: i64,
    listeners: Vec<Listener>,
    hanging_opens: Vec<HangingOpen>,
    pending: Vec<Pending>,
    held_frames: Vec<HeldFrame>,
    events: Vec<SimEvent>,
    callback_threads: Vec<Option<String>>,
}

impl SimState {
    fn new_device(&mut self, camera_id: &str) -> SimDevice {
        self.next_serial += 1;
        SimDevice {
            camera_id: camera_id.to_string(),
            serial: self.next_serial,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn resolve(&self, camera: &CameraSelector) -> Result<String, CaptureError> {
        let found = match camera {
            CameraSelector::Auto => self.cameras.first(),
            CameraSelector::Explicit(id) => self.cameras.iter().find(|c| *c == id),
        };
        found.cloned().ok_or(CaptureError::Access(CameraAccessError::DeviceError))
    }
}

/// Scripted [`CameraProvider`] backed by memory.
#[derive(Clone)]
pub struct SimCameraProvider {
    state: Arc<Mutex<SimState>>,
}

impl SimCameraProvider {
    /// Provider exposing the given camera ids. `Auto` picks the first one.
    pub fn new<I, S>(cameras: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Arc::new(Mutex::new(SimState {
                cameras: cameras.into_iter().map(Into::into).collect(),
                open: OpenBehavior::default(),
                session: SessionBehavior::default(),
                repeating: RepeatingBehavior::default(),
                next_request: 0,
                next_serial: 0,
                next_timestamp_ns: 1_000_000,
                listeners: Vec::new(),
                hanging_opens: Vec::new(),
                pending: Vec::new(),
                held_frames: Vec::new(),
                events: Vec::new(),
                callback_threads: Vec::new(),
            })),
        }
    }

    pub fn set_open_behavior(&self, behavior: OpenBehavior) {
        self.state.lock().open = behavior;
    }

    pub fn set_session_behavior(&self, behavior: SessionBehavior) {
        self.state.lock().session = behavior;
    }

    pub fn set_repeating_behavior(&self, behavior: RepeatingBehavior) {
        self.state.lock().repeating = behavior;
    }

    /// Everything observed so far, in order.
    pub fn events(&self) -> Vec<SimEvent> {
        self.state.lock().events.clone()
    }

    /// Names of the threads callbacks were delivered on.
    pub fn callback_threads(&self) -> Vec<Option<String>> {
        self.state.lock().callback_threads.clone()
    }

    pub fn count(&self, pred: impl Fn(&SimEvent) -> bool) -> usize {
        self.state.lock().events.iter().filter(|e| pred(e)).count()
    }

    /// Number of open requests still waiting for `complete_pending_opens`.
    pub fn hanging_opens(&self) -> usize {
        self.state.lock().hanging_opens.len()
    }

    /// Number of session/repeating requests left unanswered by a `Hang` script.
    pub fn pending_callbacks(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Answer every hanging open request with a freshly opened device.
    pub fn complete_pending_opens(&self) -> usize {
        let mut state = self.state.lock();
        let hanging = std::mem::take(&mut state.hanging_opens);
        let count = hanging.len();
        let mut rejected = Vec::new();
        for open in hanging {
            let device = state.new_device(&open.camera_id);
            if let Some(listener) = state.listeners.iter_mut().find(|l| l.request == open.request) {
                listener.serial = Some(device.serial);
            }
            rejected.extend(self.deliver_opened(&open.worker, device, open.callback));
        }
        drop(state);

        for device in rejected {
            self.close_device(&device);
        }
        count
    }

    /// Write the frames held back by `RepeatingBehavior::StartWithoutFrames`.
    pub fn write_pending_frames(&self) -> usize {
        let held = std::mem::take(&mut self.state.lock().held_frames);
        let count = held.len();
        for frame in held {
            let targets = frame.targets;
            self.deliver(&frame.worker, SimEvent::FrameWritten(frame.camera_id), move || {
                targets.iter().for_each(SimSurface::write_frame)
            });
        }
        count
    }

    /// Report a disconnect to every listener of `camera_id`.
    pub fn disconnect(&self, camera_id: &str) -> usize {
        let state = self.state.lock();
        let mut notified = 0;
        for listener in state.listeners.iter().filter(|l| l.camera_id == camera_id) {
            let callback = Arc::clone(&listener.callback);
            let event = SimEvent::Disconnected(camera_id.to_string());
            self.deliver(&listener.worker, event, move || callback(DeviceEvent::Disconnected));
            notified += 1;
        }
        notified
    }

    /// Report a device error to every listener of `camera_id`.
    pub fn report_error(&self, camera_id: &str, code: DeviceErrorCode) -> usize {
        let state = self.state.lock();
        let mut notified = 0;
        for listener in state.listeners.iter().filter(|l| l.camera_id == camera_id) {
            let callback = Arc::clone(&listener.callback);
            let event = SimEvent::DeviceError(camera_id.to_string(), code);
            self.deliver(&listener.worker, event, move || callback(DeviceEvent::Error(code)));
            notified += 1;
        }
        notified
    }

    /// Post `job` on `worker`, recording `event` and the thread when it runs.
    /// Returns `false` if the worker has quit and the job was dropped.
    fn deliver<F>(&self, worker: &WorkerHandle, event: SimEvent, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let posted = worker.post(move || {
            {
                let mut s = state.lock();
                s.events.push(event);
                s.callback_threads.push(thread::current().name().map(str::to_owned));
            }
            job();
        });
        if !posted {
            log::debug!("worker '{}' gone, callback dropped", worker.name());
        }
        posted
    }

    /// Hand `device` to `callback` on `worker`. If the worker is gone nobody
    /// will ever own the device, so it comes back to be closed once the state
    /// lock is released.
    fn deliver_opened(
        &self,
        worker: &WorkerHandle,
        device: SimDevice,
        callback: DeviceCallback<SimDevice>,
    ) -> Option<SimDevice> {
        let rejected = device.alias();
        let event = SimEvent::DeviceOpened(device.camera_id.clone());
        let posted = self.deliver(worker, event, move || callback(DeviceEvent::Opened(device)));
        (!posted).then_some(rejected)
    }
}

impl CameraProvider for SimCameraProvider {
    type Device = SimDevice;
    type Session = SimSession;
    type Surface = SimSurface;

    fn open_device(
        &self,
        camera: &CameraSelector,
        worker: &WorkerHandle,
        callback: DeviceCallback<SimDevice>,
    ) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        let camera_id = state.resolve(camera)?;
        state.events.push(SimEvent::OpenRequested(camera_id.clone()));
        state.next_request += 1;
        let request = state.next_request;

        let behavior = state.open;
        match behavior {
            OpenBehavior::Refuse(kind) => Err(kind.into()),
            OpenBehavior::Fail(code) => {
                self.deliver(worker, SimEvent::OpenFailed(camera_id, code), move || {
                    callback(DeviceEvent::Error(code))
                });
                Ok(())
            }
            OpenBehavior::Succeed => {
                let device = state.new_device(&camera_id);
                state.listeners.push(Listener {
                    request,
                    camera_id: camera_id.clone(),
                    serial: Some(device.serial),
                    worker: worker.clone(),
                    callback: Arc::clone(&callback),
                });
                if let Some(device) = self.deliver_opened(worker, device, callback) {
                    drop(state);
                    self.close_device(&device);
                }
                Ok(())
            }
            OpenBehavior::Hang => {
                state.listeners.push(Listener {
                    request,
                    camera_id: camera_id.clone(),
                    serial: None,
                    worker: worker.clone(),
                    callback: Arc::clone(&callback),
                });
                state.hanging_opens.push(HangingOpen {
                    request,
                    camera_id,
                    worker: worker.clone(),
                    callback,
                });
                Ok(())
            }
        }
    }

    fn create_session(
        &self,
        device: &SimDevice,
        config: SessionConfiguration<SimSurface>,
        worker: &WorkerHandle,
        callback: SessionCallback<SimSession>,
    ) -> Result<(), CaptureError> {
        if device.is_closed() || config.outputs.is_empty() {
            return Err(CameraAccessError::DeviceError.into());
        }

        let mut state = self.state.lock();
        let camera_id = device.camera_id.clone();
        let behavior = state.session;
        match behavior {
            SessionBehavior::Configure => {
                let session = SimSession {
                    camera_id: camera_id.clone(),
                    device_serial: device.serial,
                    device_closed: Arc::clone(&device.closed),
                };
                self.deliver(worker, SimEvent::SessionCreated(camera_id), move || {
                    callback(SessionEvent::Configured(session))
                });
            }
            SessionBehavior::Fail => {
                self.deliver(worker, SimEvent::SessionFailed(camera_id), move || {
                    callback(SessionEvent::ConfigureFailed)
                });
            }
            SessionBehavior::Hang => state.pending.push(Pending::Session {
                device_serial: device.serial,
                camera_id,
                worker: worker.clone(),
                callback,
            }),
        }
        Ok(())
    }

    fn set_repeating_request(
        &self,
        session: &SimSession,
        request: CaptureRequest<SimSurface>,
        worker: &WorkerHandle,
        callback: CaptureCallback,
    ) -> Result<(), CaptureError> {
        if !session.is_valid() {
            return Err(CameraAccessError::DeviceError.into());
        }

        let mut state = self.state.lock();
        let camera_id = session.camera_id.clone();
        let behavior = state.repeating;
        match behavior {
            RepeatingBehavior::Start | RepeatingBehavior::StartWithoutFrames => {
                let timestamp_ns = state.next_timestamp_ns;
                state.next_timestamp_ns += 33_333_333;
                self.deliver(worker, SimEvent::CaptureStarted(camera_id.clone()), move || {
                    callback(CaptureEvent::Started {
                        timestamp_ns,
                        frame_number: 0,
                    })
                });
                let targets = request.targets().to_vec();
                if behavior == RepeatingBehavior::Start {
                    self.deliver(worker, SimEvent::FrameWritten(camera_id), move || {
                        targets.iter().for_each(SimSurface::write_frame)
                    });
                } else {
                    state.held_frames.push(HeldFrame {
                        camera_id,
                        worker: worker.clone(),
                        targets,
                    });
                }
            }
            RepeatingBehavior::Fail => {
                self.deliver(worker, SimEvent::CaptureFailed(camera_id), move || {
                    callback(CaptureEvent::Failed { frame_number: 0 })
                });
            }
            RepeatingBehavior::Hang => state.pending.push(Pending::Repeating {
                device_serial: session.device_serial,
                camera_id,
                worker: worker.clone(),
                callback,
            }),
        }
        Ok(())
    }

    fn close_device(&self, device: &SimDevice) {
        if device.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut state = self.state.lock();
        state.events.push(SimEvent::DeviceClosed(device.camera_id.clone()));
        state.listeners.retain(|l| l.serial != Some(device.serial));
        let (orphaned, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
            .into_iter()
            .partition(|p| p.device_serial() == device.serial);
        state.pending = kept;

        for pending in orphaned {
            match pending {
                Pending::Session {
                    camera_id,
                    worker,
                    callback,
                    ..
                } => self.deliver(&worker, SimEvent::SessionFailed(camera_id), move || {
                    callback(SessionEvent::ConfigureFailed)
                }),
                Pending::Repeating {
                    camera_id,
                    worker,
                    callback,
                    ..
                } => self.deliver(&worker, SimEvent::CaptureFailed(camera_id), move || {
                    callback(CaptureEvent::Failed { frame_number: 0 })
                }),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_capture_core::{CallbackWorker, RequestTemplate};
    use std::sync::mpsc;
    use std::time::Duration;

    fn open(
        provider: &SimCameraProvider,
        worker: &WorkerHandle,
        camera: CameraSelector,
    ) -> mpsc::Receiver<DeviceEvent<SimDevice>> {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let callback = Arc::new(move |event: DeviceEvent<SimDevice>| {
            let _ = tx.lock().send(event);
        });
        provider.open_device(&camera, worker, callback).unwrap();
        rx
    }

    #[test]
    fn auto_selects_first_camera_on_worker() {
        let provider = SimCameraProvider::new(["back", "front"]);
        let worker = CallbackWorker::spawn("camera").unwrap();

        let rx = open(&provider, &worker.handle(), CameraSelector::Auto);
        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            DeviceEvent::Opened(device) => assert_eq!(device.camera_id(), "back"),
            other => panic!("unexpected event: {other:?}"),
        }
        worker.quit();

        assert_eq!(provider.callback_threads(), vec![Some("camera".to_string())]);
        assert_eq!(
            provider.events(),
            vec![
                SimEvent::OpenRequested("back".into()),
                SimEvent::DeviceOpened("back".into()),
            ]
        );
    }

    #[test]
    fn unknown_camera_is_refused() {
        let provider = SimCameraProvider::new(["0"]);
        let worker = CallbackWorker::spawn("camera").unwrap();
        let err = provider
            .open_device(&CameraSelector::explicit("9"), &worker.handle(), Arc::new(|_| {}))
            .unwrap_err();
        assert_eq!(err, CaptureError::Access(CameraAccessError::DeviceError));
    }

    #[test]
    fn device_for_quit_worker_is_closed() {
        let provider = SimCameraProvider::new(["0"]);
        provider.set_open_behavior(OpenBehavior::Hang);
        let worker = CallbackWorker::spawn("camera").unwrap();
        let handle = worker.handle();

        let rx = open(&provider, &handle, CameraSelector::Auto);
        worker.quit();
        assert_eq!(provider.complete_pending_opens(), 1);

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert_eq!(provider.count(|e| matches!(e, SimEvent::DeviceClosed(_))), 1);
        assert_eq!(provider.count(|e| matches!(e, SimEvent::DeviceOpened(_))), 0);

        // Same for a device opened straight onto a worker that has quit.
        provider.set_open_behavior(OpenBehavior::Succeed);
        let _rx = open(&provider, &handle, CameraSelector::Auto);
        assert_eq!(provider.count(|e| matches!(e, SimEvent::DeviceClosed(_))), 2);
    }

    #[test]
    fn closing_device_fails_hanging_session() {
        let provider = SimCameraProvider::new(["0"]);
        provider.set_session_behavior(SessionBehavior::Hang);
        let worker = CallbackWorker::spawn("camera").unwrap();
        let handle = worker.handle();

        let device = match open(&provider, &handle, CameraSelector::Auto).recv().unwrap() {
            DeviceEvent::Opened(device) => device,
            other => panic!("unexpected event: {other:?}"),
        };

        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let surface = SimSurface::new("out");
        let config = SessionConfiguration {
            outputs: vec![camera_capture_core::OutputConfiguration::new(surface)],
        };
        let callback = Arc::new(move |event: SessionEvent<SimSession>| {
            let _ = tx.lock().send(matches!(event, SessionEvent::ConfigureFailed));
        });
        provider.create_session(&device, config, &handle, callback).unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        provider.close_device(&device);
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        assert!(device.is_closed());
    }

    #[test]
    fn start_acknowledges_before_writing_frame() {
        let provider = SimCameraProvider::new(["0"]);
        let worker = CallbackWorker::spawn("camera").unwrap();
        let handle = worker.handle();
        let device = SimDevice {
            camera_id: "0".into(),
            serial: 1,
            closed: Arc::new(AtomicBool::new(false)),
        };
        let session = SimSession {
            camera_id: "0".into(),
            device_serial: 1,
            device_closed: Arc::clone(&device.closed),
        };
        let surface = SimSurface::new("out");
        let request = CaptureRequest::builder(RequestTemplate::Record)
            .add_target(surface.clone())
            .build()
            .unwrap();

        let frames_at_ack = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&frames_at_ack);
        let observed = surface.clone();
        provider
            .set_repeating_request(&session, request, &handle, Arc::new(move |event: CaptureEvent| {
                if let CaptureEvent::Started { .. } = event {
                    *seen.lock() = Some(observed.frames_written());
                }
            }))
            .unwrap();
        worker.quit();

        assert_eq!(*frames_at_ack.lock(), Some(0));
        assert_eq!(surface.frames_written(), 1);
    }
}
