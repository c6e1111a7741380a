use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Opened simulated camera.
#[derive(Debug)]
pub struct SimDevice {
    pub(crate) camera_id: String,
    pub(crate) serial: u64,
    pub(crate) closed: Arc<AtomicBool>,
}

impl SimDevice {
    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Second handle to the same device, sharing its closed flag.
    pub(crate) fn alias(&self) -> SimDevice {
        SimDevice {
            camera_id: self.camera_id.clone(),
            serial: self.serial,
            closed: Arc::clone(&self.closed),
        }
    }
}

/// Negotiated simulated session. Invalid once its device is closed.
#[derive(Debug)]
pub struct SimSession {
    pub(crate) camera_id: String,
    pub(crate) device_serial: u64,
    pub(crate) device_closed: Arc<AtomicBool>,
}

impl SimSession {
    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn is_valid(&self) -> bool {
        !self.device_closed.load(Ordering::SeqCst)
    }
}

/// Output target counting the frames written into it.
#[derive(Debug, Clone)]
pub struct SimSurface {
    name: Arc<str>,
    frames: Arc<AtomicU64>,
}

impl SimSurface {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frames_written(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    pub(crate) fn write_frame(&self) {
        self.frames.fetch_add(1, Ordering::SeqCst);
    }
}
