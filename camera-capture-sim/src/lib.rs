//! # camera-capture-sim
//!
//! Scripted in-memory backend for camera-capture-core.
//!
//! Provides:
//! - `SimCameraProvider` — a `CameraProvider` whose answers follow a script
//! - `SimDevice`, `SimSession`, `SimSurface` — the handles it hands out
//! - `SimEvent` — the ordered log of what the provider saw and delivered
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use camera_capture_core::{CameraCapture, CameraCaptureConfig, CameraSelector, Size};
//! use camera_capture_sim::{SimCameraProvider, SimSurface};
//!
//! let provider = Arc::new(SimCameraProvider::new(["0", "1"]));
//! let config = CameraCaptureConfig::new(CameraSelector::explicit("0"), Size::new(1280, 720));
//! let capture = CameraCapture::new(provider, config, Arc::new(|| println!("reset")))?;
//! capture.init()?;
//! capture.start(SimSurface::new("preview"))?;
//! capture.release();
//! ```

pub mod handles;
pub mod provider;
pub mod script;

pub use handles::{SimDevice, SimSession, SimSurface};
pub use provider::SimCameraProvider;
pub use script::{OpenBehavior, RepeatingBehavior, SessionBehavior, SimEvent};
