use crate::models::camera_models::Size;
use crate::models::error::CaptureError;

/// Capture source writing frames into a surface.
///
/// Lifecycle: `init` → `start` → `release`. `release` may be called at any
/// point, any number of times, including while `init`/`start` is blocked on
/// another thread.
pub trait SurfaceCapture: Send + Sync {
    type Surface;

    /// Acquire the capture source. Blocks until done.
    fn init(&self) -> Result<(), CaptureError>;

    /// Start writing frames into `surface`. Blocks until capture has started.
    fn start(&self, surface: Self::Surface) -> Result<(), CaptureError>;

    /// Release every resource. Never fails.
    fn release(&self);

    /// Size of the frames written to the surface.
    fn size(&self) -> Size;

    /// Limit the frame size. Returns `false` if resizing is not supported.
    fn set_max_size(&self, max_size: u32) -> bool;

    /// Whether the source was closed by the system and must be rebuilt.
    fn is_closed(&self) -> bool;
}
