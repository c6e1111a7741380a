/// External controller notified when the capture must be rebuilt.
///
/// Called from the camera worker thread, at most once per disconnect episode.
pub trait ResetSink: Send + Sync {
    fn request_reset(&self);
}

impl<F> ResetSink for F
where
    F: Fn() + Send + Sync,
{
    fn request_reset(&self) {
        self()
    }
}
