use thiserror::Error;

/// Classified reasons a camera device could not be accessed.
///
/// Every failure reported by the provider, whether while opening the device,
/// negotiating a session or starting the repeating request, ends up as one of
/// these kinds.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraAccessError {
    #[error("camera device is already in use")]
    DeviceInUse,

    #[error("too many camera devices in use")]
    TooManyDevicesInUse,

    #[error("camera device is disabled")]
    DeviceDisabled,

    #[error("camera device error")]
    DeviceError,
}

/// Errors that can occur during camera acquisition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error(transparent)]
    Access(#[from] CameraAccessError),

    #[error("interrupted while waiting for the camera")]
    Interrupted,

    /// Wrapper applied when an error crosses the public `init`/`start` boundary.
    #[error("I/O failure: {0}")]
    Io(#[source] Box<CaptureError>),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("configuration failed: {0}")]
    Configuration(String),

    #[error("worker error: {0}")]
    Worker(String),
}

impl CaptureError {
    /// Wrap `self` as an I/O failure, unless it already is one.
    pub fn into_io(self) -> Self {
        match self {
            Self::Io(_) => self,
            other => Self::Io(Box::new(other)),
        }
    }

    /// The innermost error, with any `Io` wrappers removed.
    pub fn root_cause(&self) -> &CaptureError {
        let mut err = self;
        while let Self::Io(inner) = err {
            err = inner;
        }
        err
    }

    /// The classified access kind, if this error carries one.
    pub fn access_kind(&self) -> Option<CameraAccessError> {
        match self.root_cause() {
            Self::Access(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.root_cause(), Self::Interrupted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_io_wraps_once() {
        let err = CaptureError::from(CameraAccessError::DeviceInUse).into_io();
        assert!(matches!(err, CaptureError::Io(_)));

        let twice = err.clone().into_io();
        assert_eq!(twice, err);
    }

    #[test]
    fn root_cause_strips_io() {
        let err = CaptureError::Interrupted.into_io();
        assert_eq!(err.root_cause(), &CaptureError::Interrupted);
        assert!(err.is_interrupted());
        assert_eq!(err.access_kind(), None);
    }

    #[test]
    fn access_kind_through_wrapper() {
        let err = CaptureError::from(CameraAccessError::DeviceDisabled).into_io();
        assert_eq!(err.access_kind(), Some(CameraAccessError::DeviceDisabled));
    }

    #[test]
    fn display_includes_cause() {
        let err = CaptureError::from(CameraAccessError::DeviceInUse).into_io();
        assert_eq!(err.to_string(), "I/O failure: camera device is already in use");
    }
}
