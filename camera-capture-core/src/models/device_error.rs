//! Provider error codes and their classification.
//!
//! The provider reports "open device" failures as integer codes. Session
//! negotiation and repeating-request failures carry no code at all and are
//! always classified as [`CameraAccessError::DeviceError`].

use serde::{Deserialize, Serialize};

use super::error::CameraAccessError;

/// Error code reported by the provider's device state callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceErrorCode {
    CameraInUse,
    MaxCamerasInUse,
    CameraDisabled,
    CameraDevice,
    CameraService,
    Unknown(i32),
}

impl DeviceErrorCode {
    pub const CAMERA_IN_USE: i32 = 1;
    pub const MAX_CAMERAS_IN_USE: i32 = 2;
    pub const CAMERA_DISABLED: i32 = 3;
    pub const CAMERA_DEVICE: i32 = 4;
    pub const CAMERA_SERVICE: i32 = 5;

    pub fn from_raw(code: i32) -> Self {
        match code {
            Self::CAMERA_IN_USE => Self::CameraInUse,
            Self::MAX_CAMERAS_IN_USE => Self::MaxCamerasInUse,
            Self::CAMERA_DISABLED => Self::CameraDisabled,
            Self::CAMERA_DEVICE => Self::CameraDevice,
            Self::CAMERA_SERVICE => Self::CameraService,
            other => Self::Unknown(other),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Self::CameraInUse => Self::CAMERA_IN_USE,
            Self::MaxCamerasInUse => Self::MAX_CAMERAS_IN_USE,
            Self::CameraDisabled => Self::CAMERA_DISABLED,
            Self::CameraDevice => Self::CAMERA_DEVICE,
            Self::CameraService => Self::CAMERA_SERVICE,
            Self::Unknown(code) => code,
        }
    }
}

impl From<i32> for DeviceErrorCode {
    fn from(code: i32) -> Self {
        Self::from_raw(code)
    }
}

impl From<DeviceErrorCode> for CameraAccessError {
    fn from(code: DeviceErrorCode) -> Self {
        classify_open_error(code)
    }
}

/// Map an "open device" failure code to its access error kind.
///
/// Device and service faults, as well as any code the provider may add later,
/// fall into [`CameraAccessError::DeviceError`].
pub fn classify_open_error(code: DeviceErrorCode) -> CameraAccessError {
    match code {
        DeviceErrorCode::CameraInUse => CameraAccessError::DeviceInUse,
        DeviceErrorCode::MaxCamerasInUse => CameraAccessError::TooManyDevicesInUse,
        DeviceErrorCode::CameraDisabled => CameraAccessError::DeviceDisabled,
        DeviceErrorCode::CameraDevice
        | DeviceErrorCode::CameraService
        | DeviceErrorCode::Unknown(_) => CameraAccessError::DeviceError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_codes() {
        let cases = [
            (1, CameraAccessError::DeviceInUse),
            (2, CameraAccessError::TooManyDevicesInUse),
            (3, CameraAccessError::DeviceDisabled),
            (4, CameraAccessError::DeviceError),
            (5, CameraAccessError::DeviceError),
        ];
        for (raw, expected) in cases {
            assert_eq!(classify_open_error(DeviceErrorCode::from_raw(raw)), expected, "code {raw}");
        }
    }

    #[test]
    fn unknown_codes_are_device_errors() {
        for raw in [0, -1, 6, 42, i32::MAX, i32::MIN] {
            let code = DeviceErrorCode::from_raw(raw);
            assert_eq!(code, DeviceErrorCode::Unknown(raw));
            assert_eq!(CameraAccessError::from(code), CameraAccessError::DeviceError);
        }
    }

    #[test]
    fn raw_value_preserved() {
        assert_eq!(DeviceErrorCode::from(3).as_raw(), 3);
        assert_eq!(DeviceErrorCode::Unknown(77).as_raw(), 77);
    }
}
