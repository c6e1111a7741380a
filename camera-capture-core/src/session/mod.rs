pub mod camera_capture;
pub mod disconnect;
