pub mod camera_models;
pub mod config;
pub mod device_error;
pub mod error;
pub mod state;
