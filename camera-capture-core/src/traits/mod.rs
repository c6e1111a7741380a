pub mod capture_provider;
pub mod reset_sink;
pub mod surface_capture;
