pub mod app_shell;
pub mod capture;
pub mod classifier;
pub mod exif_service;
pub mod photo_io;
pub mod pipeline;
#[cfg(feature = "shell")]
pub mod platform;
pub mod preprocessor;
pub mod view_shell;
