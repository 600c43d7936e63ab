use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Which platform permission a capture needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionKind {
    Camera,
    Library,
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKind::Camera => write!(f, "Camera"),
            PermissionKind::Library => write!(f, "Photo library"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} permission denied")]
    PermissionDenied(PermissionKind),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Model is not ready")]
    ModelNotReady,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Classification failed: {0}")]
    Classify(String),

    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::PermissionDenied(_) => "permissionDenied",
            AppError::ModelLoad(_) => "modelLoad",
            AppError::ModelNotReady => "modelNotReady",
            AppError::Io(_) => "io",
            AppError::Decode(_) => "decode",
            AppError::Classify(_) => "classify",
            AppError::Capture(_) => "capture",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn io(context: impl fmt::Display, err: std::io::Error) -> Self {
        AppError::Io(format!("{}: {}", context, err))
    }
}

// The frontend receives `{ kind, message }` from failed commands.
impl Serialize for AppError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            kind: &'a str,
            message: String,
        }

        Wire {
            kind: self.kind(),
            message: self.to_string(),
        }
        .serialize(serializer)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => AppError::Io(e.to_string()),
            other => AppError::Decode(other.to_string()),
        }
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(err: base64::DecodeError) -> Self {
        AppError::Decode(format!("invalid base64 payload: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", err))
    }
}

#[cfg(feature = "onnx")]
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ModelLoad(err.to_string())
    }
}

#[cfg(feature = "onnx")]
impl From<ort::Error> for AppError {
    fn from(err: ort::Error) -> Self {
        AppError::Classify(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_kind_and_message() {
        let err = AppError::PermissionDenied(PermissionKind::Camera);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "permissionDenied");
        assert_eq!(json["message"], "Camera permission denied");
    }

    #[test]
    fn image_io_errors_stay_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AppError = image::ImageError::IoError(io).into();
        assert_eq!(err.kind(), "io");
    }
}
