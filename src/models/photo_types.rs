use serde::{Deserialize, Serialize};

/// Where a photo came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhotoOrigin {
    Camera,
    Library,
}

/// Normalized reference to a captured or picked image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDescriptor {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    /// Inline copy of the encoded image. Kept out of events and view models.
    #[serde(skip_serializing)]
    pub base64: Option<String>,
    pub origin: PhotoOrigin,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Photo(PhotoDescriptor),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlashMode {
    On,
    #[default]
    Off,
}

impl FlashMode {
    pub fn toggled(self) -> Self {
        match self {
            FlashMode::On => FlashMode::Off,
            FlashMode::Off => FlashMode::On,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

/// Options passed to the camera when taking a picture.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaptureOptions {
    /// Inline the encoded bytes. Only needed when the picture has no file behind it.
    pub base64: bool,
    pub flash: FlashMode,
}

/// Options passed to the photo library picker.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LibraryOptions {
    pub base64: bool,
}

/// What the camera hands back once the picture is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraPicture {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    pub base64: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryAsset {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    pub base64: Option<String>,
}

/// Picker result: either cancelled or a list of selected assets.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryResult {
    pub cancelled: bool,
    pub assets: Vec<LibraryAsset>,
}

impl LibraryResult {
    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            assets: Vec::new(),
        }
    }
}
