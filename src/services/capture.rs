//! Camera capture and library picking behind one descriptor type.

use crate::error::{AppError, PermissionKind};
use crate::models::photo_types::{
    CameraPicture, CaptureOptions, CaptureOutcome, LibraryAsset, LibraryOptions, LibraryResult,
    PermissionStatus, PhotoDescriptor, PhotoOrigin,
};
use crate::services::{exif_service, photo_io};
use futures::future::BoxFuture;

pub trait CameraDevice: Send + Sync {
    fn request_permission(&self) -> BoxFuture<'_, Result<PermissionStatus, AppError>>;

    /// `Ok(None)` when the user backed out before a picture was saved.
    fn take_picture<'a>(
        &'a self,
        options: &'a CaptureOptions,
    ) -> BoxFuture<'a, Result<Option<CameraPicture>, AppError>>;
}

pub trait PhotoLibrary: Send + Sync {
    fn request_permission(&self) -> BoxFuture<'_, Result<PermissionStatus, AppError>>;

    fn launch<'a>(&'a self, options: &'a LibraryOptions) -> BoxFuture<'a, Result<LibraryResult, AppError>>;
}

pub async fn capture_from_device(
    camera: &dyn CameraDevice,
    options: &CaptureOptions,
) -> Result<CaptureOutcome, AppError> {
    let permission = camera.request_permission().await?;
    if !permission.is_granted() {
        log::info!("Camera permission {:?}", permission);
        return Err(AppError::PermissionDenied(PermissionKind::Camera));
    }

    match camera.take_picture(options).await? {
        Some(picture) => Ok(CaptureOutcome::Photo(from_camera(picture).await)),
        None => {
            log::debug!("Camera capture cancelled");
            Ok(CaptureOutcome::Cancelled)
        }
    }
}

pub async fn pick_from_library(
    library: &dyn PhotoLibrary,
    options: &LibraryOptions,
) -> Result<CaptureOutcome, AppError> {
    let permission = library.request_permission().await?;
    if !permission.is_granted() {
        log::info!("Library permission {:?}", permission);
        return Err(AppError::PermissionDenied(PermissionKind::Library));
    }

    let result = library.launch(options).await?;
    if result.cancelled {
        log::debug!("Library pick cancelled");
        return Ok(CaptureOutcome::Cancelled);
    }
    match result.assets.into_iter().next() {
        Some(asset) => Ok(CaptureOutcome::Photo(from_library(asset).await)),
        // Some pickers report "not cancelled" with nothing selected.
        None => Ok(CaptureOutcome::Cancelled),
    }
}

async fn from_camera(picture: CameraPicture) -> PhotoDescriptor {
    normalize(picture.uri, picture.width, picture.height, picture.base64, PhotoOrigin::Camera).await
}

async fn from_library(asset: LibraryAsset) -> PhotoDescriptor {
    normalize(asset.uri, asset.width, asset.height, asset.base64, PhotoOrigin::Library).await
}

async fn normalize(
    uri: String,
    width: u32,
    height: u32,
    base64: Option<String>,
    origin: PhotoOrigin,
) -> PhotoDescriptor {
    let mut photo = PhotoDescriptor {
        uri,
        width,
        height,
        base64,
        origin,
    };
    if photo.width == 0 || photo.height == 0 {
        // Platforms do not always report dimensions; fall back to the header,
        // as displayed after EXIF rotation.
        if let Ok(bytes) = photo_io::read_photo_bytes(&photo).await {
            if let Some((w, h)) = photo_io::probe_dimensions(&bytes) {
                let rotated = exif_service::swaps_dimensions(exif_service::orientation_from_bytes(&bytes));
                (photo.width, photo.height) = if rotated { (h, w) } else { (w, h) };
            }
        }
    }
    photo
}
