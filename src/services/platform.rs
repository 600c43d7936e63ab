//! Desktop adapters for the capture traits.

use crate::error::AppError;
use crate::models::photo_types::{
    CameraPicture, CaptureOptions, LibraryAsset, LibraryOptions, LibraryResult, PermissionStatus,
};
use crate::models::pipeline_types::PipelineSnapshot;
use crate::services::capture::{CameraDevice, PhotoLibrary};
use crate::services::photo_io;
use crate::services::pipeline::PipelineObserver;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tauri::{AppHandle, Emitter, Manager};
use tauri_plugin_dialog::DialogExt;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tiff", "tif"];

static CAPTURE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The webview owns the camera stream (`getUserMedia`) and hands over the
/// saved frame as a `data:` URL. No frame means the user backed out.
pub struct WebviewCamera {
    frame: Option<String>,
    permission: Option<bool>,
    scratch_dir: PathBuf,
}

impl WebviewCamera {
    pub fn new(frame: Option<String>, permission: Option<bool>, scratch_dir: PathBuf) -> Self {
        Self {
            frame,
            permission,
            scratch_dir,
        }
    }

    async fn save_frame(&self, frame: &str, options: &CaptureOptions) -> Result<CameraPicture, AppError> {
        log::debug!("Saving webview frame (flash {:?})", options.flash);
        let bytes = photo_io::decode_base64_payload(frame)?;
        let (width, height) = photo_io::probe_dimensions(&bytes)
            .ok_or_else(|| AppError::Capture("camera frame is not an image".to_string()))?;

        let ext = match image::guess_format(&bytes) {
            Ok(image::ImageFormat::Png) => "png",
            Ok(image::ImageFormat::WebP) => "webp",
            _ => "jpg",
        };
        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| AppError::io(format!("Failed to create {}", self.scratch_dir.display()), e))?;
        let n = CAPTURE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = self.scratch_dir.join(format!("capture-{}.{}", n, ext));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| AppError::io(format!("Failed to save capture {}", path.display()), e))?;

        Ok(CameraPicture {
            uri: photo_io::path_to_uri(&path),
            width,
            height,
            base64: options.base64.then(|| photo_io::encode_base64(&bytes)),
        })
    }
}

impl CameraDevice for WebviewCamera {
    fn request_permission(&self) -> BoxFuture<'_, Result<PermissionStatus, AppError>> {
        let status = match self.permission {
            Some(true) => PermissionStatus::Granted,
            Some(false) => PermissionStatus::Denied,
            None => PermissionStatus::Undetermined,
        };
        async move { Ok(status) }.boxed()
    }

    fn take_picture<'a>(
        &'a self,
        options: &'a CaptureOptions,
    ) -> BoxFuture<'a, Result<Option<CameraPicture>, AppError>> {
        async move {
            match self.frame.as_deref() {
                Some(frame) => self.save_frame(frame, options).await.map(Some),
                None => Ok(None),
            }
        }
        .boxed()
    }
}

/// Picks a photo through the native file dialog.
pub struct DialogLibrary {
    app: AppHandle,
}

impl DialogLibrary {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl PhotoLibrary for DialogLibrary {
    fn request_permission(&self) -> BoxFuture<'_, Result<PermissionStatus, AppError>> {
        // Desktop file dialogs are not permission-gated.
        async { Ok(PermissionStatus::Granted) }.boxed()
    }

    fn launch<'a>(&'a self, options: &'a LibraryOptions) -> BoxFuture<'a, Result<LibraryResult, AppError>> {
        async move {
            let (tx, rx) = tokio::sync::oneshot::channel();
            self.app
                .dialog()
                .file()
                .add_filter("Images", IMAGE_EXTENSIONS)
                .pick_file(move |file| {
                    let _ = tx.send(file);
                });

            let file = match rx.await {
                Ok(Some(file)) => file,
                Ok(None) | Err(_) => return Ok(LibraryResult::cancelled()),
            };
            let path = file
                .into_path()
                .map_err(|e| AppError::Capture(format!("Unsupported selection: {}", e)))?;

            // The preview loads the file through the asset protocol.
            if let Err(e) = self.app.asset_protocol_scope().allow_file(&path) {
                log::warn!("Could not expose {} to the webview: {}", path.display(), e);
            }

            // Dimensions of 0 are probed from the header during normalization.
            let base64 = if options.base64 {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;
                Some(photo_io::encode_base64(&bytes))
            } else {
                None
            };

            Ok(LibraryResult {
                cancelled: false,
                assets: vec![LibraryAsset {
                    uri: photo_io::path_to_uri(&path),
                    width: 0,
                    height: 0,
                    base64,
                }],
            })
        }
        .boxed()
    }
}

/// Forwards pipeline changes to the frontend as `pipeline-status` events.
pub struct EventObserver {
    app: AppHandle,
}

impl EventObserver {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl PipelineObserver for EventObserver {
    fn on_change(&self, snapshot: &PipelineSnapshot) {
        if let Err(e) = self.app.emit("pipeline-status", snapshot) {
            log::warn!("Failed to emit pipeline-status: {}", e);
        }
    }
}
