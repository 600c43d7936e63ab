//! Dispatches user actions to the capture source, the pipeline and the view state.

use crate::error::{AppError, PermissionKind};
use crate::models::photo_types::{CaptureOptions, CaptureOutcome, FlashMode, LibraryOptions};
use crate::models::pipeline_types::PipelineOutcome;
use crate::models::view_types::ViewModel;
use crate::services::capture::{self, CameraDevice, PhotoLibrary};
use crate::services::classifier::model_manager::ModelLoader;
use crate::services::pipeline::PredictionPipeline;
use crate::services::view_shell::ViewState;
use std::sync::Arc;
use tokio::sync::Mutex;

/// What a capture or pick led to.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    Classified(PipelineOutcome),
    Cancelled,
    PermissionDenied(PermissionKind),
}

pub struct AppShell {
    view: Mutex<ViewState>,
    pipeline: Arc<PredictionPipeline>,
    model: Arc<ModelLoader>,
}

impl AppShell {
    pub fn new(pipeline: Arc<PredictionPipeline>, model: Arc<ModelLoader>) -> Self {
        Self {
            view: Mutex::new(ViewState::default()),
            pipeline,
            model,
        }
    }

    pub fn pipeline(&self) -> &Arc<PredictionPipeline> {
        &self.pipeline
    }

    pub fn model(&self) -> &Arc<ModelLoader> {
        &self.model
    }

    pub async fn view_model(&self) -> ViewModel {
        let snapshot = self.pipeline.snapshot().await;
        let view = self.view.lock().await;
        view.render(&snapshot, &self.model.status())
    }

    pub async fn flash(&self) -> FlashMode {
        self.view.lock().await.flash
    }

    pub async fn camera_permission(&self) -> Option<bool> {
        self.view.lock().await.camera_permission
    }

    /// Takes a picture and classifies it. A new photo supersedes whatever
    /// the pipeline was doing.
    pub async fn capture(&self, camera: &dyn CameraDevice) -> Result<ActionResult, AppError> {
        let options = CaptureOptions {
            flash: self.flash().await,
            ..CaptureOptions::default()
        };
        match capture::capture_from_device(camera, &options).await {
            Ok(outcome) => {
                self.view.lock().await.camera_permission = Some(true);
                self.classify(outcome).await
            }
            Err(AppError::PermissionDenied(kind)) => {
                self.view.lock().await.camera_permission = Some(false);
                Ok(ActionResult::PermissionDenied(kind))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn pick(&self, library: &dyn PhotoLibrary) -> Result<ActionResult, AppError> {
        match capture::pick_from_library(library, &LibraryOptions::default()).await {
            Ok(outcome) => self.classify(outcome).await,
            Err(AppError::PermissionDenied(kind)) => Ok(ActionResult::PermissionDenied(kind)),
            Err(e) => Err(e),
        }
    }

    async fn classify(&self, outcome: CaptureOutcome) -> Result<ActionResult, AppError> {
        match outcome {
            CaptureOutcome::Photo(photo) => {
                self.view.lock().await.hide_menu();
                Ok(ActionResult::Classified(self.pipeline.submit(photo).await))
            }
            CaptureOutcome::Cancelled => Ok(ActionResult::Cancelled),
        }
    }

    pub async fn clear(&self) {
        self.pipeline.clear().await;
    }

    pub async fn report_camera_permission(&self, granted: bool) {
        self.view.lock().await.camera_permission = Some(granted);
    }

    pub async fn toggle_menu(&self) {
        self.view.lock().await.toggle_menu();
    }

    pub async fn hide_menu(&self) {
        self.view.lock().await.hide_menu();
    }

    pub async fn toggle_dark_mode(&self) {
        self.view.lock().await.toggle_dark_mode();
    }

    pub async fn toggle_flash(&self) {
        self.view.lock().await.toggle_flash();
    }
}
