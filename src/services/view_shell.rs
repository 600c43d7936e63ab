use crate::models::classify_types::{ModelStatus, Prediction};
use crate::models::photo_types::FlashMode;
use crate::models::pipeline_types::{PipelineSnapshot, PipelineStatus};
use crate::models::view_types::{
    MenuEntry, MenuItem, MenuView, ModelIndicator, PreviewPane, PrimaryAction, ResultRow, Theme,
    ViewModel,
};
use crate::services::photo_io;

pub const APP_TITLE: &str = "Genesis";
pub const PERMISSION_DENIED_MESSAGE: &str = "Accept Camera Permission to access";

const LIGHT: Theme = Theme {
    dark: false,
    background: "#f3f4f6",
    accent: "#e5e7eb",
    text: "#111827",
};

const DARK: Theme = Theme {
    dark: true,
    background: "#111827",
    accent: "#1f2937",
    text: "#f9fafb",
};

/// UI-only state: nothing here affects classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub menu_shown: bool,
    pub dark_mode: bool,
    pub flash: FlashMode,
    /// `None` until the webview has asked for camera access.
    pub camera_permission: Option<bool>,
}

impl ViewState {
    pub fn toggle_menu(&mut self) {
        self.menu_shown = !self.menu_shown;
    }

    pub fn hide_menu(&mut self) {
        self.menu_shown = false;
    }

    pub fn toggle_dark_mode(&mut self) {
        self.dark_mode = !self.dark_mode;
    }

    pub fn toggle_flash(&mut self) {
        self.flash = self.flash.toggled();
    }

    pub fn theme(&self) -> Theme {
        if self.dark_mode {
            DARK
        } else {
            LIGHT
        }
    }

    pub fn render(&self, pipeline: &PipelineSnapshot, model: &ModelStatus) -> ViewModel {
        ViewModel {
            title: APP_TITLE,
            theme: self.theme(),
            menu: MenuView {
                shown: self.menu_shown,
                entries: MenuItem::ALL
                    .iter()
                    .map(|&item| MenuEntry {
                        item,
                        title: item.title().to_string(),
                    })
                    .collect(),
            },
            preview: self.preview(pipeline),
            flash: self.flash,
            primary_action: if pipeline.photo.is_some() {
                PrimaryAction::Clear
            } else {
                PrimaryAction::Capture
            },
            status_label: status_label(pipeline, model),
            busy: pipeline.status.is_busy(),
            model: model_indicator(model),
            results: result_rows(&pipeline.predictions),
        }
    }

    fn preview(&self, pipeline: &PipelineSnapshot) -> PreviewPane {
        if let Some(photo) = &pipeline.photo {
            let path = photo_io::uri_to_path(&photo.uri)
                .ok()
                .map(|p| p.to_string_lossy().to_string());
            let data_url = match (&path, &photo.base64) {
                (None, Some(payload)) if payload.starts_with("data:") => Some(payload.clone()),
                (None, Some(payload)) => Some(format!("data:image/jpeg;base64,{}", payload)),
                _ => None,
            };
            return PreviewPane::Photo {
                uri: photo.uri.clone(),
                path,
                data_url,
            };
        }
        match self.camera_permission {
            Some(true) => PreviewPane::LiveCamera { flash: self.flash },
            Some(false) => PreviewPane::PermissionDenied {
                message: PERMISSION_DENIED_MESSAGE.to_string(),
            },
            None => PreviewPane::AwaitingPermission,
        }
    }
}

pub fn status_label(pipeline: &PipelineSnapshot, model: &ModelStatus) -> String {
    match pipeline.status {
        PipelineStatus::Idle => {
            if model.ready {
                "Take or pick a photo".to_string()
            } else if model.error.is_some() {
                "Model unavailable".to_string()
            } else {
                "Loading model...".to_string()
            }
        }
        PipelineStatus::Resizing => "Resizing photo...".to_string(),
        PipelineStatus::Decoding => "Decoding image...".to_string(),
        PipelineStatus::Classifying => "Classifying...".to_string(),
        PipelineStatus::Done => {
            if pipeline.predictions.is_empty() {
                "No labels found".to_string()
            } else {
                "Done".to_string()
            }
        }
        PipelineStatus::Failed => pipeline
            .message
            .clone()
            .unwrap_or_else(|| "Classification failed".to_string()),
    }
}

pub fn model_indicator(model: &ModelStatus) -> ModelIndicator {
    if model.ready {
        ModelIndicator::Ready
    } else if let Some(error) = &model.error {
        ModelIndicator::Unavailable(error.clone())
    } else {
        ModelIndicator::Loading
    }
}

/// `0.8675` → `"86.75%"`.
pub fn format_percentage(probability: f32) -> String {
    format!("{:.2}%", probability as f64 * 100.0)
}

pub fn result_rows(predictions: &[Prediction]) -> Vec<ResultRow> {
    predictions
        .iter()
        .map(|p| ResultRow {
            label: p.label.clone(),
            percentage: format_percentage(p.probability),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::photo_types::{PhotoDescriptor, PhotoOrigin};

    fn ready() -> ModelStatus {
        ModelStatus {
            loading: false,
            ready: true,
            error: None,
        }
    }

    fn photo() -> PhotoDescriptor {
        PhotoDescriptor {
            uri: "file:///tmp/p.jpg".into(),
            width: 4,
            height: 4,
            base64: None,
            origin: PhotoOrigin::Camera,
        }
    }

    #[test]
    fn percentage_has_two_decimals() {
        assert_eq!(format_percentage(0.8675), "86.75%");
        assert_eq!(format_percentage(0.05), "5.00%");
        assert_eq!(format_percentage(1.0), "100.00%");
    }

    #[test]
    fn rows_keep_order() {
        let rows = result_rows(&[Prediction::new("cat", 0.91), Prediction::new("dog", 0.05)]);
        assert_eq!(rows[0].label, "cat");
        assert_eq!(rows[0].percentage, "91.00%");
        assert_eq!(rows[1].percentage, "5.00%");
    }

    #[test]
    fn preview_follows_photo_and_permission() {
        let mut view = ViewState::default();
        let idle = PipelineSnapshot::default();
        assert_eq!(view.render(&idle, &ready()).preview, PreviewPane::AwaitingPermission);

        view.camera_permission = Some(false);
        assert!(matches!(
            view.render(&idle, &ready()).preview,
            PreviewPane::PermissionDenied { .. }
        ));

        view.camera_permission = Some(true);
        view.toggle_flash();
        assert_eq!(
            view.render(&idle, &ready()).preview,
            PreviewPane::LiveCamera { flash: FlashMode::On }
        );

        let active = PipelineSnapshot {
            photo: Some(photo()),
            status: PipelineStatus::Classifying,
            ..PipelineSnapshot::default()
        };
        let vm = view.render(&active, &ready());
        assert_eq!(
            vm.preview,
            PreviewPane::Photo {
                uri: "file:///tmp/p.jpg".into(),
                path: Some("/tmp/p.jpg".into()),
                data_url: None,
            }
        );
        assert_eq!(vm.primary_action, PrimaryAction::Clear);
        assert!(vm.busy);
        assert_eq!(vm.status_label, "Classifying...");

        // A file-backed photo never ships its bytes, even when it has them.
        let file_backed = PipelineSnapshot {
            photo: Some(PhotoDescriptor {
                base64: Some("aGk=".into()),
                ..photo()
            }),
            ..PipelineSnapshot::default()
        };
        assert!(matches!(
            view.render(&file_backed, &ready()).preview,
            PreviewPane::Photo { data_url: None, path: Some(_), .. }
        ));

        let inline_only = PipelineSnapshot {
            photo: Some(PhotoDescriptor {
                uri: "content://media/42".into(),
                base64: Some("aGk=".into()),
                ..photo()
            }),
            ..PipelineSnapshot::default()
        };
        assert!(matches!(
            view.render(&inline_only, &ready()).preview,
            PreviewPane::Photo { path: None, data_url: Some(ref src), .. } if src == "data:image/jpeg;base64,aGk="
        ));
    }

    #[test]
    fn status_labels() {
        let loading = ModelStatus {
            loading: true,
            ready: false,
            error: None,
        };
        let broken = ModelStatus {
            loading: false,
            ready: false,
            error: Some("offline".into()),
        };
        let idle = PipelineSnapshot::default();
        assert_eq!(status_label(&idle, &loading), "Loading model...");
        assert_eq!(status_label(&idle, &broken), "Model unavailable");
        assert_eq!(model_indicator(&broken), ModelIndicator::Unavailable("offline".into()));
        assert_eq!(model_indicator(&ready()), ModelIndicator::Ready);

        let failed = PipelineSnapshot {
            status: PipelineStatus::Failed,
            message: Some("Failed to decode image: bad".into()),
            ..PipelineSnapshot::default()
        };
        assert_eq!(status_label(&failed, &ready()), "Failed to decode image: bad");
    }

    #[test]
    fn toggles_flip_state() {
        let mut view = ViewState::default();
        view.toggle_menu();
        view.toggle_dark_mode();
        let vm = view.render(&PipelineSnapshot::default(), &ready());
        assert!(vm.menu.shown);
        assert!(vm.theme.dark);
        assert_eq!(vm.menu.entries.len(), 3);
        assert_eq!(vm.menu.entries[1].title, "Check for Updates");
        assert_eq!(vm.primary_action, PrimaryAction::Capture);

        view.hide_menu();
        view.toggle_dark_mode();
        assert!(!view.menu_shown);
        assert!(!view.theme().dark);
    }
}
