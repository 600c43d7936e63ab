use super::photo_types::FlashMode;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PreviewPane {
    /// `path` is set for photos backed by a local file (the webview loads it
    /// through the asset protocol); `data_url` only for inline-only photos.
    Photo {
        uri: String,
        path: Option<String>,
        data_url: Option<String>,
    },
    LiveCamera { flash: FlashMode },
    PermissionDenied { message: String },
    AwaitingPermission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimaryAction {
    Capture,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum ModelIndicator {
    Loading,
    Ready,
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub label: String,
    pub percentage: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MenuItem {
    About,
    CheckForUpdates,
    Help,
}

impl MenuItem {
    pub const ALL: [MenuItem; 3] = [MenuItem::About, MenuItem::CheckForUpdates, MenuItem::Help];

    pub fn title(self) -> &'static str {
        match self {
            MenuItem::About => "About",
            MenuItem::CheckForUpdates => "Check for Updates",
            MenuItem::Help => "Help",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub item: MenuItem,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuView {
    pub shown: bool,
    pub entries: Vec<MenuEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub dark: bool,
    pub background: &'static str,
    pub accent: &'static str,
    pub text: &'static str,
}

/// Everything the frontend needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub title: &'static str,
    pub theme: Theme,
    pub menu: MenuView,
    pub preview: PreviewPane,
    pub flash: FlashMode,
    pub primary_action: PrimaryAction,
    pub status_label: String,
    pub busy: bool,
    pub model: ModelIndicator,
    pub results: Vec<ResultRow>,
}
