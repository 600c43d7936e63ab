use crate::error::AppError;
use crate::models::view_types::{MenuItem, ViewModel};
use crate::services::app_shell::ActionResult;
use crate::services::platform::{DialogLibrary, WebviewCamera};
use crate::AppState;
use tauri::{AppHandle, State};
use tauri_plugin_opener::OpenerExt;

#[tauri::command]
pub async fn get_view_model(state: State<'_, AppState>) -> Result<ViewModel, AppError> {
    Ok(state.shell.view_model().await)
}

#[tauri::command]
pub async fn report_camera_permission(state: State<'_, AppState>, granted: bool) -> Result<ViewModel, AppError> {
    state.shell.report_camera_permission(granted).await;
    Ok(state.shell.view_model().await)
}

/// `frame` is the webview's snapshot of the live stream as a `data:` URL,
/// or `None` when the user closed the camera without shooting.
#[tauri::command]
pub async fn capture_photo(state: State<'_, AppState>, frame: Option<String>) -> Result<ViewModel, AppError> {
    let camera = WebviewCamera::new(
        frame,
        state.shell.camera_permission().await,
        state.scratch_dir.clone(),
    );
    let result = state.shell.capture(&camera).await?;
    log_action("capture", &result);
    Ok(state.shell.view_model().await)
}

#[tauri::command]
pub async fn pick_photo(app: AppHandle, state: State<'_, AppState>) -> Result<ViewModel, AppError> {
    let library = DialogLibrary::new(app);
    let result = state.shell.pick(&library).await?;
    log_action("pick", &result);
    Ok(state.shell.view_model().await)
}

#[tauri::command]
pub async fn clear_photo(state: State<'_, AppState>) -> Result<ViewModel, AppError> {
    state.shell.clear().await;
    Ok(state.shell.view_model().await)
}

#[tauri::command]
pub async fn toggle_menu(state: State<'_, AppState>) -> Result<ViewModel, AppError> {
    state.shell.toggle_menu().await;
    Ok(state.shell.view_model().await)
}

#[tauri::command]
pub async fn hide_menu(state: State<'_, AppState>) -> Result<ViewModel, AppError> {
    state.shell.hide_menu().await;
    Ok(state.shell.view_model().await)
}

#[tauri::command]
pub async fn toggle_dark_mode(state: State<'_, AppState>) -> Result<ViewModel, AppError> {
    state.shell.toggle_dark_mode().await;
    Ok(state.shell.view_model().await)
}

#[tauri::command]
pub async fn toggle_flash(state: State<'_, AppState>) -> Result<ViewModel, AppError> {
    state.shell.toggle_flash().await;
    Ok(state.shell.view_model().await)
}

#[tauri::command]
pub async fn open_menu_item(
    app: AppHandle,
    state: State<'_, AppState>,
    item: MenuItem,
) -> Result<ViewModel, AppError> {
    state.shell.hide_menu().await;
    let url = state.config.links.url_for(item);
    log::info!("Opening {} ({})", item.title(), url);
    app.opener()
        .open_url(url, None::<&str>)
        .map_err(|e| AppError::Internal(format!("Failed to open {}: {}", url, e)))?;
    Ok(state.shell.view_model().await)
}

fn log_action(action: &str, result: &ActionResult) {
    match result {
        ActionResult::Classified(outcome) => log::debug!("{} finished: {:?}", action, outcome),
        ActionResult::Cancelled => log::debug!("{} cancelled", action),
        ActionResult::PermissionDenied(kind) => log::info!("{} blocked: {} permission denied", action, kind),
    }
}
