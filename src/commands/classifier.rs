use crate::error::AppError;
use crate::models::classify_types::ModelStatus;
use crate::AppState;
use tauri::State;

#[tauri::command]
pub async fn get_model_status(state: State<'_, AppState>) -> Result<ModelStatus, AppError> {
    Ok(state.shell.model().status())
}
