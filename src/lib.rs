pub mod config;
pub mod error;
pub mod models;
pub mod services;

#[cfg(feature = "shell")]
mod commands;

#[cfg(feature = "shell")]
pub(crate) struct AppState {
    pub(crate) shell: services::app_shell::AppShell,
    pub(crate) config: config::AppConfig,
    pub(crate) scratch_dir: std::path::PathBuf,
}

#[cfg(feature = "shell")]
fn build_state(app: &tauri::AppHandle) -> Result<AppState, error::AppError> {
    use config::AppConfig;
    use error::AppError;
    use services::app_shell::AppShell;
    use services::classifier::model_manager::ModelLoader;
    use services::classifier::onnx::OnnxModelSource;
    use services::pipeline::{PipelineSettings, PredictionPipeline};
    use services::platform::EventObserver;
    use services::preprocessor::Preprocessor;
    use std::sync::Arc;
    use tauri::{Emitter, Manager};

    let paths = app.path();
    let config_dir = paths.app_config_dir().map_err(|e| AppError::Config(e.to_string()))?;
    let data_dir = paths.app_data_dir().map_err(|e| AppError::Config(e.to_string()))?;
    let cache_dir = paths.app_cache_dir().map_err(|e| AppError::Config(e.to_string()))?;

    let config = AppConfig::load_from_dir(&config_dir)?;
    let model_dir = config.model_dir(&data_dir);
    let scratch_dir = config.scratch_dir(&cache_dir);
    let purged = services::preprocessor::purge_scratch_dir(&scratch_dir)?;
    if purged > 0 {
        log::info!("Removed {} stale files from {}", purged, scratch_dir.display());
    }
    std::fs::create_dir_all(&scratch_dir)
        .map_err(|e| AppError::io(format!("Failed to create {}", scratch_dir.display()), e))?;
    log::info!("Models in {}, scratch in {}", model_dir.display(), scratch_dir.display());

    let progress_handle = app.clone();
    let source = OnnxModelSource::new(model_dir, config.model.clone()).with_progress(Arc::new(move |percent: u64| {
        let _ = progress_handle.emit("download-progress", percent);
    }));
    let model = Arc::new(ModelLoader::new(Box::new(source)));

    let pipeline = Arc::new(PredictionPipeline::new(
        Preprocessor::new(scratch_dir.clone()),
        model.clone(),
        Arc::new(EventObserver::new(app.clone())),
        PipelineSettings {
            input_size: config.model.input_size,
            top_k: config.top_k,
        },
    ));

    Ok(AppState {
        shell: AppShell::new(pipeline, model),
        config,
        scratch_dir,
    })
}

#[cfg(feature = "shell")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use tauri::{Emitter, Manager};

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Genesis starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_window_state::Builder::default().build())
        .setup(|app| {
            let state = build_state(app.handle())?;
            let model = state.shell.model().clone();
            app.manage(state);

            // Download on first start, then load once.
            let app_handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                let _ = app_handle.emit("model-status", model.status());
                // The loader logs its own outcome.
                let _ = model.initialize().await;
                let _ = app_handle.emit("model-status", model.status());
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::shell::get_view_model,
            commands::shell::report_camera_permission,
            commands::shell::capture_photo,
            commands::shell::pick_photo,
            commands::shell::clear_photo,
            commands::shell::toggle_menu,
            commands::shell::hide_menu,
            commands::shell::toggle_dark_mode,
            commands::shell::toggle_flash,
            commands::shell::open_menu_item,
            commands::classifier::get_model_status,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
