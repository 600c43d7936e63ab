//! Application configuration.
//!
//! Read once at startup from `config.json` in the app config directory. Every
//! field has a default, so a missing file or a partial file is fine. A few
//! values can be overridden through the environment.

use crate::error::AppError;
use crate::models::view_types::MenuItem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";

const ENV_TOP_K: &str = "GENESIS_TOP_K";
const ENV_USE_GPU: &str = "GENESIS_USE_GPU";
const ENV_MODEL_DIR: &str = "GENESIS_MODEL_DIR";

/// Where the classifier comes from and what input it expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSettings {
    pub model_url: String,
    pub config_url: String,
    pub model_file: String,
    pub config_file: String,
    /// Overrides `<app_data_dir>/models` when set.
    pub model_dir: Option<PathBuf>,
    /// Side of the square input the model takes.
    pub input_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub use_gpu: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_url: "https://huggingface.co/Xenova/mobilenet_v2_1.0_224/resolve/main/onnx/model.onnx"
                .to_string(),
            config_url: "https://huggingface.co/Xenova/mobilenet_v2_1.0_224/resolve/main/config.json"
                .to_string(),
            model_file: "mobilenet_v2_1.0_224.onnx".to_string(),
            config_file: "mobilenet_v2_1.0_224-config.json".to_string(),
            model_dir: None,
            input_size: 224,
            mean: [0.5, 0.5, 0.5],
            std: [0.5, 0.5, 0.5],
            use_gpu: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MenuLinks {
    pub about: String,
    pub updates: String,
    pub help: String,
}

impl MenuLinks {
    pub fn url_for(&self, item: MenuItem) -> &str {
        match item {
            MenuItem::About => &self.about,
            MenuItem::CheckForUpdates => &self.updates,
            MenuItem::Help => &self.help,
        }
    }
}

impl Default for MenuLinks {
    fn default() -> Self {
        Self {
            about: "https://github.com/tensorflow/tfjs-models/tree/master/mobilenet".to_string(),
            updates: "https://huggingface.co/Xenova/mobilenet_v2_1.0_224".to_string(),
            help: "https://tauri.app/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelSettings,
    /// How many ranked labels a classification returns.
    pub top_k: usize,
    /// Where resized frames and camera captures are written.
    pub scratch_dir: Option<PathBuf>,
    pub links: MenuLinks,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            top_k: 3,
            scratch_dir: None,
            links: MenuLinks::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::io(format!("Failed to read config {}", path.display()), e))?;
        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Loads `config.json` from `dir` if it exists, applies environment
    /// overrides and validates the result.
    pub fn load_from_dir(dir: &Path) -> Result<Self, AppError> {
        let path = dir.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            log::info!("Loading config from {}", path.display());
            Self::load(&path)?
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_TOP_K) {
            self.top_k = value
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("{} must be a positive integer, got {:?}", ENV_TOP_K, value)))?;
        }
        if let Some(value) = lookup(ENV_USE_GPU) {
            self.model.use_gpu = value == "1" || value.eq_ignore_ascii_case("true");
        }
        if let Some(value) = lookup(ENV_MODEL_DIR) {
            if !value.trim().is_empty() {
                self.model.model_dir = Some(PathBuf::from(value));
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".into()));
        }
        if self.model.input_size == 0 {
            return Err(AppError::Config("model.input_size must be greater than zero".into()));
        }
        if self.model.std.iter().any(|s| *s == 0.0) {
            return Err(AppError::Config("model.std must not contain zero".into()));
        }
        if self.model.model_file.is_empty() || self.model.config_file.is_empty() {
            return Err(AppError::Config("model file names must not be empty".into()));
        }
        Ok(())
    }

    pub fn model_dir(&self, app_data_dir: &Path) -> PathBuf {
        self.model
            .model_dir
            .clone()
            .unwrap_or_else(|| app_data_dir.join("models"))
    }

    pub fn scratch_dir(&self, app_cache_dir: &Path) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| app_cache_dir.join("scratch"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.model.input_size, 224);
        assert!(!config.model.use_gpu);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{ "top_k": 5, "model": { "input_size": 160 } }"#)
            .unwrap();

        let config = AppConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.model.input_size, 160);
        assert_eq!(config.model.mean, [0.5, 0.5, 0.5]);
        assert_eq!(config.links, MenuLinks::default());
    }

    #[test]
    fn test_menu_links_resolve_per_item() {
        let links = MenuLinks {
            about: "a".into(),
            updates: "u".into(),
            help: "h".into(),
        };
        assert_eq!(links.url_for(MenuItem::About), "a");
        assert_eq!(links.url_for(MenuItem::CheckForUpdates), "u");
        assert_eq!(links.url_for(MenuItem::Help), "h");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.model.model_file, ModelSettings::default().model_file);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();
        let err = AppConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_TOP_K, "7"),
            (ENV_USE_GPU, "true"),
            (ENV_MODEL_DIR, "/opt/models"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.top_k, 7);
        assert!(config.model.use_gpu);
        assert_eq!(config.model_dir(Path::new("/data")), PathBuf::from("/opt/models"));
    }

    #[test]
    fn test_bad_top_k_override_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| (key == ENV_TOP_K).then(|| "many".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let config = AppConfig {
            top_k: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
