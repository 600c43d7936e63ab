use super::inference::{softmax, to_normalized_nchw, top_k_predictions};
use super::model_manager::{parse_id2label, ModelSource};
use super::{Classifier, ModelHandle, Tensor3D};
use crate::config::ModelSettings;
use crate::error::AppError;
use crate::models::classify_types::Prediction;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Reports download progress in percent.
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// Fetches the ONNX model and its `config.json` if missing, then builds a session.
pub struct OnnxModelSource {
    model_dir: PathBuf,
    settings: ModelSettings,
    progress: Option<ProgressFn>,
}

impl OnnxModelSource {
    pub fn new(model_dir: PathBuf, settings: ModelSettings) -> Self {
        Self {
            model_dir,
            settings,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.settings.model_file)
    }

    fn config_path(&self) -> PathBuf {
        self.model_dir.join(&self.settings.config_file)
    }

    async fn ensure_assets(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.model_dir).await.map_err(|e| {
            AppError::ModelLoad(format!("Failed to create model directory: {}", e))
        })?;

        let config_path = self.config_path();
        if !config_path.exists() {
            log::info!("Downloading model config to {}", config_path.display());
            download_file(&self.settings.config_url, &config_path, None).await?;
        }

        let model_path = self.model_path();
        if !model_path.exists() {
            log::info!("Downloading model to {}", model_path.display());
            download_file(&self.settings.model_url, &model_path, self.progress.as_ref()).await?;
        }
        Ok(())
    }

    async fn load_inner(&self) -> Result<ModelHandle, AppError> {
        self.ensure_assets().await?;

        let config_path = self.config_path();
        let config_content = tokio::fs::read_to_string(&config_path).await.map_err(|e| {
            AppError::ModelLoad(format!("Failed to read config file {}: {}", config_path.display(), e))
        })?;
        let config: serde_json::Value = serde_json::from_str(&config_content)
            .map_err(|e| AppError::ModelLoad(format!("Failed to parse config JSON: {}", e)))?;
        let labels = parse_id2label(&config)?;

        let model_path = self.model_path();
        let use_gpu = self.settings.use_gpu;
        let session = tokio::task::spawn_blocking(move || build_session(&model_path, use_gpu))
            .await
            .map_err(|e| AppError::ModelLoad(format!("Failed to spawn model loading task: {}", e)))??;

        Ok(Arc::new(OnnxClassifier {
            session: Mutex::new(session),
            labels,
            mean: self.settings.mean,
            std: self.settings.std,
        }))
    }
}

impl ModelSource for OnnxModelSource {
    fn load(&self) -> BoxFuture<'_, Result<ModelHandle, AppError>> {
        self.load_inner().boxed()
    }
}

fn build_session(model_path: &Path, use_gpu: bool) -> Result<Session, AppError> {
    let _ = ort::init().with_name("genesis").commit();

    let mut builder = Session::builder()
        .map_err(|e| AppError::ModelLoad(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
        .map_err(|e| AppError::ModelLoad(format!("Failed to set optimization level: {}", e)))?
        .with_intra_threads(4)
        .map_err(|e| AppError::ModelLoad(format!("Failed to set intra threads: {}", e)))?;

    if use_gpu {
        builder = builder
            .with_execution_providers([
                ort::execution_providers::CoreMLExecutionProvider::default().build(),
                ort::execution_providers::CUDAExecutionProvider::default().build(),
                ort::execution_providers::CPUExecutionProvider::default().build(),
            ])
            .map_err(|e| AppError::ModelLoad(format!("Failed to register GPU execution providers: {}", e)))?;
    } else {
        builder = builder
            .with_execution_providers([ort::execution_providers::CPUExecutionProvider::default().build()])
            .map_err(|e| AppError::ModelLoad(format!("Failed to register CPU execution provider: {}", e)))?;
    }

    builder
        .commit_from_file(model_path)
        .map_err(|e| AppError::ModelLoad(format!("Failed to load ONNX model: {}", e)))
}

pub struct OnnxClassifier {
    session: Mutex<Session>,
    labels: Vec<String>,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Classifier for OnnxClassifier {
    fn classify(&self, image: &Tensor3D, top_k: usize) -> Result<Vec<Prediction>, AppError> {
        let input = to_normalized_nchw(image, self.mean, self.std)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| AppError::Classify("Model session poisoned".to_string()))?;

        let input_name = session.inputs()[0].name().to_string();
        let input_tensor = Value::from_array(input)
            .map_err(|e| AppError::Classify(format!("Failed to create tensor value: {}", e)))?;

        let outputs = session
            .run(ort::inputs![input_name.as_str() => input_tensor])
            .map_err(|e| AppError::Classify(format!("Inference failed: {}", e)))?;

        let output_value = outputs
            .values()
            .next()
            .ok_or_else(|| AppError::Classify("Model produced no outputs".to_string()))?;

        let (_, logits) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| AppError::Classify(format!("Failed to extract output tensor: {}", e)))?;

        let probabilities = softmax(logits);
        Ok(top_k_predictions(&probabilities, &self.labels, top_k))
    }
}

async fn download_file(url: &str, dest: &Path, progress: Option<&ProgressFn>) -> Result<(), AppError> {
    let client = reqwest::Client::new();
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(AppError::ModelLoad(format!(
            "Failed to download {}: HTTP {}",
            url,
            response.status()
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut last_emit = 0;

    // Download next to the destination and rename once complete.
    let partial = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&partial).await.map_err(|e| {
        AppError::ModelLoad(format!("Failed to create file {}: {}", partial.display(), e))
    })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e.into());
            }
        };
        downloaded += chunk.len() as u64;
        if let Err(e) = tokio::io::AsyncWriteExt::write_all(&mut file, &chunk).await {
            drop(file);
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(AppError::ModelLoad(format!("Failed to write to file: {}", e)));
        }

        if let (Some(progress), true) = (progress, total_size > 0) {
            let percent = (downloaded * 100) / total_size;
            if percent > last_emit {
                progress(percent);
                last_emit = percent;
            }
        }
    }
    tokio::io::AsyncWriteExt::flush(&mut file)
        .await
        .map_err(|e| AppError::ModelLoad(format!("Failed to flush file: {}", e)))?;
    drop(file);

    tokio::fs::rename(&partial, dest)
        .await
        .map_err(|e| AppError::ModelLoad(format!("Failed to move {} into place: {}", dest.display(), e)))?;

    if let Some(progress) = progress {
        progress(100);
    }
    Ok(())
}
