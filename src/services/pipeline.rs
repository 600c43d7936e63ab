//! Photo → prediction state machine.
//!
//! `Idle → Resizing → Decoding → Classifying → Done`, with `Failed` reachable
//! from every non-idle state. Every submit and every clear bumps a generation
//! counter; a stage only commits its result if the generation it started
//! with is still current, so superseded work finishes but is never shown.

use crate::error::AppError;
use crate::models::classify_types::Prediction;
use crate::models::photo_types::PhotoDescriptor;
use crate::models::pipeline_types::{PipelineOutcome, PipelineSnapshot, PipelineStatus};
use crate::services::classifier::inference::sort_by_probability;
use crate::services::classifier::model_manager::ModelLoader;
use crate::services::preprocessor::Preprocessor;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Receives every committed state change, in commit order.
pub trait PipelineObserver: Send + Sync {
    fn on_change(&self, snapshot: &PipelineSnapshot);
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub input_size: u32,
    pub top_k: usize,
}

pub struct PredictionPipeline {
    state: Mutex<PipelineSnapshot>,
    preprocessor: Preprocessor,
    model: Arc<ModelLoader>,
    observer: Arc<dyn PipelineObserver>,
    settings: PipelineSettings,
}

impl PredictionPipeline {
    pub fn new(
        preprocessor: Preprocessor,
        model: Arc<ModelLoader>,
        observer: Arc<dyn PipelineObserver>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            state: Mutex::new(PipelineSnapshot::default()),
            preprocessor,
            model,
            observer,
            settings,
        }
    }

    pub async fn snapshot(&self) -> PipelineSnapshot {
        self.state.lock().await.clone()
    }

    pub async fn status(&self) -> PipelineStatus {
        self.state.lock().await.status
    }

    /// Makes `photo` the active photo and runs it through every stage.
    /// Whatever was running before is superseded.
    pub async fn submit(&self, photo: PhotoDescriptor) -> PipelineOutcome {
        let (generation, previous) = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.status = PipelineStatus::Resizing;
            let previous = state.photo.replace(photo.clone());
            state.predictions.clear();
            state.message = None;
            log::debug!("Pipeline gen {} -> Resizing ({})", state.generation, photo.uri);
            self.observer.on_change(&state);
            (state.generation, previous)
        };
        if let Some(previous) = previous.filter(|p| p.uri != photo.uri) {
            self.release(&previous).await;
        }

        match self.run(generation, &photo).await {
            Ok(Some(predictions)) => PipelineOutcome::Done(predictions),
            Ok(None) => PipelineOutcome::Superseded,
            Err(e) => self.fail(generation, e).await,
        }
    }

    /// Drops the active photo and results from any state.
    pub async fn clear(&self) {
        let previous = {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.status = PipelineStatus::Idle;
            let previous = state.photo.take();
            state.predictions.clear();
            state.message = None;
            log::debug!("Pipeline gen {} -> Idle", state.generation);
            self.observer.on_change(&state);
            previous
        };
        if let Some(previous) = previous {
            self.release(&previous).await;
        }
    }

    /// Deletes a photo that is no longer active if this app wrote it.
    async fn release(&self, photo: &PhotoDescriptor) {
        if let Some(path) = self.preprocessor.scratch_file(photo) {
            log::debug!("Removing capture {}", path.display());
            self.preprocessor.discard(&path).await;
        }
    }

    /// `Ok(None)` means a newer generation took over somewhere along the way.
    async fn run(&self, generation: u64, photo: &PhotoDescriptor) -> Result<Option<Vec<Prediction>>, AppError> {
        let resized = self.preprocessor.resize(photo, self.settings.input_size).await?;

        if !self.advance(generation, PipelineStatus::Decoding).await {
            self.preprocessor.discard(&resized).await;
            return Ok(None);
        }
        let decoded = self.preprocessor.decode(&resized).await;
        self.preprocessor.discard(&resized).await;
        let tensor = decoded?;

        if !self.advance(generation, PipelineStatus::Classifying).await {
            return Ok(None);
        }
        let handle = self.model.handle()?;
        let top_k = self.settings.top_k;
        let mut predictions = tokio::task::spawn_blocking(move || handle.classify(&tensor, top_k)).await??;
        sort_by_probability(&mut predictions);
        predictions.truncate(top_k);

        let mut state = self.state.lock().await;
        if state.generation != generation {
            log::debug!("Discarding stale result of gen {}", generation);
            return Ok(None);
        }
        state.status = PipelineStatus::Done;
        state.predictions = predictions.clone();
        log::debug!("Pipeline gen {} -> Done ({} labels)", generation, predictions.len());
        self.observer.on_change(&state);
        Ok(Some(predictions))
    }

    async fn advance(&self, generation: u64, next: PipelineStatus) -> bool {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            return false;
        }
        state.status = next;
        log::debug!("Pipeline gen {} -> {:?}", generation, next);
        self.observer.on_change(&state);
        true
    }

    async fn fail(&self, generation: u64, err: AppError) -> PipelineOutcome {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            log::debug!("Ignoring failure of stale gen {}: {}", generation, err);
            return PipelineOutcome::Superseded;
        }
        let message = err.to_string();
        log::warn!("Pipeline gen {} failed: {}", generation, message);
        state.status = PipelineStatus::Failed;
        state.predictions.clear();
        state.message = Some(message.clone());
        self.observer.on_change(&state);
        PipelineOutcome::Failed(message)
    }
}
