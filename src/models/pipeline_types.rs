use super::classify_types::Prediction;
use super::photo_types::PhotoDescriptor;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStatus {
    #[default]
    Idle,
    Resizing,
    Decoding,
    Classifying,
    Done,
    Failed,
}

impl PipelineStatus {
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            PipelineStatus::Resizing | PipelineStatus::Decoding | PipelineStatus::Classifying
        )
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    pub generation: u64,
    pub status: PipelineStatus,
    pub photo: Option<PhotoDescriptor>,
    pub predictions: Vec<Prediction>,
    pub message: Option<String>,
}

/// How a single `submit` ended from the caller's point of view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PipelineOutcome {
    Done(Vec<Prediction>),
    Failed(String),
    /// A newer submit or a clear took over before this cycle finished.
    Superseded,
}
